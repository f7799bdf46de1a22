use crate::errors::PlanError;
use crate::network::Terminal;
use crate::path::DiscoveredPath;
use ahash::AHashMap;
use geo::{Distance, Euclidean, LineString, Point};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub type NodeIdx = usize;

/// What is known about the cheapest discovered path between two terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    /// Cable length along the path.
    pub length: f64,
    /// Straight-line distance between the path ends.
    pub straight_distance: f64,
    pub vertices: usize,
    pub path: LineString<f64>,
}

/// Numeric edge field a partition minimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMetric {
    #[default]
    Length,
    StraightDistance,
    Vertices,
}

impl EdgeData {
    pub fn from_path(path: &DiscoveredPath) -> Self {
        let straight_distance = match (path.start(), path.end()) {
            (Some(a), Some(b)) => Euclidean.distance(a, b),
            _ => 0.0,
        };
        Self {
            length: path.length,
            straight_distance,
            vertices: path.vertex_count(),
            path: path.points.clone(),
        }
    }

    pub fn metric(&self, metric: EdgeMetric) -> f64 {
        match metric {
            EdgeMetric::Length => self.length,
            EdgeMetric::StraightDistance => self.straight_distance,
            EdgeMetric::Vertices => self.vertices as f64,
        }
    }

    fn reversed(mut self) -> Self {
        self.path.0.reverse();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUpdate {
    Inserted,
    /// A shorter path replaced the stored one.
    Replaced,
    /// The stored path was at least as short.
    Kept,
    /// Both ends named the same terminal.
    Ignored,
}

fn pair_key(a: NodeIdx, b: NodeIdx) -> (NodeIdx, NodeIdx) {
    if a < b { (a, b) } else { (b, a) }
}

/// Undirected graph over terminal names. Each unordered pair holds at most one
/// edge, and that edge is always the shortest one ever inserted for the pair.
#[derive(Debug, Clone, Default)]
pub struct TerminalGraph {
    names: Vec<String>,
    index: AHashMap<String, NodeIdx>,
    edges: AHashMap<(NodeIdx, NodeIdx), EdgeData>,
}

impl TerminalGraph {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = TerminalGraph::default();
        for name in names {
            let name = name.into();
            if graph.index.contains_key(&name) {
                warn!(terminal = %name, "duplicate terminal name, keeping the first");
                continue;
            }
            graph.index.insert(name.clone(), graph.names.len());
            graph.names.push(name);
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, idx: NodeIdx) -> &str {
        &self.names[idx]
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIdx> {
        self.index.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<NodeIdx, PlanError> {
        self.node_index(name).ok_or_else(|| PlanError::UnknownTerminal {
            name: name.to_string(),
        })
    }

    /// Inserts or merges the edge between `a` and `b`, keeping the shorter length.
    /// Merging is order-independent: whichever order the same edges arrive in,
    /// the stored length is their minimum.
    pub fn insert_edge(&mut self, a: &str, b: &str, data: EdgeData) -> Result<EdgeUpdate, PlanError> {
        let ia = self.require(a)?;
        let ib = self.require(b)?;
        if ia == ib {
            return Ok(EdgeUpdate::Ignored);
        }

        // Stored paths run from the lower node index to the higher one.
        let data = if ia > ib { data.reversed() } else { data };

        match self.edges.get_mut(&pair_key(ia, ib)) {
            None => {
                self.edges.insert(pair_key(ia, ib), data);
                Ok(EdgeUpdate::Inserted)
            }
            Some(stored) if data.length < stored.length => {
                *stored = data;
                Ok(EdgeUpdate::Replaced)
            }
            Some(_) => Ok(EdgeUpdate::Kept),
        }
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeData> {
        let ia = self.node_index(a)?;
        let ib = self.node_index(b)?;
        self.edge_between(ia, ib)
    }

    pub fn edge_between(&self, a: NodeIdx, b: NodeIdx) -> Option<&EdgeData> {
        self.edges.get(&pair_key(a, b))
    }

    /// All edges as (lower index, higher index, data), ordered by node pair.
    pub fn edges(&self) -> Vec<(NodeIdx, NodeIdx, &EdgeData)> {
        let mut edges: Vec<(NodeIdx, NodeIdx, &EdgeData)> = self
            .edges
            .iter()
            .map(|(&(a, b), data)| (a, b, data))
            .collect();
        edges.sort_by_key(|(a, b, _)| (*a, *b));
        edges
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub inserted: usize,
    pub replaced: usize,
    pub kept: usize,
    /// Paths whose ends did not resolve to two distinct terminals.
    pub discarded: usize,
}

/// Resolves path ends to terminals and folds the paths into a [`TerminalGraph`].
pub struct GraphBuilder {
    names: Vec<String>,
    locations: RTree<GeomWithData<[f64; 2], usize>>,
    tolerance: f64,
}

impl GraphBuilder {
    pub fn new(terminals: &[Terminal], tolerance: f64) -> Self {
        let entries = terminals
            .iter()
            .enumerate()
            .map(|(idx, t)| GeomWithData::new([t.location.x(), t.location.y()], idx))
            .collect();
        Self {
            names: terminals.iter().map(|t| t.name.clone()).collect(),
            locations: RTree::bulk_load(entries),
            tolerance,
        }
    }

    pub fn empty_graph(&self) -> TerminalGraph {
        TerminalGraph::new(self.names.iter().cloned())
    }

    /// Terminals within tolerance of `point`, by input order.
    pub fn terminals_near(&self, point: Point<f64>) -> Vec<usize> {
        let mut near: Vec<usize> = self
            .locations
            .locate_within_distance([point.x(), point.y()], self.tolerance * self.tolerance)
            .map(|t| t.data)
            .collect();
        near.sort_unstable();
        near
    }

    pub fn build<'p>(
        &self,
        paths: impl IntoIterator<Item = &'p DiscoveredPath>,
    ) -> Result<TerminalGraph, PlanError> {
        let mut graph = self.empty_graph();
        self.fold(&mut graph, paths)?;
        Ok(graph)
    }

    /// Folds `paths` into an existing graph. Fails if a resolved terminal is not
    /// one of the graph's nodes.
    pub fn fold<'p>(
        &self,
        graph: &mut TerminalGraph,
        paths: impl IntoIterator<Item = &'p DiscoveredPath>,
    ) -> Result<FoldStats, PlanError> {
        let mut stats = FoldStats::default();

        for path in paths {
            let (Some(start), Some(end)) = (path.start(), path.end()) else {
                stats.discarded += 1;
                continue;
            };

            let from_start = self.terminals_near(start);
            let from_end = self.terminals_near(end);

            let mut matched = false;
            for &i in &from_start {
                for &j in &from_end {
                    if self.names[i] == self.names[j] {
                        continue;
                    }
                    matched = true;
                    let update =
                        graph.insert_edge(&self.names[i], &self.names[j], EdgeData::from_path(path))?;
                    match update {
                        EdgeUpdate::Inserted => stats.inserted += 1,
                        EdgeUpdate::Replaced => stats.replaced += 1,
                        EdgeUpdate::Kept | EdgeUpdate::Ignored => stats.kept += 1,
                    }
                }
            }

            if !matched {
                stats.discarded += 1;
            }
        }

        debug!(
            inserted = stats.inserted,
            replaced = stats.replaced,
            kept = stats.kept,
            discarded = stats.discarded,
            "folded paths into terminal graph"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, point};

    fn straight(from: (f64, f64), to: (f64, f64)) -> DiscoveredPath {
        DiscoveredPath::from_walk(&[
            coord! { x: from.0, y: from.1 },
            coord! { x: to.0, y: to.1 },
        ])
    }

    fn edge_of_length(length: f64) -> EdgeData {
        EdgeData {
            length,
            straight_distance: length,
            vertices: 2,
            path: LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: length, y: 0.0 }]),
        }
    }

    #[test]
    fn test_merge_keeps_minimum_in_any_order() {
        let mut forward = TerminalGraph::new(["A", "B"]);
        forward.insert_edge("A", "B", edge_of_length(5.0)).unwrap();
        forward.insert_edge("A", "B", edge_of_length(3.0)).unwrap();

        let mut backward = TerminalGraph::new(["A", "B"]);
        backward.insert_edge("B", "A", edge_of_length(3.0)).unwrap();
        let update = backward.insert_edge("A", "B", edge_of_length(5.0)).unwrap();

        assert_eq!(update, EdgeUpdate::Kept);
        assert_eq!(forward.edge("A", "B").unwrap().length, 3.0);
        assert_eq!(backward.edge("B", "A").unwrap().length, 3.0);
        assert_eq!(forward.edge_count(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut graph = TerminalGraph::new(["A", "B"]);
        assert_eq!(
            graph.insert_edge("A", "B", edge_of_length(4.0)).unwrap(),
            EdgeUpdate::Inserted
        );
        assert_eq!(
            graph.insert_edge("A", "B", edge_of_length(4.0)).unwrap(),
            EdgeUpdate::Kept
        );
        assert_eq!(graph.edge("A", "B").unwrap().length, 4.0);
    }

    #[test]
    fn test_unknown_terminal_is_a_configuration_error() {
        let mut graph = TerminalGraph::new(["A", "B"]);
        let err = graph.insert_edge("A", "Z", edge_of_length(1.0)).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownTerminal {
                name: "Z".to_string()
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stored_path_runs_from_lower_node() {
        let mut graph = TerminalGraph::new(["A", "B"]);
        let mut data = edge_of_length(2.0);
        data.path = LineString::new(vec![coord! { x: 2.0, y: 0.0 }, coord! { x: 0.0, y: 0.0 }]);
        graph.insert_edge("B", "A", data).unwrap();

        let stored = graph.edge("A", "B").unwrap();
        assert_eq!(stored.path.0[0], coord! { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_builder_resolves_both_path_directions() {
        let terminals = vec![
            Terminal::new("A", point! { x: 0.0, y: 0.0 }),
            Terminal::new("B", point! { x: 10.0, y: 0.0 }),
            Terminal::new("C", point! { x: 10.0, y: 10.0 }),
        ];
        let builder = GraphBuilder::new(&terminals, 0.5);

        let paths = vec![
            straight((0.0, 0.0), (10.0, 0.0)),
            straight((10.1, 10.0), (10.0, 0.2)),
            // ends nowhere near a terminal
            straight((0.0, 0.0), (5.0, 5.0)),
            // both ends on A
            straight((0.0, 0.0), (0.2, 0.0)),
        ];

        let mut graph = builder.empty_graph();
        let stats = builder.fold(&mut graph, &paths).unwrap();

        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.discarded, 2);
        assert!(graph.edge("A", "B").is_some());
        assert!(graph.edge("C", "B").is_some());
        assert!(graph.edge("A", "C").is_none());
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_fold_into_graph_missing_terminal_fails() {
        let terminals = vec![
            Terminal::new("A", point! { x: 0.0, y: 0.0 }),
            Terminal::new("B", point! { x: 10.0, y: 0.0 }),
        ];
        let builder = GraphBuilder::new(&terminals, 0.5);
        let mut graph = TerminalGraph::new(["A"]);

        let err = builder
            .fold(&mut graph, &[straight((0.0, 0.0), (10.0, 0.0))])
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownTerminal { name } if name == "B"));
    }

    #[test]
    fn test_metric_selection() {
        let data = EdgeData {
            length: 12.0,
            straight_distance: 8.0,
            vertices: 4,
            path: LineString::new(vec![]),
        };
        assert_eq!(data.metric(EdgeMetric::Length), 12.0);
        assert_eq!(data.metric(EdgeMetric::StraightDistance), 8.0);
        assert_eq!(data.metric(EdgeMetric::Vertices), 4.0);
    }
}
