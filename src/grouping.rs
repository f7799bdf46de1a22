use crate::errors::PlanError;
use crate::graph::{EdgeData, EdgeMetric, NodeIdx, TerminalGraph};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// A graph edge chosen while growing a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEdge {
    /// Member already in the group when the edge was taken.
    pub from: String,
    /// Terminal the edge added.
    pub to: String,
    /// The edge evaluated under the partition metric.
    pub weight: f64,
    pub data: EdgeData,
}

/// Terminals sharing one upstream distribution point. `members[0]` is the seed;
/// `edges` connect the members in the order they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub members: Vec<String>,
    pub edges: Vec<GroupEdge>,
}

impl Group {
    pub fn seed(&self) -> &str {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Fails with [`PlanError::PartialGroup`] if fewer than `expected` terminals
    /// were grouped.
    pub fn check_size(&self, expected: usize) -> Result<(), PlanError> {
        if self.members.len() < expected {
            Err(PlanError::PartialGroup {
                seed: self.seed().to_string(),
                size: self.members.len(),
                expected,
            })
        } else {
            Ok(())
        }
    }
}

/// Greedy partition of graph nodes into groups of at most `group_size`.
///
/// Each group starts at the ungrouped node with the fewest edges to other
/// ungrouped nodes (ties: largest weight over those edges, then lowest index)
/// and grows by the cheapest edge leaving the group, like Prim's algorithm.
/// The result is a heuristic, not an optimal partition.
#[derive(Debug, Clone, Copy)]
pub struct GroupPartitioner {
    group_size: usize,
    metric: EdgeMetric,
}

struct Adjacency {
    neighbours: Vec<Vec<(NodeIdx, f64)>>,
}

impl Adjacency {
    fn new(graph: &TerminalGraph, metric: EdgeMetric) -> Self {
        let mut neighbours = vec![Vec::new(); graph.node_count()];
        for (a, b, data) in graph.edges() {
            let weight = data.metric(metric);
            neighbours[a].push((b, weight));
            neighbours[b].push((a, weight));
        }
        Self { neighbours }
    }
}

/// Edges leaving the group, cheapest first. Ordered on (weight, candidate, member)
/// so equal weights fall back to the lowest indices.
struct Frontier(BinaryHeap<Reverse<(OrderedFloat<f64>, NodeIdx, NodeIdx)>>);

impl Frontier {
    fn new() -> Self {
        Self(BinaryHeap::new())
    }

    fn extend_from(&mut self, adjacency: &Adjacency, member: NodeIdx, grouped: &[bool]) {
        for &(next, weight) in &adjacency.neighbours[member] {
            if !grouped[next] {
                self.0.push(Reverse((OrderedFloat(weight), next, member)));
            }
        }
    }

    fn pop(&mut self) -> Option<(f64, NodeIdx, NodeIdx)> {
        self.0
            .pop()
            .map(|Reverse((weight, next, member))| (weight.into_inner(), next, member))
    }
}

impl GroupPartitioner {
    pub fn new(group_size: usize, metric: EdgeMetric) -> Result<Self, PlanError> {
        if group_size == 0 {
            return Err(PlanError::InvalidConfig {
                field: "group_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self { group_size, metric })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn metric(&self) -> EdgeMetric {
        self.metric
    }

    pub fn partition(&self, graph: &TerminalGraph) -> Vec<Group> {
        let adjacency = Adjacency::new(graph, self.metric);
        let mut grouped = vec![false; graph.node_count()];
        let mut remaining = graph.node_count();
        let mut groups = Vec::new();

        while remaining > 0 {
            let Some(seed) = pick_seed(&adjacency, &grouped) else {
                break;
            };
            let (members, picked) = self.grow(seed, &adjacency, &mut grouped);
            remaining -= members.len();

            let group = Group {
                members: members.iter().map(|&m| graph.name(m).to_string()).collect(),
                edges: picked
                    .into_iter()
                    .filter_map(|(from, to, weight)| {
                        graph.edge_between(from, to).map(|data| GroupEdge {
                            from: graph.name(from).to_string(),
                            to: graph.name(to).to_string(),
                            weight,
                            data: data.clone(),
                        })
                    })
                    .collect(),
            };

            if let Err(err) = group.check_size(self.group_size) {
                if remaining > 0 {
                    warn!(%err, "group growth starved");
                } else {
                    debug!(%err, "last group is short");
                }
            }
            groups.push(group);
        }

        debug!(
            groups = groups.len(),
            nodes = graph.node_count(),
            "partitioned terminal graph"
        );
        groups
    }

    fn grow(
        &self,
        seed: NodeIdx,
        adjacency: &Adjacency,
        grouped: &mut [bool],
    ) -> (Vec<NodeIdx>, Vec<(NodeIdx, NodeIdx, f64)>) {
        let mut members = vec![seed];
        let mut picked = Vec::new();
        grouped[seed] = true;

        let mut frontier = Frontier::new();
        frontier.extend_from(adjacency, seed, grouped);

        while members.len() < self.group_size {
            let Some((weight, next, member)) = frontier.pop() else {
                break;
            };
            if grouped[next] {
                continue;
            }
            grouped[next] = true;
            members.push(next);
            picked.push((member, next, weight));
            frontier.extend_from(adjacency, next, grouped);
        }

        (members, picked)
    }
}

fn pick_seed(adjacency: &Adjacency, grouped: &[bool]) -> Option<NodeIdx> {
    (0..grouped.len())
        .filter(|&node| !grouped[node])
        .min_by_key(|&node| {
            let (count, sum) = adjacency.neighbours[node]
                .iter()
                .filter(|(other, _)| !grouped[*other])
                .fold((0usize, 0.0f64), |(count, sum), (_, w)| (count + 1, sum + w));
            (count, Reverse(OrderedFloat(sum)), node)
        })
}
