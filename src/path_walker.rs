//! Continuous stepping search along route geometry.
//!
//! The walk advances one `step_size` at a time: the next positions are the points
//! where a circle of radius `step_size` around the current position crosses the
//! route network. Branches are tried depth-first, most target-aligned first, and a
//! branch fails when it is blocked by an obstacle, runs out of travel budget, or
//! reaches a dead end.
//!
//! The search keeps an explicit stack of frames instead of recursing, so fine
//! steps over long corridors cannot overflow the call stack. The geometry still
//! available to a frame is the network minus the open disks around every frame
//! below it on the stack, which stops a branch from looping back into the corridor
//! it already walked.

use crate::errors::{NoPathFound, PlanError, WalkFailure};
use crate::geometry::{
    circle_line_intersections, coincident, cosine_similarity, distance, inside_open_disk,
};
use crate::network::RouteNetwork;
use crate::path::DiscoveredPath;
use geo::{Coord, Point};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkParams {
    pub step_size: f64,
    /// A walk succeeds once it is this close to the target.
    pub reach_distance: f64,
    /// Total travel budget of one walk.
    pub max_distance: f64,
}

impl WalkParams {
    pub fn validate(&self) -> Result<(), PlanError> {
        PlanError::positive("step_size", self.step_size)?;
        PlanError::positive("reach_distance", self.reach_distance)?;
        PlanError::positive("max_walking_distance", self.max_distance)
    }

    /// Radius under which two step candidates are the same point.
    fn match_radius(&self) -> f64 {
        self.reach_distance / 100.0
    }
}

/// Points a walk may not pass within one step of.
pub struct ObstacleSet {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl ObstacleSet {
    pub fn new(points: &[Point<f64>]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(idx, p)| GeomWithData::new([p.x(), p.y()], idx))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// True if an obstacle not listed in `ignored` lies within `radius` of `position`.
    fn blocks(&self, position: Coord, radius: f64, ignored: &[usize]) -> bool {
        self.tree
            .locate_within_distance([position.x, position.y], radius * radius)
            .any(|obstacle| !ignored.contains(&obstacle.data))
    }
}

struct Frame {
    position: Coord,
    budget: f64,
    /// Next positions, best first.
    candidates: Vec<Coord>,
    next: usize,
}

enum Probe {
    Arrived,
    Failed(WalkFailure),
    Branch(Vec<Coord>),
}

pub struct PathWalker<'a> {
    network: &'a RouteNetwork,
    obstacles: &'a ObstacleSet,
    params: WalkParams,
}

impl<'a> PathWalker<'a> {
    pub fn new(network: &'a RouteNetwork, obstacles: &'a ObstacleSet, params: WalkParams) -> Self {
        Self {
            network,
            obstacles,
            params,
        }
    }

    pub fn walk(&self, source: Point<f64>, target: Point<f64>) -> Result<DiscoveredPath, NoPathFound> {
        self.walk_ignoring(source, target, &[])
    }

    /// Walks from `source` to `target`, treating the obstacles at the indices in
    /// `ignored` as absent (typically the two terminals being connected).
    pub fn walk_ignoring(
        &self,
        source: Point<f64>,
        target: Point<f64>,
        ignored: &[usize],
    ) -> Result<DiscoveredPath, NoPathFound> {
        let (source, target) = (source.0, target.0);
        let step = self.params.step_size;
        let mut stack: Vec<Frame> = Vec::new();
        let mut steps = 0usize;

        match self.probe(source, None, self.params.max_distance, target, &stack, ignored) {
            Probe::Arrived => return Ok(self.finish(&stack, source, target)),
            Probe::Failed(reason) => return Err(NoPathFound { reason, steps }),
            Probe::Branch(candidates) => stack.push(Frame {
                position: source,
                budget: self.params.max_distance,
                candidates,
                next: 0,
            }),
        }

        let mut last_failure = WalkFailure::DeadEnd;

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            if frame.next >= frame.candidates.len() {
                // every branch from here failed
                stack.pop();
                continue;
            }

            let candidate = frame.candidates[frame.next];
            frame.next += 1;
            let previous = frame.position;
            let budget = frame.budget - step;
            steps += 1;

            match self.probe(candidate, Some(previous), budget, target, &stack, ignored) {
                Probe::Arrived => {
                    debug!(steps, depth = stack.len(), "walk reached target");
                    return Ok(self.finish(&stack, candidate, target));
                }
                Probe::Failed(reason) => {
                    trace!(?reason, x = candidate.x, y = candidate.y, "branch failed");
                    last_failure = reason;
                }
                Probe::Branch(candidates) => stack.push(Frame {
                    position: candidate,
                    budget,
                    candidates,
                    next: 0,
                }),
            }
        }

        debug!(steps, reason = %last_failure, "walk found no path");
        Err(NoPathFound {
            reason: last_failure,
            steps,
        })
    }

    /// Evaluates one position. `stack` holds exactly the frames walked before it.
    fn probe(
        &self,
        position: Coord,
        previous: Option<Coord>,
        budget: f64,
        target: Coord,
        stack: &[Frame],
        ignored: &[usize],
    ) -> Probe {
        let step = self.params.step_size;

        if distance(position, target) <= self.params.reach_distance {
            return Probe::Arrived;
        }
        if self.obstacles.blocks(position, step, ignored) {
            return Probe::Failed(WalkFailure::Blocked);
        }
        if budget < step {
            return Probe::Failed(WalkFailure::Exhausted);
        }

        let match_radius = self.params.match_radius();
        let mut hits = Vec::new();
        for (_, line) in self.network.pieces_near(position, step) {
            circle_line_intersections(position, step, &line, &mut hits);
        }

        let mut candidates: Vec<Coord> = Vec::with_capacity(hits.len());
        for (_, point) in hits {
            if previous.is_some_and(|p| coincident(point, p, match_radius)) {
                continue;
            }
            if stack
                .iter()
                .any(|walked| inside_open_disk(point, walked.position, step))
            {
                continue;
            }
            if candidates.iter().any(|c| coincident(*c, point, match_radius)) {
                continue;
            }
            candidates.push(point);
        }

        if candidates.is_empty() {
            return Probe::Failed(WalkFailure::DeadEnd);
        }

        let mut scored: Vec<(f64, Coord)> = candidates
            .into_iter()
            .map(|c| (cosine_similarity(position, c, target), c))
            .collect();
        // stable: equal scores keep network order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Probe::Branch(scored.into_iter().map(|(_, c)| c).collect())
    }

    /// The walked positions, ending exactly on `target`. A last position that
    /// already coincides with the target is replaced by it.
    fn finish(&self, stack: &[Frame], last: Coord, target: Coord) -> DiscoveredPath {
        let mut walked: Vec<Coord> = stack.iter().map(|f| f.position).collect();
        if walked.is_empty() || !coincident(last, target, self.params.match_radius()) {
            walked.push(last);
        }
        walked.push(target);
        DiscoveredPath::from_walk(&walked)
    }
}
