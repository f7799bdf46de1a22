//! Generational frontier search over whole route polylines.
//!
//! Every route is an atomic edge between its two ends. Each round, every live
//! walker that is not standing on a target spawns one child per untaken route
//! leaving its position. After the round, the routes walked by all surviving
//! walkers become forbidden for the next round, so a route is claimed by at most
//! one branch step per run. A target that is only reachable through a route
//! already claimed by a sibling is reported as unreached.

use crate::geometry::coincident;
use crate::network::{RouteEnd, RouteId, RouteNetwork};
use crate::path::DiscoveredPath;
use ahash::AHashSet;
use geo::{Coord, Point};
use itertools::Either;
use tracing::debug;

/// One route taken by a branch, in walking direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkedRoute {
    pub route: RouteId,
    /// True when the route was walked from its last point to its first.
    pub reversed: bool,
}

/// A branch that froze on a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Index into the targets the walk was started with.
    pub target: usize,
    pub walked: Vec<WalkedRoute>,
}

impl Branch {
    pub fn length(&self, network: &RouteNetwork) -> f64 {
        self.walked
            .iter()
            .map(|w| network.route_length(w.route))
            .sum()
    }

    /// Concatenates the walked routes into one simplified path.
    pub fn to_path(&self, network: &RouteNetwork) -> DiscoveredPath {
        let mut coords: Vec<Coord> = Vec::new();
        for walked in &self.walked {
            let route = &network.route(walked.route).0;
            let oriented = if walked.reversed {
                Either::Left(route.iter().rev())
            } else {
                Either::Right(route.iter())
            };
            for &c in oriented {
                if coords.last() != Some(&c) {
                    coords.push(c);
                }
            }
        }
        DiscoveredPath::from_walk(&coords)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontierOutcome {
    pub branches: Vec<Branch>,
    pub rounds: usize,
    /// Branches that died out, either at a dead end or by losing a route claim.
    pub vanished: usize,
}

impl FrontierOutcome {
    pub fn reached(&self, target: usize) -> bool {
        self.branches.iter().any(|b| b.target == target)
    }
}

#[derive(Debug, Clone)]
struct Walker {
    position: Coord,
    walked: Vec<WalkedRoute>,
}

impl Walker {
    /// Children over every route leaving this position that is neither walked by
    /// this walker nor forbidden.
    fn expand(
        &self,
        network: &RouteNetwork,
        forbidden: &AHashSet<RouteId>,
        tolerance: f64,
    ) -> Vec<Walker> {
        let mut children: Vec<Walker> = Vec::new();
        for (route, end) in network.route_ends_near(self.position, tolerance) {
            if forbidden.contains(&route) || self.walked.iter().any(|w| w.route == route) {
                continue;
            }
            if children
                .iter()
                .any(|c| c.walked.last().map(|w| w.route) == Some(route))
            {
                // closed loop: both ends touch this position
                continue;
            }
            let mut walked = self.walked.clone();
            walked.push(WalkedRoute {
                route,
                reversed: end == RouteEnd::End,
            });
            children.push(Walker {
                position: network.end_point(route, end.opposite()),
                walked,
            });
        }
        children
    }
}

pub struct SegmentFrontierWalker<'a> {
    network: &'a RouteNetwork,
    tolerance: f64,
}

impl<'a> SegmentFrontierWalker<'a> {
    pub fn new(network: &'a RouteNetwork, tolerance: f64) -> Self {
        Self { network, tolerance }
    }

    fn matching_target(&self, position: Coord, targets: &[Point<f64>]) -> Option<usize> {
        targets
            .iter()
            .position(|t| coincident(position, t.0, self.tolerance))
    }

    pub fn walk(&self, source: Point<f64>, targets: &[Point<f64>]) -> FrontierOutcome {
        let mut outcome = FrontierOutcome::default();
        let mut frontier = vec![Walker {
            position: source.0,
            walked: Vec::new(),
        }];
        // Routes held by frozen branches stay forbidden for the rest of the run.
        let mut frozen_routes: AHashSet<RouteId> = AHashSet::new();
        let mut forbidden: AHashSet<RouteId> = AHashSet::new();

        loop {
            let mut live = Vec::with_capacity(frontier.len());
            for walker in frontier {
                match self.matching_target(walker.position, targets) {
                    Some(target) => {
                        frozen_routes.extend(walker.walked.iter().map(|w| w.route));
                        outcome.branches.push(Branch {
                            target,
                            walked: walker.walked,
                        });
                    }
                    None => live.push(walker),
                }
            }

            if live.is_empty() {
                break;
            }
            outcome.rounds += 1;

            // Every walker expands against the same published forbidden set.
            let proposals: Vec<Vec<Walker>> = live
                .iter()
                .map(|w| w.expand(self.network, &forbidden, self.tolerance))
                .collect();

            // Round barrier: settle claims, then publish the next forbidden set.
            let mut claimed: AHashSet<RouteId> = AHashSet::new();
            let mut next = Vec::new();
            for children in proposals {
                if children.is_empty() {
                    outcome.vanished += 1;
                    continue;
                }
                for child in children {
                    let Some(taken) = child.walked.last() else {
                        continue;
                    };
                    if claimed.insert(taken.route) {
                        next.push(child);
                    } else {
                        outcome.vanished += 1;
                    }
                }
            }

            forbidden = frozen_routes.clone();
            for walker in &next {
                forbidden.extend(walker.walked.iter().map(|w| w.route));
            }

            debug!(
                round = outcome.rounds,
                live = next.len(),
                frozen = outcome.branches.len(),
                forbidden = forbidden.len(),
                "frontier round finished"
            );
            frontier = next;
        }

        // A source standing on a target is not a route.
        outcome.branches.retain(|b| !b.walked.is_empty());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use geo::{line_string, point};

    /// Source in the middle, three arms, one arm forks.
    ///
    ///            (0,10) T2
    ///              |
    ///  T1 (-10,0)--S(0,0)--(10,0)--(20,0) T3
    ///                         |
    ///                      (10,-10) dead end
    fn star_network() -> RouteNetwork {
        RouteNetwork::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: -10.0, y: 0.0)],
            line_string![(x: 0.0, y: 10.0), (x: 0.0, y: 5.0), (x: 0.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 10.0, y: -10.0)],
        ])
    }

    #[test]
    fn test_reaches_every_target() {
        let network = star_network();
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let targets = [
            point! { x: -10.0, y: 0.0 },
            point! { x: 0.0, y: 10.0 },
            point! { x: 20.0, y: 0.0 },
        ];

        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &targets);

        assert!(outcome.reached(0) && outcome.reached(1) && outcome.reached(2));
        assert_eq!(outcome.branches.len(), 3);
        // the (10,-10) spur dies out
        assert_eq!(outcome.vanished, 1);

        let to_t3 = outcome.branches.iter().find(|b| b.target == 2).unwrap();
        assert_eq!(to_t3.walked.len(), 2);
        assert!((to_t3.length(&network) - 20.0).abs() < 1e-12);

        let path = to_t3.to_path(&network);
        assert_eq!(path.vertex_count(), 2);
        assert!((path.length - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_route_is_walked_backwards() {
        let network = star_network();
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &[point! { x: 0.0, y: 10.0 }]);

        let branch = &outcome.branches[0];
        assert_eq!(
            branch.walked,
            vec![WalkedRoute {
                route: 1,
                reversed: true
            }]
        );
        let path = branch.to_path(&network);
        assert_eq!(path.start(), Some(point! { x: 0.0, y: 0.0 }));
        assert_eq!(path.end(), Some(point! { x: 0.0, y: 10.0 }));
    }

    #[test]
    fn test_branches_never_share_a_route() {
        // Two parallel routes into the same junction, then one shared exit.
        let network = RouteNetwork::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0), (x: 10.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: -5.0), (x: 10.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
            line_string![(x: 20.0, y: 0.0), (x: 30.0, y: 0.0)],
            line_string![(x: 20.0, y: 0.0), (x: 20.0, y: 10.0)],
        ]);
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let targets = [point! { x: 30.0, y: 0.0 }, point! { x: 20.0, y: 10.0 }];

        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &targets);

        // A route is claimed once per run: branches that both hold it inherited it
        // from the same ancestor, so everything up to it is identical.
        let mut claims: AHashMap<RouteId, &[WalkedRoute]> = AHashMap::new();
        for branch in &outcome.branches {
            for (depth, walked) in branch.walked.iter().enumerate() {
                let prefix = &branch.walked[..=depth];
                let claim = claims.entry(walked.route).or_insert(prefix);
                assert_eq!(*claim, prefix, "route {} claimed twice", walked.route);
            }
        }
        assert!(outcome.reached(0) && outcome.reached(1));
        // the sibling arriving over route 1 lost the claim on route 2
        assert!(outcome.branches.iter().all(|b| b.walked[0].route == 0));
    }

    #[test]
    fn test_frozen_branch_forces_longer_route() {
        // The short way to (10,10) leaves from (10,0), where the first branch froze.
        let network = RouteNetwork::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: -10.0, y: 0.0)],
            line_string![(x: -10.0, y: 0.0), (x: -10.0, y: 10.0), (x: 10.0, y: 10.0)],
            line_string![(x: 10.0, y: 10.0), (x: 10.0, y: 0.0)],
        ]);
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let targets = [point! { x: 10.0, y: 0.0 }, point! { x: 10.0, y: 10.0 }];

        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &targets);

        assert!(outcome.reached(0));
        assert!(outcome.reached(1));
        let to_far_corner = outcome.branches.iter().find(|b| b.target == 1).unwrap();
        assert_eq!(to_far_corner.walked.len(), 2);
        assert!(to_far_corner.walked.iter().all(|w| w.route != 0));
    }

    #[test]
    fn test_target_behind_frozen_target_is_unreached() {
        let network = RouteNetwork::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
        ]);
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let targets = [point! { x: 10.0, y: 0.0 }, point! { x: 20.0, y: 0.0 }];

        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &targets);

        assert!(outcome.reached(0));
        assert!(!outcome.reached(1));
    }

    #[test]
    fn test_unreachable_target_vanishes_without_answer() {
        let network = RouteNetwork::new(vec![line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]]);
        let walker = SegmentFrontierWalker::new(&network, 0.01);

        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &[point! { x: 50.0, y: 50.0 }]);

        assert!(outcome.branches.is_empty());
        assert_eq!(outcome.vanished, 1);
        assert_eq!(outcome.rounds, 2);
    }

    #[test]
    fn test_source_on_target_is_not_reported() {
        let network = star_network();
        let walker = SegmentFrontierWalker::new(&network, 0.01);
        let outcome = walker.walk(point! { x: 0.0, y: 0.0 }, &[point! { x: 0.0, y: 0.0 }]);
        assert!(outcome.branches.is_empty());
        assert_eq!(outcome.rounds, 0);
    }
}
