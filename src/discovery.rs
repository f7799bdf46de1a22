//! Runs a walker over every terminal pair and keeps going when a pair fails.

use crate::config::{DiscoveryMode, PlannerConfig};
use crate::errors::NoPathFound;
use crate::geometry::distance;
use crate::network::{RouteNetwork, Terminal};
use crate::path::DiscoveredPath;
use crate::path_walker::{ObstacleSet, PathWalker};
use crate::segment_walker::SegmentFrontierWalker;
use ahash::AHashSet;
use geo::Point;
use itertools::Itertools;
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info};

/// A path found between two named terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundPath {
    pub source: String,
    pub target: String,
    pub path: DiscoveredPath,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairFailureReason {
    NoPath(NoPathFound),
    /// No frontier branch from either terminal froze on the other.
    Unreached,
}

impl fmt::Display for PairFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairFailureReason::NoPath(err) => write!(f, "{}", err),
            PairFailureReason::Unreached => f.write_str("target never reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub source: String,
    pub target: String,
    pub reason: PairFailureReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    pub paths: Vec<FoundPath>,
    /// Unordered pairs a walker was run for.
    pub attempted: usize,
    /// Pairs left out by the straight-line distance prefilter.
    pub skipped: usize,
    pub failures: Vec<PairFailure>,
}

impl DiscoveryReport {
    pub fn discovered(&self) -> impl Iterator<Item = &DiscoveredPath> {
        self.paths.iter().map(|found| &found.path)
    }
}

pub struct PairDiscovery<'a> {
    network: &'a RouteNetwork,
    terminals: &'a [Terminal],
    config: &'a PlannerConfig,
}

impl<'a> PairDiscovery<'a> {
    pub fn new(network: &'a RouteNetwork, terminals: &'a [Terminal], config: &'a PlannerConfig) -> Self {
        Self {
            network,
            terminals,
            config,
        }
    }

    pub fn run(&self) -> DiscoveryReport {
        let report = match self.config.discovery {
            DiscoveryMode::Stepping => self.stepping(),
            DiscoveryMode::Segments => self.segments(),
        };
        info!(
            mode = ?self.config.discovery,
            attempted = report.attempted,
            skipped = report.skipped,
            found = report.paths.len(),
            failed = report.failures.len(),
            "path discovery finished"
        );
        report
    }

    fn locations(&self) -> Vec<Point<f64>> {
        self.terminals.iter().map(|t| t.location).collect()
    }

    fn name(&self, idx: usize) -> String {
        self.terminals[idx].name.clone()
    }

    /// One stepping walk per unordered pair within `max_pair_distance`. Every
    /// terminal other than the pair's own two is an obstacle.
    pub fn stepping(&self) -> DiscoveryReport {
        let locations = self.locations();
        let obstacles = if self.config.terminals_as_obstacles {
            ObstacleSet::new(&locations)
        } else {
            ObstacleSet::empty()
        };
        let walker = PathWalker::new(self.network, &obstacles, self.config.walk_params());

        let limit = self.config.pair_distance();
        let all_pairs = (0..locations.len()).tuple_combinations::<(usize, usize)>();
        let (pairs, far): (Vec<_>, Vec<_>) = all_pairs
            .partition(|&(s, e)| distance(locations[s].0, locations[e].0) <= limit);

        let walk = |&(s, e): &(usize, usize)| {
            let result = walker.walk_ignoring(locations[s], locations[e], &[s, e]);
            if let Err(err) = &result {
                debug!(
                    from = %self.terminals[s].name,
                    to = %self.terminals[e].name,
                    %err,
                    "pair failed"
                );
            }
            (s, e, result)
        };
        let results: Vec<(usize, usize, Result<DiscoveredPath, NoPathFound>)> =
            if self.config.parallel {
                pairs.par_iter().map(walk).collect()
            } else {
                pairs.iter().map(walk).collect()
            };

        let mut report = DiscoveryReport {
            attempted: pairs.len(),
            skipped: far.len(),
            ..Default::default()
        };
        for (s, e, result) in results {
            match result {
                Ok(path) => report.paths.push(FoundPath {
                    source: self.name(s),
                    target: self.name(e),
                    path,
                }),
                Err(err) => report.failures.push(PairFailure {
                    source: self.name(s),
                    target: self.name(e),
                    reason: PairFailureReason::NoPath(err),
                }),
            }
        }
        report
    }

    /// One frontier walk per terminal towards all the others. A pair fails only
    /// when neither of its terminals reached the other.
    pub fn segments(&self) -> DiscoveryReport {
        let locations = self.locations();
        let walker = SegmentFrontierWalker::new(self.network, self.config.tolerance);

        let walk_from = |source: usize| {
            let others: Vec<usize> = (0..locations.len()).filter(|&i| i != source).collect();
            let targets: Vec<Point<f64>> = others.iter().map(|&i| locations[i]).collect();
            let outcome = walker.walk(locations[source], &targets);
            debug!(
                from = %self.terminals[source].name,
                branches = outcome.branches.len(),
                vanished = outcome.vanished,
                rounds = outcome.rounds,
                "frontier walk finished"
            );
            outcome
                .branches
                .iter()
                .map(|branch| (source, others[branch.target], branch.to_path(self.network)))
                .collect::<Vec<_>>()
        };
        let found: Vec<Vec<(usize, usize, DiscoveredPath)>> = if self.config.parallel {
            (0..locations.len()).into_par_iter().map(walk_from).collect()
        } else {
            (0..locations.len()).map(walk_from).collect()
        };

        let mut report = DiscoveryReport::default();
        let mut reached: AHashSet<(usize, usize)> = AHashSet::new();
        for (s, e, path) in found.into_iter().flatten() {
            reached.insert((s.min(e), s.max(e)));
            report.paths.push(FoundPath {
                source: self.name(s),
                target: self.name(e),
                path,
            });
        }

        for (s, e) in (0..locations.len()).tuple_combinations::<(usize, usize)>() {
            report.attempted += 1;
            if !reached.contains(&(s, e)) {
                report.failures.push(PairFailure {
                    source: self.name(s),
                    target: self.name(e),
                    reason: PairFailureReason::Unreached,
                });
            }
        }
        report
    }
}
