use crate::errors::PlanError;
use crate::graph::EdgeMetric;
use crate::network::SnapMode;
use crate::path_walker::WalkParams;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Which walker produces the candidate paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Point-stepping search for every terminal pair.
    #[default]
    Stepping,
    /// Whole-route frontier search from every terminal.
    Segments,
}

/// Settings for one planning run. Lengths are in the units of the input
/// coordinates, normally metres.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Maximum distance for two points to count as the same point.
    pub tolerance: f64,
    pub step_size: f64,
    pub reach_distance: f64,
    pub max_walking_distance: f64,
    /// Pairs further apart than this in a straight line are not walked.
    /// Falls back to `max_walking_distance`.
    pub max_pair_distance: Option<f64>,
    pub group_size: usize,
    pub minimize: EdgeMetric,
    pub discovery: DiscoveryMode,
    pub snap: SnapMode,
    /// Every terminal other than the pair being walked blocks the walk.
    pub terminals_as_obstacles: bool,
    pub parallel: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            step_size: 3.0,
            reach_distance: 3.0,
            max_walking_distance: 500.0,
            max_pair_distance: None,
            group_size: 8,
            minimize: EdgeMetric::Length,
            discovery: DiscoveryMode::Stepping,
            snap: SnapMode::Network,
            terminals_as_obstacles: true,
            parallel: true,
        }
    }
}

impl PlannerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config: PlannerConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PlanError::InvalidConfig {
                field: "tolerance",
                reason: format!("must be a non-negative finite number, got {}", self.tolerance),
            });
        }
        self.walk_params().validate()?;
        if let Some(pair) = self.max_pair_distance {
            PlanError::positive("max_pair_distance", pair)?;
        }
        if self.group_size == 0 {
            return Err(PlanError::InvalidConfig {
                field: "group_size",
                reason: "must be at least 1".to_string(),
            });
        }
        // the frontier walker only moves between route ends
        if self.discovery == DiscoveryMode::Segments && self.snap == SnapMode::Network {
            return Err(PlanError::InvalidConfig {
                field: "snap",
                reason: "segment discovery needs terminals on route ends, use \"endpoint\""
                    .to_string(),
            });
        }
        Ok(())
    }

    pub fn walk_params(&self) -> WalkParams {
        WalkParams {
            step_size: self.step_size,
            reach_distance: self.reach_distance,
            max_distance: self.max_walking_distance,
        }
    }

    pub fn pair_distance(&self) -> f64 {
        self.max_pair_distance.unwrap_or(self.max_walking_distance)
    }
}
