use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a single stepping branch stopped short of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkFailure {
    /// An obstacle sits within one step of the current position.
    Blocked,
    /// The remaining travel budget is smaller than one step.
    Exhausted,
    /// No route geometry left to step onto.
    DeadEnd,
}

impl fmt::Display for WalkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WalkFailure::Blocked => "blocked by obstacle",
            WalkFailure::Exhausted => "travel budget exhausted",
            WalkFailure::DeadEnd => "dead end",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("no path found after {steps} steps ({reason})")]
pub struct NoPathFound {
    pub reason: WalkFailure,
    pub steps: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// An edge names a terminal that is not part of the graph's node set.
    #[error("can't insert edge because terminal '{name}' is not in the graph")]
    UnknownTerminal { name: String },
    #[error("group seeded at '{seed}' holds {size} of {expected} terminals")]
    PartialGroup {
        seed: String,
        size: usize,
        expected: usize,
    },
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl PlanError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlanError::UnknownTerminal { .. } | PlanError::InvalidConfig { .. }
        )
    }

    pub(crate) fn positive(field: &'static str, value: f64) -> Result<(), PlanError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(PlanError::InvalidConfig {
                field,
                reason: format!("must be a positive finite number, got {}", value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        let unknown = PlanError::UnknownTerminal {
            name: "nap_7".to_string(),
        };
        assert!(unknown.is_fatal());

        let partial = PlanError::PartialGroup {
            seed: "nap_7".to_string(),
            size: 3,
            expected: 8,
        };
        assert!(!partial.is_fatal());
    }

    #[test]
    fn test_no_path_message_names_the_failure() {
        let no_path = NoPathFound {
            reason: WalkFailure::DeadEnd,
            steps: 4,
        };
        assert_eq!(no_path.to_string(), "no path found after 4 steps (dead end)");
    }

    #[test]
    fn test_positive_rejects_zero_and_nan() {
        assert!(PlanError::positive("step_size", 1.0).is_ok());
        assert!(PlanError::positive("step_size", 0.0).is_err());
        assert!(PlanError::positive("step_size", f64::NAN).is_err());
        assert!(PlanError::positive("step_size", -2.0).is_err());
    }
}
