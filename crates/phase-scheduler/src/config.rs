//! Policy configuration
//!
//! Parameters come from environment-style keys, prefixed per policy family:
//!
//! | Fixed / RandomTopK | CapacityTopK | Domain | Default |
//! |--------------------|--------------|--------|---------|
//! | `CHOICE_APPROACH` | `CAPACITY_APPROACH` | `QUICKEST`, `FEWEST_HOPS` | `QUICKEST` |
//! | `CHOICE_NUM_PATHS` | `CAPACITY_NUM_PATHS` | 1..=8 | 2 |
//! | | `CAPACITY_THRESHOLD` | (0, 100] | 0.7 |
//!
//! `CAPACITY_TRESHOLD` is accepted as a legacy spelling.

use crate::policy::PolicyKind;
use serde::{Deserialize, Serialize};
use temporal_graph::{Approach, ParseApproachError};
use thiserror::Error;
use tracing::debug;

/// Smallest accepted number of ranked alternatives
pub const MIN_PATHS: usize = 1;
/// Largest accepted number of ranked alternatives
pub const MAX_PATHS: usize = 8;

pub const DEFAULT_NUM_PATHS: usize = 2;
pub const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key}: {source}")]
    Approach {
        key: String,
        #[source]
        source: ParseApproachError,
    },
    #[error("{key} must be an integer in [1, 8], got {value:?}")]
    NumPaths { key: String, value: String },
    #[error("{key} must be a number in (0, 100], got {value:?}")]
    Threshold { key: String, value: String },
    #[error("Unknown scheduling policy: {0}")]
    UnknownPolicy(String),
}

/// Policy parameters, immutable after setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub approach: Approach,
    /// Number of ranked alternatives (K)
    pub num_paths: usize,
    /// Load threshold for the capacity policy
    pub threshold: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            approach: Approach::Quickest,
            num_paths: DEFAULT_NUM_PATHS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Params {
    pub fn new(approach: Approach, num_paths: usize, threshold: f64) -> Self {
        Self {
            approach,
            num_paths,
            threshold,
        }
    }

    /// Check ranges of programmatically built parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_num_paths(self.num_paths) {
            return Err(ConfigError::NumPaths {
                key: "num_paths".to_string(),
                value: self.num_paths.to_string(),
            });
        }
        if !valid_threshold(self.threshold) {
            return Err(ConfigError::Threshold {
                key: "threshold".to_string(),
                value: self.threshold.to_string(),
            });
        }
        Ok(())
    }

    /// Read parameters for `kind` from the process environment.
    pub fn from_env(kind: PolicyKind) -> Result<Self, ConfigError> {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Read parameters for `kind` from any key/value source. Missing keys
    /// keep their defaults.
    pub fn from_lookup<F>(kind: PolicyKind, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = kind.env_prefix();
        let mut params = Params::default();

        let key = format!("{}APPROACH", prefix);
        if let Some(value) = lookup(&key) {
            params.approach = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::Approach { key, source })?;
        }

        if kind != PolicyKind::Fixed {
            let key = format!("{}NUM_PATHS", prefix);
            if let Some(value) = lookup(&key) {
                params.num_paths = match value.trim().parse::<usize>() {
                    Ok(n) if valid_num_paths(n) => n,
                    _ => return Err(ConfigError::NumPaths { key, value }),
                };
            }
        }

        if kind == PolicyKind::CapacityTopK {
            let key = format!("{}THRESHOLD", prefix);
            let legacy = format!("{}TRESHOLD", prefix);
            let found = lookup(&key)
                .map(|value| (key, value))
                .or_else(|| lookup(&legacy).map(|value| (legacy, value)));
            if let Some((key, value)) = found {
                params.threshold = match value.trim().parse::<f64>() {
                    Ok(t) if valid_threshold(t) => t,
                    _ => return Err(ConfigError::Threshold { key, value }),
                };
            }
        }

        debug!(policy = %kind, ?params, "Loaded policy parameters");
        Ok(params)
    }
}

fn valid_num_paths(n: usize) -> bool {
    (MIN_PATHS..=MAX_PATHS).contains(&n)
}

fn valid_threshold(t: f64) -> bool {
    t > 0.0 && t <= 100.0
}
