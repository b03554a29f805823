use std::time::Duration;

use plait_ledger::CheckpointPolicy;
use plait_types::MergeDirection;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Configuration for a [`Repository`](crate::Repository).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Persist a checkpoint on every commit whose idx is a multiple of this.
    /// Zero disables checkpoints.
    pub checkpoint_interval: u64,
    /// Only checkpoint commits at least this many commits below the one
    /// being materialized, so recent commits that may still be rebased are
    /// never checkpointed.
    pub checkpoint_min_age: u64,
    /// Lifetime of memoized LCS results, in seconds.
    pub cache_ttl_secs: u64,
    /// Direction used when a merge call does not name one.
    pub default_direction: MergeDirection,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: CheckpointPolicy::DEFAULT_INTERVAL,
            checkpoint_min_age: CheckpointPolicy::DEFAULT_INTERVAL,
            cache_ttl_secs: 300,
            default_direction: MergeDirection::Yours,
        }
    }
}

impl RepoConfig {
    /// Parse a TOML document. Missing keys take their default.
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        toml::from_str(source).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn checkpoint_policy(&self) -> CheckpointPolicy {
        CheckpointPolicy {
            interval: self.checkpoint_interval,
            min_age: self.checkpoint_min_age,
        }
    }
}
