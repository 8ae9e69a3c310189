use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidatorError;

/// All tunables for a validator round, loaded once at startup and shared
/// read-only across the round orchestrator, executor, and scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// JSON-RPC endpoint of the chain node this validator trusts.
    pub node_rpc_url: String,

    /// Subnet this validator submits weights for.
    pub target_netuid: u16,

    /// Directory holding the stats RocksDB column families and any logs.
    pub data_dir: PathBuf,

    /// Seconds to sleep between rounds.
    pub round_interval_secs: u64,

    /// Number of miners drawn per round.
    pub sample_size: usize,

    /// Wall-clock budget, in seconds, for a single miner's two-stage probe.
    pub default_process_time: f64,

    /// Width of the recent-finalized window a challenge block is drawn from.
    pub challenge_history_window: u64,

    /// EMA smoothing factor applied to a selected uid's moving average.
    pub smoothing_alpha: f64,

    pub availability_weight: f64,
    pub latency_weight: f64,
    pub performance_weight: f64,
    pub reliability_weight: f64,
    pub distribution_weight: f64,

    /// Availability weight substituted in when a miner is verified but
    /// desynced from the chain tip.
    pub desync_availability_weight: f64,

    pub availability_failure_reward: f64,
    pub latency_failure_reward: f64,
    pub performance_failure_reward: f64,
    pub distribution_failure_reward: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            node_rpc_url: "http://127.0.0.1:8545".to_string(),
            target_netuid: 0,
            data_dir: PathBuf::from("./data/validator"),
            round_interval_secs: 300,
            sample_size: 50,
            default_process_time: 10.0,
            challenge_history_window: 256,
            smoothing_alpha: 0.1,
            availability_weight: 8.0,
            latency_weight: 7.0,
            performance_weight: 7.0,
            reliability_weight: 3.0,
            distribution_weight: 2.0,
            desync_availability_weight: 3.0,
            availability_failure_reward: 0.0,
            latency_failure_reward: 0.0,
            performance_failure_reward: 0.0,
            distribution_failure_reward: 0.0,
        }
    }
}

impl ValidatorConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidatorError> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ValidatorError::Config(e.to_string()))
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<(), ValidatorError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ValidatorError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Rejects configurations that would make the composite score
    /// undefined or the round loop pointless.
    pub fn validate(&self) -> Result<(), ValidatorError> {
        if self.sample_size == 0 {
            return Err(ValidatorError::Config("sample_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.smoothing_alpha) {
            return Err(ValidatorError::Config("smoothing_alpha must be in [0, 1]".into()));
        }
        let weight_sum = self.availability_weight
            + self.latency_weight
            + self.performance_weight
            + self.reliability_weight
            + self.distribution_weight;
        if weight_sum <= 0.0 {
            return Err(ValidatorError::Config("sub-score weights must sum to > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ValidatorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sample_size_is_rejected() {
        let mut cfg = ValidatorConfig::default();
        cfg.sample_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_alpha_is_rejected() {
        let mut cfg = ValidatorConfig::default();
        cfg.smoothing_alpha = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("validator.toml");

        let cfg = ValidatorConfig::default();
        cfg.to_file(&path).expect("write config");

        let loaded = ValidatorConfig::from_file(&path).expect("read config");
        assert_eq!(loaded.sample_size, cfg.sample_size);
        assert_eq!(loaded.node_rpc_url, cfg.node_rpc_url);
    }
}
