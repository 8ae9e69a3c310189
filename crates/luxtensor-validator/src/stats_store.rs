use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::{Deserialize, Serialize};

use crate::error::StatsStoreError;

const CF_MINER_STATS: &str = "miner_stats";
const CF_MOVING_AVERAGE: &str = "moving_average";

/// Per-uid cumulative counters that survive across rounds, independent of
/// the round-local `MinerSnapshot`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinerStats {
    pub challenge_attempts: u64,
    pub challenge_successes: u64,
    pub version: Option<String>,
    pub last_round: u64,
}

/// Persisted state the round orchestrator reads at `Prepare` and writes at
/// `Smooth`: cumulative per-miner counters plus the stake-indexed moving
/// average vector consumed and produced by the reward smoother.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn load_stats(&self, uid: u16) -> Result<MinerStats, StatsStoreError>;
    async fn save_stats(&self, uid: u16, stats: MinerStats) -> Result<(), StatsStoreError>;

    async fn load_moving_average(&self) -> Result<Vec<f64>, StatsStoreError>;
    async fn save_moving_average(&self, values: &[f64]) -> Result<(), StatsStoreError>;
}

/// RocksDB-backed `StatsStore`, one column family for per-uid counters and
/// one for the moving average vector (stored whole, under a fixed key,
/// since it is read and written as a unit once per round).
pub struct RocksStatsStore {
    db: Arc<DB>,
}

impl RocksStatsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StatsStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_opts = Options::default();
        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_MINER_STATS, cf_opts.clone()),
            ColumnFamilyDescriptor::new(CF_MOVING_AVERAGE, cf_opts),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| StatsStoreError::Backend(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl StatsStore for RocksStatsStore {
    async fn load_stats(&self, uid: u16) -> Result<MinerStats, StatsStoreError> {
        let cf = self
            .db
            .cf_handle(CF_MINER_STATS)
            .ok_or_else(|| StatsStoreError::Backend("missing miner_stats column family".into()))?;

        match self.db.get_cf(&cf, uid.to_be_bytes()) {
            Ok(Some(bytes)) => bincode::deserialize(&bytes).map_err(|e| StatsStoreError::Serialization(e.to_string())),
            Ok(None) => Ok(MinerStats::default()),
            Err(e) => Err(StatsStoreError::Backend(e.to_string())),
        }
    }

    async fn save_stats(&self, uid: u16, stats: MinerStats) -> Result<(), StatsStoreError> {
        let cf = self
            .db
            .cf_handle(CF_MINER_STATS)
            .ok_or_else(|| StatsStoreError::Backend("missing miner_stats column family".into()))?;

        let bytes = bincode::serialize(&stats).map_err(|e| StatsStoreError::Serialization(e.to_string()))?;
        self.db
            .put_cf(&cf, uid.to_be_bytes(), bytes)
            .map_err(|e| StatsStoreError::Backend(e.to_string()))
    }

    async fn load_moving_average(&self) -> Result<Vec<f64>, StatsStoreError> {
        let cf = self
            .db
            .cf_handle(CF_MOVING_AVERAGE)
            .ok_or_else(|| StatsStoreError::Backend("missing moving_average column family".into()))?;

        match self.db.get_cf(&cf, b"vector") {
            Ok(Some(bytes)) => bincode::deserialize(&bytes).map_err(|e| StatsStoreError::Serialization(e.to_string())),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(StatsStoreError::Backend(e.to_string())),
        }
    }

    async fn save_moving_average(&self, values: &[f64]) -> Result<(), StatsStoreError> {
        let cf = self
            .db
            .cf_handle(CF_MOVING_AVERAGE)
            .ok_or_else(|| StatsStoreError::Backend("missing moving_average column family".into()))?;

        let bytes = bincode::serialize(values).map_err(|e| StatsStoreError::Serialization(e.to_string()))?;
        self.db
            .put_cf(&cf, b"vector", bytes)
            .map_err(|e| StatsStoreError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_uid_returns_default_stats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RocksStatsStore::open(dir.path()).expect("open store");

        let stats = store.load_stats(7).await.expect("load");
        assert_eq!(stats.challenge_attempts, 0);
        assert_eq!(stats.challenge_successes, 0);
    }

    #[tokio::test]
    async fn stats_round_trip_through_rocksdb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RocksStatsStore::open(dir.path()).expect("open store");

        let stats = MinerStats {
            challenge_attempts: 10,
            challenge_successes: 8,
            version: Some("1.4.0".into()),
            last_round: 3,
        };
        store.save_stats(42, stats).await.expect("save");

        let loaded = store.load_stats(42).await.expect("load");
        assert_eq!(loaded.challenge_attempts, 10);
        assert_eq!(loaded.challenge_successes, 8);
        assert_eq!(loaded.version, Some("1.4.0".into()));
        assert_eq!(loaded.last_round, 3);
    }

    #[tokio::test]
    async fn moving_average_round_trips_and_defaults_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RocksStatsStore::open(dir.path()).expect("open store");

        assert!(store.load_moving_average().await.expect("load").is_empty());

        store.save_moving_average(&[0.1, 0.2, 0.3]).await.expect("save");
        let loaded = store.load_moving_average().await.expect("load");
        assert_eq!(loaded, vec![0.1, 0.2, 0.3]);
    }
}
