// LuxTensor storage module
// Phase 4: Storage Layer implementation

pub mod bridge_store;
pub mod cache;
pub mod checkpoint;
pub mod db;
pub mod error;
pub mod evm_store;
pub mod maintenance;
pub mod metagraph_store;
pub mod merkle_cache;
pub mod state_db;
pub mod trie;

pub use checkpoint::{CheckpointManager, CheckpointMetadata, CheckpointConfig, CHECKPOINT_INTERVAL, MAX_CHECKPOINTS};
pub use db::BlockchainDB;
pub use error::*;
pub use evm_store::{EvmAccountRecord, EvmStateStore};
pub use maintenance::{DbMaintenance, BackupConfig, PruningConfig, BackupInfo, PruningStats};
pub use metagraph_store::{MetagraphDB, StakingData, DelegationData, SubnetData, NeuronData, ValidatorData, WeightData};
pub use merkle_cache::{CachedStateDB, MerkleCacheConfig, MerkleCacheStats};
pub use state_db::StateDB;
pub use trie::MerkleTrie;
