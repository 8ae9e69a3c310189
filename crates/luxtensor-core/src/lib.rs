pub mod account;
pub mod block;
pub mod bridge;
pub mod constants;
pub mod error;
pub mod hnsw;
pub mod mempool;
pub mod multisig;
pub mod receipt;
pub mod rlp;
pub mod semantic_registry;
pub mod state;
pub mod subnet;
pub mod metagraph_tx;
pub mod transaction;
pub mod types;
pub mod unified_state;

pub use account::{Account, BalanceError};
pub use block::{Block, BlockHeader};
pub use constants::{addresses, chain_id, consensus, network, tokenomics, transaction as transaction_constants};
pub use error::{CoreError, Result};
pub use mempool::{MempoolError, PendingTxMetadata, UnifiedMempool};
pub use state::{CodeStore, RocksDbLike, StateDB};
pub use subnet::{
    EmissionShare, ProtocolGuardrails, RootConfig, RootValidatorInfo, SubnetConfig, SubnetInfo,
    SubnetRegistrationResult, SubnetType, SubnetWeights,
};
pub use metagraph_tx::MetagraphTxPayload;
pub use transaction::Transaction;
pub use types::{Address, Hash};
pub use unified_state::{ContractInfo, StorageSlot, UnifiedStateDB};
