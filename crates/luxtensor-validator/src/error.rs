use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling a challenge from the validator's own
/// chain view. Always converted to `Ok(None)` inside `ChallengeGenerator`;
/// exposed publicly only so callers can log the underlying cause.
#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("failed to fetch current block: {0}")]
    CurrentBlock(String),

    #[error("no subnets registered at block {0}")]
    NoSubnets(u64),

    #[error("subnet {netuid} has no neurons at block {block}")]
    NoNeurons { netuid: u16, block: u64 },

    #[error("chain probe error: {0}")]
    ChainProbe(String),
}

/// Reason a miner failed a challenge. Carried on `Verdict` rather than
/// raised, so an executor task never returns `Err` to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorReason {
    #[error("hostname could not be resolved")]
    HostnameUnresolved,
    #[error("destination host is unreachable")]
    HostUnreachable,
    #[error("request timed out")]
    TimedOut,
    #[error("unknown reachability error")]
    UnknownReachability,
    #[error("failed to connect to the miner's chain RPC endpoint")]
    RpcConnectFailed,
    #[error("invalid uid or netuid")]
    InvalidUidOrNetuid,
    #[error("invalid or unavailable block number")]
    InvalidBlock,
    #[error("requested property not found on the returned neuron")]
    PropertyNotFound,
    #[error("failed to retrieve neuron details")]
    RetrievalFailed,
    #[error("returned value does not match the expected value")]
    Mismatch,
    #[error("probe exceeded its wall-clock budget")]
    TimedOutBudget,
}

/// Errors from the persisted per-miner statistics store. Always logged and
/// swallowed by the orchestrator; never aborts a round.
#[derive(Error, Debug)]
pub enum StatsStoreError {
    #[error("stats store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Aggregate error for steps 1-3 of a round (Prepare/Generate/Select).
/// Any of these abort the current round only.
#[derive(Error, Debug)]
pub enum RoundError {
    #[error("failed to refresh metagraph: {0}")]
    MetagraphRefresh(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error("miner selection failed: {0}")]
    Selection(String),
}

/// Error returned by the external weight submitter. The in-memory moving
/// average is retained even when submission fails; only the on-chain write
/// is considered lost, and the next round will retry it with fresh values.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("weight submission failed: {0}")]
    Submit(String),
}

/// Error returned by `MinerRpc::send_scope`. Logged and swallowed by the
/// orchestrator; a miner that can't be reached simply keeps its previous
/// `version` on the snapshot.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("failed to reach miner for send_scope: {0}")]
    Connect(String),
    #[error("miner rejected the pushed score: {0}")]
    Rejected(String),
}

/// Top-level error aggregating every layer, used by the `luxtensor-validator`
/// binary's `main`.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    StatsStore(#[from] StatsStoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
