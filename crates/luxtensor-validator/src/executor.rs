use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::challenge::ChallengeTuple;
use crate::chain::{NeuronLite, PropertyValue};
use crate::config::ValidatorConfig;
use crate::error::ExecutorReason;
use crate::miner::{MinerSnapshot, UNMEASURED};

/// Outcome of probing one miner for one challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub uid: u16,
    pub verified: bool,
    /// True when the miner's own reported current block is within one block
    /// of the validator's (`ChallengeTuple::validator_block`). Only
    /// meaningful once Stage B has actually reached the miner.
    pub sync: bool,
    pub reason: Option<ExecutorReason>,
    pub routing_time: f64,
    pub process_time: f64,
}

/// True iff the miner's reported current block is within one block of the
/// validator's own trusted view.
fn is_in_sync(miner_block: u64, validator_block: u64) -> bool {
    miner_block.abs_diff(validator_block) <= 1
}

/// A minimal JSON-RPC-over-websocket client used to replay the historical
/// neuron query against the miner's own chain endpoint. Kept separate from
/// `ChainProbe`/`HttpChainProbe` (which speaks for the validator's own
/// trusted node) since this one dials an untrusted, remote peer.
#[async_trait::async_trait]
pub trait MinerRpcProbe: Send + Sync {
    async fn neuron_for_uid_lite(
        &self,
        ip: &str,
        netuid: u16,
        uid: u16,
        block: u64,
    ) -> Result<NeuronLite, ExecutorReason>;

    /// The miner's own reported chain tip, used to measure `sync`.
    async fn current_block(&self, ip: &str) -> Result<u64, ExecutorReason>;
}

/// Default `MinerRpcProbe`: dials `ws://<ip>:9944` with `tokio-tungstenite`
/// and sends a single JSON-RPC request.
pub struct WsMinerRpcProbe;

#[async_trait::async_trait]
impl MinerRpcProbe for WsMinerRpcProbe {
    async fn neuron_for_uid_lite(
        &self,
        ip: &str,
        netuid: u16,
        uid: u16,
        block: u64,
    ) -> Result<NeuronLite, ExecutorReason> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let url = format!("ws://{ip}:9944");
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|_| ExecutorReason::RpcConnectFailed)?;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "subnet_neuronForUidLite",
            "params": [netuid, uid, block],
        });

        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|_| ExecutorReason::RpcConnectFailed)?;

        let response = ws
            .next()
            .await
            .ok_or(ExecutorReason::RetrievalFailed)?
            .map_err(|_| ExecutorReason::RetrievalFailed)?;

        let text = response
            .into_text()
            .map_err(|_| ExecutorReason::RetrievalFailed)?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|_| ExecutorReason::RetrievalFailed)?;

        if value.get("error").is_some() {
            return Err(classify_rpc_error(&value));
        }

        let result = value.get("result").ok_or(ExecutorReason::RetrievalFailed)?;
        serde_json::from_value(result.clone()).map_err(|_| ExecutorReason::RetrievalFailed)
    }

    async fn current_block(&self, ip: &str) -> Result<u64, ExecutorReason> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let url = format!("ws://{ip}:9944");
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|_| ExecutorReason::RpcConnectFailed)?;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "chain_getCurrentBlock",
            "params": [],
        });

        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|_| ExecutorReason::RpcConnectFailed)?;

        let response = ws
            .next()
            .await
            .ok_or(ExecutorReason::RetrievalFailed)?
            .map_err(|_| ExecutorReason::RetrievalFailed)?;

        let text = response
            .into_text()
            .map_err(|_| ExecutorReason::RetrievalFailed)?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|_| ExecutorReason::RetrievalFailed)?;

        if value.get("error").is_some() {
            return Err(classify_rpc_error(&value));
        }

        let result = value.get("result").ok_or(ExecutorReason::RetrievalFailed)?;
        serde_json::from_value(result.clone()).map_err(|_| ExecutorReason::RetrievalFailed)
    }
}

fn classify_rpc_error(value: &serde_json::Value) -> ExecutorReason {
    let message = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("");

    if message.contains("uid") || message.contains("netuid") {
        ExecutorReason::InvalidUidOrNetuid
    } else if message.contains("block") {
        ExecutorReason::InvalidBlock
    } else {
        ExecutorReason::RetrievalFailed
    }
}

/// Runs the two-stage probe (reachability, then RPC replay) for every
/// selected miner concurrently, one `tokio::spawn`-ed task per miner.
pub struct ChallengeExecutor<'a> {
    config: &'a ValidatorConfig,
    rpc: &'a dyn MinerRpcProbe,
}

impl<'a> ChallengeExecutor<'a> {
    pub fn new(config: &'a ValidatorConfig, rpc: &'a dyn MinerRpcProbe) -> Self {
        Self { config, rpc }
    }

    /// Fan out one probe task per miner and await the barrier. Mutates each
    /// miner's timing fields in place with the EMA update; returns the
    /// verdicts in the same order as `miners`.
    pub async fn execute(&self, miners: &mut [MinerSnapshot], challenge: &ChallengeTuple) -> Vec<Verdict> {
        let budget = Duration::from_secs_f64(self.config.default_process_time.max(0.001));

        let tasks = miners.iter().map(|miner| {
            let ip = miner.ip.clone();
            let uid = miner.uid;
            let challenge = challenge.clone();
            let rpc = self.rpc;
            async move { run_probe(rpc, &ip, uid, &challenge, budget).await }
        });

        let verdicts = join_all(tasks).await;

        for (miner, verdict) in miners.iter_mut().zip(verdicts.iter()) {
            apply_timing_ema(&mut miner.routing_time, verdict.routing_time);
            apply_timing_ema(&mut miner.process_time, verdict.process_time);
            miner.verified = verdict.verified;
            miner.sync = verdict.sync;
            miner.last_reason = verdict.reason.clone();
        }

        verdicts
    }
}

/// `routing_time`/`process_time` EMA update: sentinel `-1.0` means "no
/// prior measurement, store the sample"; otherwise `(previous + sample) /
/// 2.0`.
fn apply_timing_ema(field: &mut f64, sample: f64) {
    *field = if *field == UNMEASURED { sample } else { (*field + sample) / 2.0 };
}

async fn run_probe(
    rpc: &dyn MinerRpcProbe,
    ip: &str,
    uid: u16,
    challenge: &ChallengeTuple,
    budget: Duration,
) -> Verdict {
    match timeout(budget, probe_miner(rpc, ip, challenge)).await {
        Ok(verdict) => Verdict { uid, ..verdict },
        Err(_) => {
            warn!(uid, ip, "probe exceeded its wall-clock budget");
            Verdict {
                uid,
                verified: false,
                sync: false,
                reason: Some(ExecutorReason::TimedOutBudget),
                routing_time: UNMEASURED,
                process_time: UNMEASURED,
            }
        }
    }
}

/// The two-stage probe body, independent of the outer timeout/cancellation
/// and independent across miners — safe to run inside `tokio::time::timeout`.
async fn probe_miner(rpc: &dyn MinerRpcProbe, ip: &str, challenge: &ChallengeTuple) -> Verdict {
    // Stage A — reachability. A failed Stage A is final: Stage B is never
    // attempted, and `process_time` stays at the unmeasured sentinel.
    let (stage_a_ok, mut reason, routing_time) = reachability_probe(ip).await;

    if !stage_a_ok {
        return Verdict {
            uid: 0,
            verified: false,
            sync: false,
            reason,
            routing_time,
            process_time: UNMEASURED,
        };
    }

    // Stage B — RPC replay, only reached once Stage A has passed.
    let stage_b_start = Instant::now();
    let stage_b = rpc
        .neuron_for_uid_lite(ip, challenge.subnet_uid, challenge.neuron_uid, challenge.block_height)
        .await;
    let process_time = stage_b_start.elapsed().as_secs_f64();

    let verified = match stage_b {
        Ok(neuron) => match neuron.property(challenge.property) {
            Some(value) if value == challenge.expected_value => true,
            Some(_) => {
                reason = Some(ExecutorReason::Mismatch);
                false
            }
            None => {
                reason = Some(ExecutorReason::PropertyNotFound);
                false
            }
        },
        Err(e) => {
            reason = Some(e);
            false
        }
    };

    // Sync: the miner's own reported chain tip versus the validator's. Only
    // attempted once Stage B has shown the miner's RPC is reachable at all;
    // any failure to fetch it leaves the miner conservatively out of sync.
    let sync = match rpc.current_block(ip).await {
        Ok(miner_block) => is_in_sync(miner_block, challenge.validator_block),
        Err(_) => false,
    };

    debug!(ip, verified, sync, process_time, "stage B complete");

    Verdict {
        uid: 0,
        verified,
        sync,
        reason: if verified { None } else { reason },
        routing_time,
        process_time,
    }
}

/// `ping -c 1 <ip>`, mapping stderr fragments to typed reasons exactly as
/// the original `challenge_miner` does.
async fn reachability_probe(ip: &str) -> (bool, Option<ExecutorReason>, f64) {
    let start = Instant::now();

    let output = Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg(ip)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let elapsed = start.elapsed().as_secs_f64();

    match output {
        Ok(output) if output.status.success() => (true, None, elapsed),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.contains("Name or service not known") {
                ExecutorReason::HostnameUnresolved
            } else if stderr.contains("Destination Host Unreachable") {
                ExecutorReason::HostUnreachable
            } else if stderr.contains("Request timeout") {
                ExecutorReason::TimedOut
            } else {
                ExecutorReason::UnknownReachability
            };
            (false, Some(reason), elapsed)
        }
        Err(_) => (false, Some(ExecutorReason::UnknownReachability), elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AxonInfo;

    fn tuple() -> ChallengeTuple {
        ChallengeTuple {
            block_height: 100,
            subnet_uid: 0,
            neuron_uid: 5,
            property: crate::chain::NeuronProperty::Rank,
            expected_value: PropertyValue::Number(0.42),
            validator_block: 150,
        }
    }

    struct AlwaysMatch;
    #[async_trait::async_trait]
    impl MinerRpcProbe for AlwaysMatch {
        async fn neuron_for_uid_lite(&self, _ip: &str, _netuid: u16, uid: u16, _block: u64) -> Result<NeuronLite, ExecutorReason> {
            Ok(NeuronLite {
                uid,
                hotkey: "hk".into(),
                coldkey: "ck".into(),
                rank: 0.42,
                emission: 0.0,
                incentive: 0.0,
                consensus: 0.0,
                trust: 0.0,
                last_update: 0,
                axon_info: AxonInfo { ip: "x".into(), port: 9944, is_serving: true },
                stake: None,
                validator_trust: None,
                dividends: None,
            })
        }

        async fn current_block(&self, _ip: &str) -> Result<u64, ExecutorReason> {
            Ok(150)
        }
    }

    struct AlwaysMismatch;
    #[async_trait::async_trait]
    impl MinerRpcProbe for AlwaysMismatch {
        async fn neuron_for_uid_lite(&self, _ip: &str, _netuid: u16, uid: u16, _block: u64) -> Result<NeuronLite, ExecutorReason> {
            Ok(NeuronLite {
                uid,
                hotkey: "hk".into(),
                coldkey: "ck".into(),
                rank: 0.01,
                emission: 0.0,
                incentive: 0.0,
                consensus: 0.0,
                trust: 0.0,
                last_update: 0,
                axon_info: AxonInfo { ip: "x".into(), port: 9944, is_serving: true },
                stake: None,
                validator_trust: None,
                dividends: None,
            })
        }

        async fn current_block(&self, _ip: &str) -> Result<u64, ExecutorReason> {
            Ok(150)
        }
    }

    struct AlwaysConnectFail;
    #[async_trait::async_trait]
    impl MinerRpcProbe for AlwaysConnectFail {
        async fn neuron_for_uid_lite(&self, _ip: &str, _netuid: u16, _uid: u16, _block: u64) -> Result<NeuronLite, ExecutorReason> {
            Err(ExecutorReason::RpcConnectFailed)
        }

        async fn current_block(&self, _ip: &str) -> Result<u64, ExecutorReason> {
            Err(ExecutorReason::RpcConnectFailed)
        }
    }

    #[test]
    fn timing_ema_stores_first_sample_on_sentinel() {
        let mut field = UNMEASURED;
        apply_timing_ema(&mut field, 0.5);
        assert_eq!(field, 0.5);
    }

    #[test]
    fn timing_ema_averages_subsequent_samples() {
        let mut field = 0.4;
        apply_timing_ema(&mut field, 0.6);
        assert_eq!(field, 0.5);
    }

    #[tokio::test]
    async fn probe_match_against_loopback_reachability() {
        let v = probe_miner(&AlwaysMatch, "127.0.0.1", &tuple()).await;
        // Verified only if Stage A (ping to loopback) also succeeds in this
        // sandbox; a failed Stage A still yields a well-formed Verdict.
        if v.verified {
            assert_eq!(v.reason, None);
        }
    }

    #[tokio::test]
    async fn probe_mismatch_is_not_verified() {
        let v = probe_miner(&AlwaysMismatch, "127.0.0.1", &tuple()).await;
        // Stage A against loopback should succeed on most CI sandboxes; if it
        // doesn't, the verdict is still unverified, so either path holds.
        assert!(!v.verified);
    }

    #[tokio::test]
    async fn rpc_connect_failure_is_not_verified() {
        let v = probe_miner(&AlwaysConnectFail, "127.0.0.1", &tuple()).await;
        assert!(!v.verified);
    }

    #[test]
    fn classify_rpc_error_maps_uid_and_block() {
        let uid_err = serde_json::json!({"error": {"message": "invalid uid"}});
        assert_eq!(classify_rpc_error(&uid_err), ExecutorReason::InvalidUidOrNetuid);

        let block_err = serde_json::json!({"error": {"message": "unavailable block"}});
        assert_eq!(classify_rpc_error(&block_err), ExecutorReason::InvalidBlock);

        let other_err = serde_json::json!({"error": {"message": "boom"}});
        assert_eq!(classify_rpc_error(&other_err), ExecutorReason::RetrievalFailed);
    }
}
