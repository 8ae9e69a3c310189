use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::chain::ChainProbe;
use crate::challenge::ChallengeGenerator;
use crate::config::ValidatorConfig;
use crate::error::{RoundError, SubmissionError};
use crate::executor::{ChallengeExecutor, MinerRpcProbe};
use crate::geolocator::Geolocator;
use crate::miner::{annotate_ip_conflicts, MinerSnapshot};
use crate::miner_rpc::MinerRpc;
use crate::scoring::ScoringEngine;
use crate::selector::MinerSelector;
use crate::smoother::RewardSmoother;
use crate::stats_store::StatsStore;
use crate::suspicion::{is_miner_suspicious, SuspicionSource};

/// Pushes the final moving-average vector on-chain. Failures here do not
/// roll back the in-memory state; the next round retries with fresh values.
#[async_trait]
pub trait WeightSubmitter: Send + Sync {
    async fn submit(&self, weights: &[f64]) -> Result<(), SubmissionError>;
}

/// Default `WeightSubmitter`: posts the moving average vector to the chain
/// node's RPC endpoint as a single `subnet_setWeights` call.
pub struct HttpWeightSubmitter {
    client: reqwest::Client,
    endpoint: String,
    netuid: u16,
}

impl HttpWeightSubmitter {
    pub fn new(endpoint: impl Into<String>, netuid: u16) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), netuid }
    }
}

#[async_trait]
impl WeightSubmitter for HttpWeightSubmitter {
    async fn submit(&self, weights: &[f64]) -> Result<(), SubmissionError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "subnet_setWeights",
            "params": [self.netuid, weights],
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmissionError::Submit(e.to_string()))?;

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SubmissionError::Submit(e.to_string()))?;

        if let Some(err) = value.get("error") {
            return Err(SubmissionError::Submit(err.to_string()));
        }
        Ok(())
    }
}

/// How a single round concluded.
#[derive(Debug)]
pub enum RoundOutcome {
    /// Ran to completion; carries the uids scored and the elapsed time.
    Completed { scored_uids: Vec<u16>, elapsed_secs: f64 },
    /// Generate returned no challenge; nothing else in the round ran.
    Skipped,
    /// Prepare/Generate/Select failed outright; the round never executed.
    Aborted(RoundError),
}

/// Drives one full round: Prepare, Generate, Select, Execute, Score,
/// Smooth, Log. Steps 1-3 abort the round on error; steps 4-5 degrade only
/// the affected miner, never the round as a whole.
pub struct RoundOrchestrator<'a> {
    config: &'a ValidatorConfig,
    chain: &'a dyn ChainProbe,
    rpc: &'a dyn MinerRpcProbe,
    miner_rpc: &'a dyn MinerRpc,
    geolocator: &'a dyn Geolocator,
    selector: &'a dyn MinerSelector,
    suspicion: &'a dyn SuspicionSource,
    stats_store: &'a dyn StatsStore,
    smoother: &'a RewardSmoother,
    submitter: &'a dyn WeightSubmitter,
}

impl<'a> RoundOrchestrator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a ValidatorConfig,
        chain: &'a dyn ChainProbe,
        rpc: &'a dyn MinerRpcProbe,
        miner_rpc: &'a dyn MinerRpc,
        geolocator: &'a dyn Geolocator,
        selector: &'a dyn MinerSelector,
        suspicion: &'a dyn SuspicionSource,
        stats_store: &'a dyn StatsStore,
        smoother: &'a RewardSmoother,
        submitter: &'a dyn WeightSubmitter,
    ) -> Self {
        Self {
            config,
            chain,
            rpc,
            miner_rpc,
            geolocator,
            selector,
            suspicion,
            stats_store,
            smoother,
            submitter,
        }
    }

    pub async fn run_round(&self) -> RoundOutcome {
        let start = Instant::now();

        let mut miners = match self.prepare().await {
            Ok(miners) => miners,
            Err(e) => return RoundOutcome::Aborted(e),
        };

        let generator = ChallengeGenerator::new(self.chain);
        let challenge = match generator.generate().await {
            Some(tuple) => tuple,
            None => return RoundOutcome::Skipped,
        };

        let selected = self.selector.select(miners.clone(), self.config.sample_size);
        if selected.is_empty() {
            return RoundOutcome::Aborted(RoundError::Selection("selector returned no miners".into()));
        }
        let selected_uids: HashSet<u16> = selected.iter().map(|m| m.uid).collect();
        miners.retain(|m| selected_uids.contains(&m.uid));
        annotate_ip_conflicts(&mut miners);

        let executor = ChallengeExecutor::new(self.config, self.rpc);
        executor.execute(&mut miners, &challenge).await;

        let flagged = self.suspicion.suspicious_uids();
        for miner in miners.iter_mut() {
            let (suspicious, penalty_factor) = is_miner_suspicious(miner, &flagged);
            miner.suspicious = suspicious;
            miner.penalty_factor = penalty_factor;
        }

        let scoring = ScoringEngine::new(self.config);
        let breakdowns = scoring.score_round(&mut miners);

        for (miner, breakdown) in miners.iter_mut().zip(breakdowns.iter()) {
            match self.miner_rpc.send_scope(miner, breakdown).await {
                Ok(version) => miner.version = Some(version),
                Err(e) => warn!(uid = miner.uid, error = %e, "failed to push score to miner"),
            }
        }

        for miner in miners.iter() {
            if let Err(e) = self
                .stats_store
                .save_stats(
                    miner.uid,
                    crate::stats_store::MinerStats {
                        challenge_attempts: miner.challenge_attempts,
                        challenge_successes: miner.challenge_successes,
                        version: miner.version.clone(),
                        last_round: 0,
                    },
                )
                .await
            {
                warn!(uid = miner.uid, error = %e, "failed to persist miner stats");
            }
        }

        let pairs: Vec<(u16, f64)> = breakdowns.iter().map(|b| (b.uid, b.score)).collect();
        self.smoother.update(&pairs);
        let suspicious_uids: Vec<u16> = miners.iter().filter(|m| m.suspicious).map(|m| m.uid).collect();
        self.smoother.zero_suspicious(&suspicious_uids);

        let weights = self.smoother.snapshot();
        if let Err(e) = self.submitter.submit(&weights).await {
            warn!(error = %e, "weight submission failed, retrying next round");
        }
        if let Err(e) = self.stats_store.save_moving_average(&weights).await {
            warn!(error = %e, "failed to checkpoint moving average vector");
        }

        let elapsed_secs = start.elapsed().as_secs_f64();
        let scored_uids: Vec<u16> = miners.iter().map(|m| m.uid).collect();

        info!(
            block = challenge.block_height,
            subnet = challenge.subnet_uid,
            neuron = challenge.neuron_uid,
            scored = scored_uids.len(),
            elapsed_secs,
            "round complete"
        );

        RoundOutcome::Completed { scored_uids, elapsed_secs }
    }

    async fn prepare(&self) -> Result<Vec<MinerSnapshot>, RoundError> {
        let current_block = self
            .chain
            .current_block()
            .await
            .map_err(|e| RoundError::MetagraphRefresh(e.to_string()))?;

        let subnets = self
            .chain
            .subnets(current_block)
            .await
            .map_err(|e| RoundError::MetagraphRefresh(e.to_string()))?;

        let mut miners = Vec::new();
        for netuid in subnets {
            let neurons = self
                .chain
                .neurons_lite(netuid, current_block)
                .await
                .map_err(|e| RoundError::MetagraphRefresh(e.to_string()))?;

            for neuron in neurons {
                if !neuron.axon_info.is_serving {
                    continue;
                }
                let (subregion, country) = self.geolocator.lookup(&neuron.axon_info.ip);
                let stats = self
                    .stats_store
                    .load_stats(neuron.uid)
                    .await
                    .unwrap_or_default();

                miners.push(MinerSnapshot::new(
                    neuron.uid,
                    neuron.hotkey,
                    neuron.axon_info.ip,
                    country,
                    subregion,
                    stats.challenge_attempts,
                    stats.challenge_successes,
                ));
            }
        }

        annotate_ip_conflicts(&mut miners);
        Ok(miners)
    }
}
