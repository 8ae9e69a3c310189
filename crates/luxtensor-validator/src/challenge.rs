use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::{ChainProbe, NeuronProperty, PropertyValue, MINER_PROPERTIES, VALIDATOR_PROPERTIES};
use crate::error::ChallengeError;

/// Width of the recent-finalized window a challenge block is drawn from.
pub const CHALLENGE_HISTORY_WINDOW: u64 = 256;

/// Immutable per-round challenge: a reproducible (block, subnet, neuron,
/// property, expected-value) tuple over the validator's own trusted chain
/// view. Never consults any miner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeTuple {
    pub block_height: u64,
    pub subnet_uid: u16,
    pub neuron_uid: u16,
    pub property: NeuronProperty,
    pub expected_value: PropertyValue,
    /// The validator's own current block at generation time, carried along so
    /// the executor can measure each miner's sync without a second chain
    /// round-trip. Distinct from `block_height`, the historical block the
    /// challenge itself is drawn against.
    pub validator_block: u64,
}

/// Produces a reproducible challenge tuple from a `ChainProbe`, or `None`
/// (Skip) on any chain error — the round is then abandoned since an
/// undefined expected value makes verdicts meaningless.
pub struct ChallengeGenerator<'a> {
    chain: &'a dyn ChainProbe,
}

impl<'a> ChallengeGenerator<'a> {
    pub fn new(chain: &'a dyn ChainProbe) -> Self {
        Self { chain }
    }

    pub async fn generate(&self) -> Option<ChallengeTuple> {
        match self.try_generate().await {
            Ok(tuple) => Some(tuple),
            Err(err) => {
                warn!(error = %err, "failed to create challenge, skipping round");
                None
            }
        }
    }

    async fn try_generate(&self) -> Result<ChallengeTuple, ChallengeError> {
        let current = self
            .chain
            .current_block()
            .await
            .map_err(|e| ChallengeError::CurrentBlock(e.to_string()))?;

        let mut rng = rand::thread_rng();
        let low = current.saturating_sub(CHALLENGE_HISTORY_WINDOW);
        let block = rng.gen_range(low..=current);

        let subnets = self.chain.subnets(block).await?;
        let max_subnet = subnets
            .iter()
            .copied()
            .max()
            .ok_or(ChallengeError::NoSubnets(block))?;
        let subnet_uid = rng.gen_range(0..=max_subnet);

        let neurons = self.chain.neurons_lite(subnet_uid, block).await?;
        if neurons.is_empty() {
            return Err(ChallengeError::NoNeurons { netuid: subnet_uid, block });
        }
        let neuron = &neurons[rng.gen_range(0..neurons.len())];

        let properties: &[NeuronProperty] = if neuron.axon_info.is_serving {
            &MINER_PROPERTIES
        } else {
            &VALIDATOR_PROPERTIES
        };
        let property = properties[rng.gen_range(0..properties.len())];

        let expected_value = neuron
            .property(property)
            .ok_or_else(|| ChallengeError::ChainProbe("property unavailable on selected neuron".into()))?;

        Ok(ChallengeTuple {
            block_height: block,
            subnet_uid,
            neuron_uid: neuron.uid,
            property,
            expected_value,
            validator_block: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::AxonInfo;
    use crate::chain::NeuronLite;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeChain {
        current: u64,
        fail_at: Option<&'static str>,
        calls: AtomicU64,
    }

    fn serving_neuron(uid: u16) -> NeuronLite {
        NeuronLite {
            uid,
            hotkey: format!("hk{uid}"),
            coldkey: format!("ck{uid}"),
            rank: 1.0,
            emission: 2.0,
            incentive: 3.0,
            consensus: 4.0,
            trust: 5.0,
            last_update: 42,
            axon_info: AxonInfo { ip: "10.0.0.1".into(), port: 9944, is_serving: true },
            stake: None,
            validator_trust: None,
            dividends: None,
        }
    }

    #[async_trait]
    impl ChainProbe for FakeChain {
        async fn current_block(&self) -> Result<u64, ChallengeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some("current_block") {
                return Err(ChallengeError::CurrentBlock("boom".into()));
            }
            Ok(self.current)
        }

        async fn subnets(&self, _at_block: u64) -> Result<Vec<u16>, ChallengeError> {
            if self.fail_at == Some("subnets") {
                return Err(ChallengeError::ChainProbe("boom".into()));
            }
            Ok(vec![0, 1, 2])
        }

        async fn neurons_lite(&self, _netuid: u16, _at_block: u64) -> Result<Vec<NeuronLite>, ChallengeError> {
            if self.fail_at == Some("neurons") {
                return Ok(vec![]);
            }
            Ok(vec![serving_neuron(5)])
        }

        async fn neuron_for_uid_lite(
            &self,
            _netuid: u16,
            uid: u16,
            _at_block: u64,
        ) -> Result<NeuronLite, ChallengeError> {
            Ok(serving_neuron(uid))
        }
    }

    #[tokio::test]
    async fn generates_a_valid_tuple_within_the_history_window() {
        let chain = FakeChain { current: 1000, fail_at: None, calls: AtomicU64::new(0) };
        let gen = ChallengeGenerator::new(&chain);

        let tuple = gen.generate().await.expect("should generate");
        assert!(tuple.block_height <= 1000);
        assert!(tuple.block_height >= 1000 - CHALLENGE_HISTORY_WINDOW);
        assert!(tuple.subnet_uid <= 2);
        assert_eq!(tuple.neuron_uid, 5);
    }

    #[tokio::test]
    async fn chain_error_yields_skip() {
        let chain = FakeChain { current: 1000, fail_at: Some("current_block"), calls: AtomicU64::new(0) };
        let gen = ChallengeGenerator::new(&chain);

        assert!(gen.generate().await.is_none());
    }

    #[tokio::test]
    async fn empty_neuron_set_yields_skip() {
        let chain = FakeChain { current: 1000, fail_at: Some("neurons"), calls: AtomicU64::new(0) };
        let gen = ChallengeGenerator::new(&chain);

        assert!(gen.generate().await.is_none());
    }

    #[tokio::test]
    async fn early_chain_yields_current_block_when_window_exceeds_height() {
        let chain = FakeChain { current: 10, fail_at: None, calls: AtomicU64::new(0) };
        let gen = ChallengeGenerator::new(&chain);

        let tuple = gen.generate().await.expect("should generate");
        assert!(tuple.block_height <= 10);
    }
}
