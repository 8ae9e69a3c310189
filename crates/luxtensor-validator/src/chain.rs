use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ChallengeError;

/// Axon (serving endpoint) details reported on-chain for a neuron.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxonInfo {
    pub ip: String,
    pub port: u16,
    pub is_serving: bool,
}

/// Minimal view of a chain-registered neuron, as returned by
/// `neurons_lite`/`neuron_for_uid_lite`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeuronLite {
    pub uid: u16,
    pub hotkey: String,
    pub coldkey: String,
    pub rank: f64,
    pub emission: f64,
    pub incentive: f64,
    pub consensus: f64,
    pub trust: f64,
    pub last_update: u64,
    pub axon_info: AxonInfo,

    /// Present only for validator-mode neurons (`axon_info.is_serving ==
    /// false`); `None` on a miner-mode neuron.
    pub stake: Option<u128>,
    pub validator_trust: Option<f64>,
    pub dividends: Option<f64>,
}

/// Ordered property list used when the selected neuron is serving (a
/// miner).
pub const MINER_PROPERTIES: [NeuronProperty; 9] = [
    NeuronProperty::Hotkey,
    NeuronProperty::Coldkey,
    NeuronProperty::Rank,
    NeuronProperty::Emission,
    NeuronProperty::Incentive,
    NeuronProperty::Consensus,
    NeuronProperty::Trust,
    NeuronProperty::LastUpdate,
    NeuronProperty::AxonInfo,
];

/// Ordered property list used when the selected neuron is a validator.
pub const VALIDATOR_PROPERTIES: [NeuronProperty; 9] = [
    NeuronProperty::Hotkey,
    NeuronProperty::Coldkey,
    NeuronProperty::Stake,
    NeuronProperty::Rank,
    NeuronProperty::Emission,
    NeuronProperty::ValidatorTrust,
    NeuronProperty::Dividends,
    NeuronProperty::LastUpdate,
    NeuronProperty::AxonInfo,
];

/// Typed accessor over the union of `MINER_PROPERTIES` and
/// `VALIDATOR_PROPERTIES`, replacing a dynamic attribute-name lookup with a
/// closed enum so an unknown property is a compile error, not a runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronProperty {
    Hotkey,
    Coldkey,
    Rank,
    Emission,
    Incentive,
    Consensus,
    Trust,
    LastUpdate,
    AxonInfo,
    Stake,
    ValidatorTrust,
    Dividends,
}

/// A value-typed property read, compared for equality rather than by
/// string representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Integer(u128),
    Timestamp(u64),
    Axon(AxonInfo),
}

impl NeuronLite {
    /// Total accessor: `None` only for the validator-only properties read
    /// off a miner-mode neuron (statically unreachable from
    /// `ChallengeGenerator`, which always pairs the property list with the
    /// neuron's own serving state, but kept total for the executor's
    /// independent remote lookup).
    pub fn property(&self, p: NeuronProperty) -> Option<PropertyValue> {
        use NeuronProperty::*;
        Some(match p {
            Hotkey => PropertyValue::Text(self.hotkey.clone()),
            Coldkey => PropertyValue::Text(self.coldkey.clone()),
            Rank => PropertyValue::Number(self.rank),
            Emission => PropertyValue::Number(self.emission),
            Incentive => PropertyValue::Number(self.incentive),
            Consensus => PropertyValue::Number(self.consensus),
            Trust => PropertyValue::Number(self.trust),
            LastUpdate => PropertyValue::Timestamp(self.last_update),
            AxonInfo => PropertyValue::Axon(self.axon_info.clone()),
            Stake => PropertyValue::Integer(self.stake?),
            ValidatorTrust => PropertyValue::Number(self.validator_trust?),
            Dividends => PropertyValue::Number(self.dividends?),
        })
    }
}

/// Narrow, read-only window into the chain the validator already trusts.
/// How block finality or RPC transport are implemented is out of scope here;
/// this is the consuming interface only.
#[async_trait]
pub trait ChainProbe: Send + Sync {
    async fn current_block(&self) -> Result<u64, ChallengeError>;
    async fn subnets(&self, at_block: u64) -> Result<Vec<u16>, ChallengeError>;
    async fn neurons_lite(
        &self,
        netuid: u16,
        at_block: u64,
    ) -> Result<Vec<NeuronLite>, ChallengeError>;
    async fn neuron_for_uid_lite(
        &self,
        netuid: u16,
        uid: u16,
        at_block: u64,
    ) -> Result<NeuronLite, ChallengeError>;
}

/// JSON-RPC client over the node's HTTP RPC endpoint (the LuxTensor analogue
/// of `bt.subtensor`'s query surface). Method names are placeholders for
/// whatever the node's `luxtensor-rpc` `subnet_rpc`/`query_rpc` modules
/// expose; only the request/response envelope is the core's concern.
pub struct HttpChainProbe {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChainProbe {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, ChallengeError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChallengeError::ChainProbe(e.to_string()))?;

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChallengeError::ChainProbe(e.to_string()))?;

        if let Some(err) = value.get("error") {
            return Err(ChallengeError::ChainProbe(err.to_string()));
        }

        value
            .get("result")
            .cloned()
            .ok_or_else(|| ChallengeError::ChainProbe("missing result field".into()))
    }
}

#[async_trait]
impl ChainProbe for HttpChainProbe {
    async fn current_block(&self) -> Result<u64, ChallengeError> {
        let result = self
            .call("chain_getCurrentBlock", json!([]))
            .await
            .map_err(|e| ChallengeError::CurrentBlock(e.to_string()))?;
        serde_json::from_value(result).map_err(|e| ChallengeError::CurrentBlock(e.to_string()))
    }

    async fn subnets(&self, at_block: u64) -> Result<Vec<u16>, ChallengeError> {
        let result = self.call("subnet_list", json!([at_block])).await?;
        serde_json::from_value(result).map_err(|e| ChallengeError::ChainProbe(e.to_string()))
    }

    async fn neurons_lite(
        &self,
        netuid: u16,
        at_block: u64,
    ) -> Result<Vec<NeuronLite>, ChallengeError> {
        let result = self
            .call("subnet_neuronsLite", json!([netuid, at_block]))
            .await?;
        serde_json::from_value(result).map_err(|e| ChallengeError::ChainProbe(e.to_string()))
    }

    async fn neuron_for_uid_lite(
        &self,
        netuid: u16,
        uid: u16,
        at_block: u64,
    ) -> Result<NeuronLite, ChallengeError> {
        let result = self
            .call("subnet_neuronForUidLite", json!([netuid, uid, at_block]))
            .await?;
        serde_json::from_value(result).map_err(|e| ChallengeError::ChainProbe(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner_neuron() -> NeuronLite {
        NeuronLite {
            uid: 7,
            hotkey: "hk".into(),
            coldkey: "ck".into(),
            rank: 0.1,
            emission: 0.2,
            incentive: 0.3,
            consensus: 0.4,
            trust: 0.5,
            last_update: 100,
            axon_info: AxonInfo { ip: "1.2.3.4".into(), port: 9944, is_serving: true },
            stake: None,
            validator_trust: None,
            dividends: None,
        }
    }

    #[test]
    fn miner_property_accessor_is_total_for_miner_properties() {
        let n = miner_neuron();
        for p in MINER_PROPERTIES {
            assert!(n.property(p).is_some());
        }
    }

    #[test]
    fn validator_only_property_on_miner_neuron_is_none() {
        let n = miner_neuron();
        assert!(n.property(NeuronProperty::Stake).is_none());
    }

    #[test]
    fn property_value_equality_is_value_typed() {
        let n = miner_neuron();
        assert_eq!(n.property(NeuronProperty::Rank), Some(PropertyValue::Number(0.1)));
        assert_ne!(n.property(NeuronProperty::Rank), Some(PropertyValue::Number(0.2)));
    }
}
