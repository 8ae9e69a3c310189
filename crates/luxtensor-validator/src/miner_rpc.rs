use async_trait::async_trait;

use crate::error::ScopeError;
use crate::miner::MinerSnapshot;
use crate::scoring::ScoreBreakdown;

/// Pushes a miner's own `ScoreBreakdown` back to it over its chain RPC
/// endpoint, mirroring `send_scope` from the original round loop. The
/// returned string is the miner's self-reported software version, recorded
/// on `MinerSnapshot::version`. Kept separate from `MinerRpcProbe`: that
/// trait replays a challenge, this one reports the outcome.
#[async_trait]
pub trait MinerRpc: Send + Sync {
    async fn send_scope(
        &self,
        miner: &MinerSnapshot,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ScopeError>;
}

/// Default `MinerRpc`: dials `ws://<ip>:9944` with `tokio-tungstenite`, same
/// as `WsMinerRpcProbe`, and sends a single JSON-RPC request.
pub struct WsMinerRpc;

#[async_trait]
impl MinerRpc for WsMinerRpc {
    async fn send_scope(
        &self,
        miner: &MinerSnapshot,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ScopeError> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let url = format!("ws://{}:9944", miner.ip);
        let (mut ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| ScopeError::Connect(e.to_string()))?;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "subnet_sendScope",
            "params": [miner.uid, breakdown],
        });

        ws.send(Message::Text(request.to_string()))
            .await
            .map_err(|e| ScopeError::Connect(e.to_string()))?;

        let response = ws
            .next()
            .await
            .ok_or_else(|| ScopeError::Connect("connection closed before a response arrived".into()))?
            .map_err(|e| ScopeError::Connect(e.to_string()))?;

        let text = response
            .into_text()
            .map_err(|e| ScopeError::Connect(e.to_string()))?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ScopeError::Rejected(e.to_string()))?;

        if let Some(err) = value.get("error") {
            return Err(ScopeError::Rejected(err.to_string()));
        }

        let result = value
            .get("result")
            .ok_or_else(|| ScopeError::Rejected("missing result field".into()))?;

        serde_json::from_value(result.clone()).map_err(|e| ScopeError::Rejected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::MinerSnapshot;

    fn breakdown(uid: u16) -> ScoreBreakdown {
        ScoreBreakdown {
            uid,
            availability_score: 1.0,
            reliability_score: 1.0,
            latency_score: 1.0,
            performance_score: 1.0,
            distribution_score: 1.0,
            composite_pre_suspicion: 1.0,
            score: 1.0,
        }
    }

    struct AlwaysVersion(&'static str);

    #[async_trait]
    impl MinerRpc for AlwaysVersion {
        async fn send_scope(
            &self,
            _miner: &MinerSnapshot,
            _breakdown: &ScoreBreakdown,
        ) -> Result<String, ScopeError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn records_the_version_a_miner_reports() {
        let miner = MinerSnapshot::new(1, "hk".into(), "10.0.0.1".into(), "FR".into(), "Western Europe".into(), 0, 0);
        let rpc = AlwaysVersion("1.2.3");

        let version = rpc.send_scope(&miner, &breakdown(1)).await.expect("send_scope");
        assert_eq!(version, "1.2.3");
    }
}
