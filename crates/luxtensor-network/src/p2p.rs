use crate::error::NetworkError;
use crate::messages::NetworkMessage;
use crate::peer::PeerManager;
use libp2p::{Multiaddr, PeerId};
use luxtensor_core::block::Block;
use luxtensor_core::transaction::Transaction;
use luxtensor_core::types::Hash;
use tokio::sync::mpsc;
use tracing::info;

/// P2P network configuration
#[derive(Debug, Clone)]
pub struct P2PConfig {
    /// Listen address
    pub listen_addr: Multiaddr,

    /// Maximum number of peers
    pub max_peers: usize,

    /// Genesis hash for compatibility check
    pub genesis_hash: Hash,

    /// Enable mDNS discovery
    pub enable_mdns: bool,
}

impl Default for P2PConfig {
    fn default() -> Self {
        Self {
            listen_addr: "/ip4/0.0.0.0/tcp/30303".parse().unwrap(),
            max_peers: 50,
            genesis_hash: [0u8; 32],
            enable_mdns: true,
        }
    }
}

/// Combined behaviour for the network (placeholder for full implementation)
pub struct CombinedBehaviour {
    _placeholder: (),
}

/// Event from the P2P network
#[derive(Debug)]
pub enum P2PEvent {
    /// New transaction received
    NewTransaction(Transaction),

    /// New block received
    NewBlock(Block),

    /// Message received from peer
    Message {
        peer_id: PeerId,
        message: NetworkMessage,
    },

    /// Peer connected
    PeerConnected(PeerId),

    /// Peer disconnected
    PeerDisconnected(PeerId),
}

/// P2P node for blockchain networking (simplified without NetworkBehaviour derive for now)
pub struct P2PNode {
    peer_manager: PeerManager,
    _config: P2PConfig,
    _event_sender: mpsc::UnboundedSender<P2PEvent>,
    local_peer_id: PeerId,
}

impl P2PNode {
    /// Create a new P2P node
    pub async fn new(
        config: P2PConfig,
        event_sender: mpsc::UnboundedSender<P2PEvent>,
    ) -> Result<Self, NetworkError> {
        // Generate a peer ID
        let local_peer_id = PeerId::random();

        info!("Local peer ID: {}", local_peer_id);

        let peer_manager = PeerManager::new(config.max_peers);

        Ok(Self {
            peer_manager,
            _config: config,
            _event_sender: event_sender,
            local_peer_id,
        })
    }

    /// Broadcast a transaction (stub for now)
    pub fn broadcast_transaction(&mut self, _tx: Transaction) -> Result<(), NetworkError> {
        // In a full implementation, this would serialize and publish to gossipsub
        Ok(())
    }

    /// Broadcast a block (stub for now)
    pub fn broadcast_block(&mut self, _block: Block) -> Result<(), NetworkError> {
        // In a full implementation, this would serialize and publish to gossipsub
        Ok(())
    }

    /// Get peer manager
    pub fn peer_manager(&self) -> &PeerManager {
        &self.peer_manager
    }

    /// Get local peer ID
    pub fn local_peer_id(&self) -> &PeerId {
        &self.local_peer_id
    }

    /// Get peer count
    pub fn peer_count(&self) -> usize {
        self.peer_manager.peer_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_p2p_node_creation() {
        let config = P2PConfig::default();
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = P2PNode::new(config, tx).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_p2p_config_default() {
        let config = P2PConfig::default();
        assert_eq!(config.max_peers, 50);
        assert!(config.enable_mdns);
    }
}
