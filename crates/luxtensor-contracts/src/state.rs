use crate::types::ContractAddress;
use luxtensor_core::types::Hash;
use std::collections::HashMap;

/// Contract state storage
#[derive(Debug, Clone)]
pub struct ContractState {
    /// Storage mapping: contract -> key -> value
    storage: HashMap<ContractAddress, HashMap<Hash, Hash>>,
}

impl ContractState {
    /// Create a new contract state
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Get a storage value
    pub fn get_storage(&self, contract: &ContractAddress, key: &Hash) -> Option<Hash> {
        self.storage
            .get(contract)
            .and_then(|contract_storage| contract_storage.get(key))
            .copied()
    }

    /// Set a storage value
    pub fn set_storage(&mut self, contract: &ContractAddress, key: Hash, value: Hash) {
        self.storage
            .entry(*contract)
            .or_insert_with(HashMap::new)
            .insert(key, value);
    }

    /// Clear all storage for a contract
    pub fn clear_contract_storage(&mut self, contract: &ContractAddress) {
        self.storage.remove(contract);
    }

    /// Get all storage for a contract
    pub fn get_contract_storage(&self, contract: &ContractAddress) -> Option<&HashMap<Hash, Hash>> {
        self.storage.get(contract)
    }

    /// Get total number of storage entries
    pub fn storage_size(&self) -> usize {
        self.storage.values().map(|s| s.len()).sum()
    }
}

impl Default for ContractState {
    fn default() -> Self {
        Self::new()
    }
}
