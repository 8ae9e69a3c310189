use rand::seq::SliceRandom;

use crate::miner::MinerSnapshot;

/// Picks which uids a round actually probes out of the full metagraph
/// population. A default, stake-weighted implementation is provided, but
/// deployments may swap in their own policy (e.g. round-robin coverage).
pub trait MinerSelector: Send + Sync {
    fn select(&self, candidates: Vec<MinerSnapshot>, sample_size: usize) -> Vec<MinerSnapshot>;
}

/// Samples `sample_size` miners without replacement, favoring higher stake.
/// Ties and the no-stake-information case degrade to a uniform shuffle.
pub struct StakeWeightedSelector {
    stakes: std::collections::HashMap<u16, u128>,
}

impl StakeWeightedSelector {
    pub fn new(stakes: std::collections::HashMap<u16, u128>) -> Self {
        Self { stakes }
    }

    fn stake_of(&self, uid: u16) -> u128 {
        self.stakes.get(&uid).copied().unwrap_or(0)
    }
}

impl MinerSelector for StakeWeightedSelector {
    fn select(&self, mut candidates: Vec<MinerSnapshot>, sample_size: usize) -> Vec<MinerSnapshot> {
        if candidates.len() <= sample_size {
            return candidates;
        }

        let total_stake: u128 = candidates.iter().map(|m| self.stake_of(m.uid)).sum();
        if total_stake == 0 {
            let mut rng = rand::thread_rng();
            candidates.shuffle(&mut rng);
            candidates.truncate(sample_size);
            return candidates;
        }

        candidates.sort_by(|a, b| self.stake_of(b.uid).cmp(&self.stake_of(a.uid)));
        candidates.truncate(sample_size);
        candidates
    }
}
