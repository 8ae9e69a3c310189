use std::collections::HashSet;

use crate::miner::MinerSnapshot;

/// Source of externally-flagged miner uids (e.g. a moderation feed, a
/// deregistration list pulled from governance). The round orchestrator
/// consults this once per round, after scoring, to decide which uids get
/// zeroed out of the moving average.
pub trait SuspicionSource: Send + Sync {
    fn suspicious_uids(&self) -> HashSet<u16>;
}

/// Pure policy: given a miner and the round's suspicious-uid set, decide
/// whether it is suspicious and, if so, what penalty factor applies to its
/// composite score. A flagged miner that is also a repeat IP-conflict
/// offender gets the harsher penalty.
pub fn is_miner_suspicious(miner: &MinerSnapshot, flagged: &HashSet<u16>) -> (bool, Option<f64>) {
    if !flagged.contains(&miner.uid) {
        return (false, None);
    }

    if miner.has_ip_conflicts {
        (true, Some(0.0))
    } else {
        (true, Some(0.5))
    }
}

/// Fixed, pre-populated suspicion list — a minimal default so the crate
/// runs standalone without an external feed wired in.
pub struct StaticSuspicionSource {
    flagged: HashSet<u16>,
}

impl StaticSuspicionSource {
    pub fn new(flagged: HashSet<u16>) -> Self {
        Self { flagged }
    }
}

impl SuspicionSource for StaticSuspicionSource {
    fn suspicious_uids(&self) -> HashSet<u16> {
        self.flagged.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner(uid: u16) -> MinerSnapshot {
        MinerSnapshot::new(uid, format!("hk{uid}"), "1.2.3.4".into(), "FR".into(), "Western Europe".into(), 0, 0)
    }

    #[test]
    fn unflagged_miner_is_never_suspicious() {
        let flagged = HashSet::new();
        assert_eq!(is_miner_suspicious(&miner(1), &flagged), (false, None));
    }

    #[test]
    fn flagged_miner_without_ip_conflicts_gets_the_lighter_penalty() {
        let mut flagged = HashSet::new();
        flagged.insert(1);
        assert_eq!(is_miner_suspicious(&miner(1), &flagged), (true, Some(0.5)));
    }

    #[test]
    fn flagged_miner_with_ip_conflicts_gets_zeroed_out() {
        let mut flagged = HashSet::new();
        flagged.insert(1);
        let mut m = miner(1);
        m.has_ip_conflicts = true;
        assert_eq!(is_miner_suspicious(&m, &flagged), (true, Some(0.0)));
    }

    #[test]
    fn static_source_returns_its_configured_set() {
        let mut flagged = HashSet::new();
        flagged.insert(3);
        flagged.insert(7);
        let source = StaticSuspicionSource::new(flagged.clone());
        assert_eq!(source.suspicious_uids(), flagged);
    }
}
