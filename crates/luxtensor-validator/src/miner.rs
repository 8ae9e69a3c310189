use serde::{Deserialize, Serialize};

use crate::error::ExecutorReason;

/// Sentinel for "never measured" on `routing_time`/`process_time`.
pub const UNMEASURED: f64 = -1.0;

/// Round-local snapshot of one miner under evaluation.
///
/// Created fresh at the start of a round from the metagraph plus the
/// persisted cumulative counters, mutated by the executor and scoring
/// engine, and never outlives the round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerSnapshot {
    pub uid: u16,
    pub hotkey: String,
    pub ip: String,
    pub country: String,
    pub subregion: String,

    pub verified: bool,
    pub sync: bool,
    pub routing_time: f64,
    pub process_time: f64,
    pub has_ip_conflicts: bool,
    pub ip_occurrences: u32,

    pub challenge_attempts: u64,
    pub challenge_successes: u64,

    pub availability_score: f64,
    pub reliability_score: f64,
    pub latency_score: f64,
    pub performance_score: f64,
    pub distribution_score: f64,
    pub score: f64,

    pub suspicious: bool,
    pub penalty_factor: Option<f64>,
    pub version: Option<String>,

    pub last_reason: Option<ExecutorReason>,
}

impl MinerSnapshot {
    /// Build a fresh round snapshot for `uid` from metagraph identity fields
    /// plus whatever the statistics store has on file for it.
    pub fn new(
        uid: u16,
        hotkey: String,
        ip: String,
        country: String,
        subregion: String,
        challenge_attempts: u64,
        challenge_successes: u64,
    ) -> Self {
        Self {
            uid,
            hotkey,
            ip,
            country,
            subregion,
            verified: false,
            sync: false,
            routing_time: UNMEASURED,
            process_time: UNMEASURED,
            has_ip_conflicts: false,
            ip_occurrences: 0,
            challenge_attempts,
            challenge_successes,
            availability_score: 0.0,
            reliability_score: 0.0,
            latency_score: 0.0,
            performance_score: 0.0,
            distribution_score: 0.0,
            score: 0.0,
            suspicious: false,
            penalty_factor: None,
            version: None,
            last_reason: None,
        }
    }

    /// True iff this miner counts toward the cross-miner aggregates used by
    /// latency/reliability/distribution — verified and not sharing its IP.
    pub fn is_conform(&self) -> bool {
        self.verified && !self.has_ip_conflicts
    }
}

/// Fills in `has_ip_conflicts`/`ip_occurrences` for every miner in the round,
/// computed once from the round's own snapshot population.
pub fn annotate_ip_conflicts(miners: &mut [MinerSnapshot]) {
    use std::collections::HashMap;

    let mut counts: HashMap<String, u32> = HashMap::new();
    for m in miners.iter() {
        *counts.entry(m.ip.clone()).or_insert(0) += 1;
    }
    for m in miners.iter_mut() {
        let occurrences = counts.get(&m.ip).copied().unwrap_or(0);
        m.ip_occurrences = occurrences;
        m.has_ip_conflicts = occurrences > 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(uid: u16, ip: &str) -> MinerSnapshot {
        MinerSnapshot::new(uid, format!("hk{uid}"), ip.into(), "FR".into(), "Western Europe".into(), 0, 0)
    }

    #[test]
    fn ip_conflict_detection() {
        let mut miners = vec![base(1, "1.2.3.4"), base(2, "1.2.3.4"), base(3, "5.6.7.8")];
        annotate_ip_conflicts(&mut miners);

        assert!(miners[0].has_ip_conflicts);
        assert!(miners[1].has_ip_conflicts);
        assert!(!miners[2].has_ip_conflicts);
        assert_eq!(miners[0].ip_occurrences, 2);
        assert_eq!(miners[2].ip_occurrences, 1);
    }

    #[test]
    fn fresh_snapshot_has_sentinel_timings() {
        let m = base(1, "1.2.3.4");
        assert_eq!(m.routing_time, UNMEASURED);
        assert_eq!(m.process_time, UNMEASURED);
        assert!(!m.is_conform());
    }
}
