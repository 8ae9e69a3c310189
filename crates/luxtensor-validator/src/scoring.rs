use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ValidatorConfig;
use crate::miner::MinerSnapshot;

/// 95% confidence z-score used by the reliability sub-score's Wilson bound.
const WILSON_Z_95: f64 = 1.959_963_984_540_054;

/// Every sub-score plus the composite, in the shape pushed to a miner via
/// `MinerRpc::send_scope` and written to the round-event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub uid: u16,
    pub availability_score: f64,
    pub reliability_score: f64,
    pub latency_score: f64,
    pub performance_score: f64,
    pub distribution_score: f64,
    pub composite_pre_suspicion: f64,
    pub score: f64,
}

/// Computes the five sub-scores and the weighted composite for every miner
/// in the round's population. Must run after the executor barrier so the
/// cross-miner aggregates (min/max, country counts) are fixed.
pub struct ScoringEngine<'a> {
    config: &'a ValidatorConfig,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(config: &'a ValidatorConfig) -> Self {
        Self { config }
    }

    /// Scores every miner in `miners` against the full population. Mutates
    /// each `MinerSnapshot`'s derived score fields and increments its
    /// cumulative reliability counters in place.
    pub fn score_round(&self, miners: &mut [MinerSnapshot]) -> Vec<ScoreBreakdown> {
        let snapshot = miners.to_vec();
        let mut breakdowns = Vec::with_capacity(miners.len());

        for miner in miners.iter_mut() {
            let availability_score = self.availability(miner);
            let reliability_score = self.reliability(miner);
            let latency_score = self.latency(miner, &snapshot);
            let performance_score = self.performance(miner, &snapshot);
            let distribution_score = self.distribution(miner, &snapshot);

            miner.availability_score = availability_score;
            miner.reliability_score = reliability_score;
            miner.latency_score = latency_score;
            miner.performance_score = performance_score;
            miner.distribution_score = distribution_score;

            let composite_pre_suspicion = self.composite(
                miner,
                availability_score,
                latency_score,
                performance_score,
                reliability_score,
                distribution_score,
            );

            let score = if miner.suspicious {
                miner.penalty_factor.unwrap_or(0.0) * composite_pre_suspicion
            } else {
                composite_pre_suspicion
            };
            miner.score = score;

            breakdowns.push(ScoreBreakdown {
                uid: miner.uid,
                availability_score,
                reliability_score,
                latency_score,
                performance_score,
                distribution_score,
                composite_pre_suspicion,
                score,
            });
        }

        breakdowns
    }

    fn availability(&self, miner: &MinerSnapshot) -> f64 {
        if miner.is_conform() {
            1.0
        } else {
            self.config.availability_failure_reward
        }
    }

    fn reliability(&self, miner: &mut MinerSnapshot) -> f64 {
        miner.challenge_attempts += 1;
        if miner.is_conform() {
            miner.challenge_successes += 1;
        }
        wilson_score_lower_bound(miner.challenge_successes, miner.challenge_attempts)
    }

    fn latency(&self, miner: &MinerSnapshot, miners: &[MinerSnapshot]) -> f64 {
        if !miner.is_conform() {
            return self.config.latency_failure_reward;
        }

        let country = &miner.country;
        let subregion = &miner.subregion;

        // Countries present in the miner's subregion.
        let countries_in_subregion: Vec<&str> = miners
            .iter()
            .filter(|m| &m.subregion == subregion)
            .map(|m| m.country.as_str())
            .collect();

        // First: routing time ranked against miners in the same country.
        let routing_times: Vec<f64> = miners
            .iter()
            .filter(|m| &m.country == country)
            .map(|m| m.routing_time)
            .collect();
        let min_time = min_f64(&routing_times);
        let max_time = max_f64(&routing_times);
        let first = if max_time - min_time == 0.0 {
            1.0
        } else {
            (max_time - miner.routing_time) / (max_time - min_time)
        };

        // Second: country population within the subregion.
        let mut country_counts: HashMap<&str, u32> = HashMap::new();
        for c in countries_in_subregion.iter() {
            *country_counts.entry(c).or_insert(0) += 1;
        }
        let counts: Vec<u32> = country_counts.values().copied().collect();
        let min_count = counts.iter().copied().min().unwrap_or(0);
        let max_count = counts.iter().copied().max().unwrap_or(0);
        let count_c = country_counts.get(country.as_str()).copied().unwrap_or(0);
        let second = if max_count == min_count {
            1.0
        } else {
            (count_c as f64 - min_count as f64) / (max_count as f64 - min_count as f64)
        };

        // Third: average routing time per country in the subregion.
        let mut avg_by_country: HashMap<&str, f64> = HashMap::new();
        for c in country_counts.keys() {
            let times: Vec<f64> = miners
                .iter()
                .filter(|m| m.country == *c)
                .map(|m| m.routing_time)
                .collect();
            if !times.is_empty() {
                avg_by_country.insert(c, times.iter().sum::<f64>() / times.len() as f64);
            }
        }
        let averages: Vec<f64> = avg_by_country.values().copied().collect();
        let min_avg = min_f64(&averages);
        let max_avg = max_f64(&averages);
        let avg_c = avg_by_country.get(country.as_str()).copied().unwrap_or(0.0);
        let third = if max_avg - min_avg == 0.0 {
            1.0
        } else {
            (max_avg - avg_c) / (max_avg - min_avg)
        };

        // Fourth: subregion population, world-wide.
        let mut subregion_counts: HashMap<&str, u32> = HashMap::new();
        for m in miners.iter() {
            *subregion_counts.entry(m.subregion.as_str()).or_insert(0) += 1;
        }
        let sub_counts: Vec<u32> = subregion_counts.values().copied().collect();
        let min_sub = sub_counts.iter().copied().min().unwrap_or(0);
        let max_sub = sub_counts.iter().copied().max().unwrap_or(0);
        let count_r = subregion_counts.get(subregion.as_str()).copied().unwrap_or(0);
        let fourth = if max_sub == min_sub {
            1.0
        } else {
            (count_r as f64 - min_sub as f64) / (max_sub as f64 - min_sub as f64)
        };

        ((first + second) / 2.0) * 0.6 + ((third + fourth) / 2.0) * 0.4
    }

    fn performance(&self, miner: &MinerSnapshot, miners: &[MinerSnapshot]) -> f64 {
        if !miner.is_conform() {
            return self.config.performance_failure_reward;
        }

        let process_time = miner.process_time;
        let process_times: Vec<f64> = miners.iter().map(|m| m.process_time).collect();
        let min_time = min_f64(&process_times);
        let max_time = max_f64(&process_times);

        if max_time == min_time && min_time == process_time {
            return 1.0;
        }

        (max_time - process_time) / (max_time - min_time)
    }

    fn distribution(&self, miner: &MinerSnapshot, miners: &[MinerSnapshot]) -> f64 {
        if !miner.is_conform() {
            return self.config.distribution_failure_reward;
        }

        let count = miners
            .iter()
            .filter(|m| m.is_conform() && m.country == miner.country)
            .count();

        if count > 0 {
            1.0 / count as f64
        } else {
            0.0
        }
    }

    fn composite(
        &self,
        miner: &MinerSnapshot,
        availability: f64,
        latency: f64,
        performance: f64,
        reliability: f64,
        distribution: f64,
    ) -> f64 {
        let availability_weight = if miner.verified && !miner.sync {
            self.config.desync_availability_weight
        } else {
            self.config.availability_weight
        };

        let numerator = availability_weight * availability
            + self.config.latency_weight * latency
            + self.config.performance_weight * performance
            + self.config.reliability_weight * reliability
            + self.config.distribution_weight * distribution;

        let denominator = availability_weight
            + self.config.latency_weight
            + self.config.performance_weight
            + self.config.reliability_weight
            + self.config.distribution_weight;

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

/// Lower bound of the Wilson score confidence interval for a binomial
/// proportion, at the fixed 95% confidence level. `n = 0` returns `0.0`.
pub fn wilson_score_lower_bound(successes: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        return 0.0;
    }

    let n = attempts as f64;
    let z = WILSON_Z_95;
    let phat = successes as f64 / n;

    let denominator = 1.0 + z * z / n;
    let center = phat + z * z / (2.0 * n);
    let margin = z * ((phat * (1.0 - phat) + z * z / (4.0 * n)) / n).sqrt();

    ((center - margin) / denominator).clamp(0.0, 1.0)
}

fn min_f64(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_f64(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner(uid: u16, country: &str, subregion: &str) -> MinerSnapshot {
        let mut m = MinerSnapshot::new(uid, format!("hk{uid}"), format!("10.0.0.{uid}"), country.into(), subregion.into(), 0, 0);
        m.verified = true;
        m.sync = true;
        m
    }

    #[test]
    fn wilson_bound_is_zero_with_no_attempts() {
        assert_eq!(wilson_score_lower_bound(0, 0), 0.0);
    }

    #[test]
    fn wilson_bound_increases_with_more_successes_same_attempts() {
        let low = wilson_score_lower_bound(1, 10);
        let high = wilson_score_lower_bound(9, 10);
        assert!(high > low);
    }

    #[test]
    fn wilson_bound_penalizes_small_samples() {
        // Same ratio, bigger sample should yield a higher (less penalized) bound.
        let small = wilson_score_lower_bound(1, 2);
        let big = wilson_score_lower_bound(50, 100);
        assert!(big > small);
    }

    #[test]
    fn degenerate_single_miner_scores_latency_and_performance_as_one() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut m = miner(1, "FR", "Western Europe");
        m.routing_time = 0.1;
        m.process_time = 0.2;
        let miners = vec![m.clone()];

        assert_eq!(engine.latency(&m, &miners), 1.0);
        assert_eq!(engine.performance(&m, &miners), 1.0);
    }

    #[test]
    fn lower_routing_time_scores_at_least_as_well_in_same_country() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut fast = miner(1, "FR", "Western Europe");
        fast.routing_time = 0.1;
        fast.process_time = 0.1;
        let mut slow = miner(2, "FR", "Western Europe");
        slow.routing_time = 0.9;
        slow.process_time = 0.1;

        let miners = vec![fast.clone(), slow.clone()];

        let fast_latency = engine.latency(&fast, &miners);
        let slow_latency = engine.latency(&slow, &miners);
        assert!(fast_latency >= slow_latency);
    }

    #[test]
    fn unverified_miner_gets_failure_rewards_on_every_gated_subscore() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut m = miner(1, "FR", "Western Europe");
        m.verified = false;
        let miners = vec![m.clone()];

        assert_eq!(engine.availability(&m), config.availability_failure_reward);
        assert_eq!(engine.latency(&m, &miners), config.latency_failure_reward);
        assert_eq!(engine.performance(&m, &miners), config.performance_failure_reward);
        assert_eq!(engine.distribution(&m, &miners), config.distribution_failure_reward);
    }

    #[test]
    fn composite_scenario_desync_override() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut m = miner(1, "FR", "Western Europe");
        m.verified = true;
        m.sync = false;

        let composite = engine.composite(&m, 0.10, 0.30, 0.20, 0.40, 0.50);
        let expected = (0.10 * 3.0 + 0.30 * 7.0 + 0.20 * 7.0 + 0.40 * 3.0 + 0.50 * 2.0) / 22.0;
        assert!((composite - expected).abs() < 1e-9);
    }

    #[test]
    fn composite_scenario_in_sync() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut m = miner(1, "FR", "Western Europe");
        m.verified = true;
        m.sync = true;

        let composite = engine.composite(&m, 0.10, 0.30, 0.20, 0.40, 0.50);
        let expected = (0.10 * 8.0 + 0.30 * 7.0 + 0.20 * 7.0 + 0.40 * 3.0 + 0.50 * 2.0) / 27.0;
        assert!((composite - expected).abs() < 1e-9);
    }

    #[test]
    fn unverified_miner_scored_alone_has_zero_composite() {
        let config = ValidatorConfig::default();
        let mut engine_miners = vec![miner(1, "FR", "Western Europe")];
        engine_miners[0].verified = false;
        engine_miners[0].sync = false;

        let engine = ScoringEngine::new(&config);
        let breakdowns = engine.score_round(&mut engine_miners);

        assert_eq!(breakdowns[0].score, 0.0);
    }

    #[test]
    fn suspicious_with_penalty_factor_scales_composite() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut m = miner(1, "FR", "Western Europe");
        m.verified = true;
        m.sync = false;
        m.suspicious = true;
        m.penalty_factor = Some(0.4);

        let composite = engine.composite(&m, 0.10, 0.30, 0.20, 0.40, 0.50);
        let score = m.penalty_factor.unwrap() * composite;
        let expected = ((0.10 * 3.0 + 0.30 * 7.0 + 0.20 * 7.0 + 0.40 * 3.0 + 0.50 * 2.0) / 22.0) * 0.4;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn suspicious_with_missing_penalty_factor_is_zero() {
        let config = ValidatorConfig::default();
        let mut miners = vec![miner(1, "FR", "Western Europe")];
        miners[0].verified = true;
        miners[0].sync = false;
        miners[0].suspicious = true;
        miners[0].penalty_factor = None;
        miners[0].routing_time = 0.1;
        miners[0].process_time = 0.1;

        let engine = ScoringEngine::new(&config);
        let breakdowns = engine.score_round(&mut miners);
        assert_eq!(breakdowns[0].score, 0.0);
    }

    #[test]
    fn reliability_increments_attempts_every_round() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);
        let mut m = miner(1, "FR", "Western Europe");

        engine.reliability(&mut m);
        assert_eq!(m.challenge_attempts, 1);
        assert_eq!(m.challenge_successes, 1);

        m.verified = false;
        engine.reliability(&mut m);
        assert_eq!(m.challenge_attempts, 2);
        assert_eq!(m.challenge_successes, 1);
    }

    #[test]
    fn distribution_rewards_geographic_rarity() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let a = miner(1, "FR", "Western Europe");
        let b = miner(2, "FR", "Western Europe");
        let c = miner(3, "DE", "Western Europe");
        let miners = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(engine.distribution(&a, &miners), 0.5);
        assert_eq!(engine.distribution(&c, &miners), 1.0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn wilson_bound_always_in_unit_interval(successes in 0u64..10_000, extra_failures in 0u64..10_000) {
            let attempts = successes + extra_failures;
            let bound = wilson_score_lower_bound(successes, attempts);
            prop_assert!((0.0..=1.0).contains(&bound));
        }

        #[test]
        fn wilson_bound_is_monotonic_in_successes_at_fixed_attempts(attempts in 1u64..1_000, s in 0u64..1_000) {
            let successes = s % (attempts + 1);
            prop_assume!(successes < attempts);
            let low = wilson_score_lower_bound(successes, attempts);
            let high = wilson_score_lower_bound(successes + 1, attempts);
            prop_assert!(high >= low);
        }

        #[test]
        fn every_sub_score_stays_in_unit_interval(
            routing_time in 0.0f64..10.0,
            process_time in 0.0f64..10.0,
            verified in any::<bool>(),
            has_conflict in any::<bool>(),
        ) {
            let config = ValidatorConfig::default();
            let engine = ScoringEngine::new(&config);

            let mut m = miner(1, "FR", "Western Europe");
            m.verified = verified;
            m.has_ip_conflicts = has_conflict;
            m.routing_time = routing_time;
            m.process_time = process_time;

            let miners = vec![m.clone()];

            let availability = engine.availability(&m);
            let latency = engine.latency(&m, &miners);
            let performance = engine.performance(&m, &miners);
            let distribution = engine.distribution(&m, &miners);

            prop_assert!((0.0..=1.0).contains(&availability));
            prop_assert!((0.0..=1.0).contains(&latency));
            prop_assert!((0.0..=1.0).contains(&performance));
            prop_assert!((0.0..=1.0).contains(&distribution));
        }
    }

    #[test]
    fn latency_three_miner_scenario_from_spec() {
        let config = ValidatorConfig::default();
        let engine = ScoringEngine::new(&config);

        let mut best = miner(1, "FR", "Western Europe");
        best.routing_time = 0.0;
        let mut middle = miner(2, "FR", "Western Europe");
        middle.routing_time = 0.5;
        let mut worst = miner(3, "FR", "Western Europe");
        worst.routing_time = 1.0;

        let miners = vec![best.clone(), middle.clone(), worst.clone()];

        assert!((engine.latency(&best, &miners) - 1.0).abs() < 1e-9);
        assert!((engine.latency(&worst, &miners) - 0.7).abs() < 1e-9);
        assert!((engine.latency(&middle, &miners) - 0.85).abs() < 1e-9);
    }
}
