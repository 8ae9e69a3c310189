use parking_lot::RwLock;

/// Stake-indexed moving average, one `f64` per global uid. Updated only for
/// uids selected in the current round; everyone else's previous value is
/// retained untouched until they are next selected or flagged suspicious.
pub struct RewardSmoother {
    alpha: f64,
    values: RwLock<Vec<f64>>,
}

impl RewardSmoother {
    pub fn new(alpha: f64, initial: Vec<f64>) -> Self {
        Self { alpha, values: RwLock::new(initial) }
    }

    /// Grows the backing vector with zeros if `uid` falls outside its
    /// current length — the metagraph can register new uids between rounds.
    fn ensure_len(values: &mut Vec<f64>, uid: u16) {
        let needed = uid as usize + 1;
        if values.len() < needed {
            values.resize(needed, 0.0);
        }
    }

    /// Applies the EMA update to every `(uid, composite)` pair selected this
    /// round; every other uid's value is left exactly as it was.
    pub fn update(&self, selected: &[(u16, f64)]) {
        let mut values = self.values.write();
        for &(uid, composite) in selected {
            Self::ensure_len(&mut values, uid);
            let idx = uid as usize;
            values[idx] = self.alpha * composite + (1.0 - self.alpha) * values[idx];
        }
    }

    /// Zeros every uid the suspicion source flags for deregistration. Always
    /// applied after `update`, so a suspicious selected uid's fresh EMA
    /// value is discarded in favor of zero.
    pub fn zero_suspicious(&self, suspicious_uids: &[u16]) {
        let mut values = self.values.write();
        for &uid in suspicious_uids {
            Self::ensure_len(&mut values, uid);
            values[uid as usize] = 0.0;
        }
    }

    pub fn snapshot(&self) -> Vec<f64> {
        self.values.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_update_only_touches_selected_uids() {
        let smoother = RewardSmoother::new(0.1, vec![0.5, 0.5, 0.5]);
        smoother.update(&[(0, 1.0)]);

        let snapshot = smoother.snapshot();
        assert!((snapshot[0] - (0.1 * 1.0 + 0.9 * 0.5)).abs() < 1e-12);
        assert_eq!(snapshot[1], 0.5);
        assert_eq!(snapshot[2], 0.5);
    }

    #[test]
    fn repeated_updates_converge_toward_the_sampled_value() {
        let smoother = RewardSmoother::new(0.1, vec![0.0]);
        for _ in 0..200 {
            smoother.update(&[(0, 1.0)]);
        }
        let snapshot = smoother.snapshot();
        assert!((snapshot[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn suspicion_zeroing_overrides_a_fresh_update_in_the_same_round() {
        let smoother = RewardSmoother::new(0.1, vec![0.5]);
        smoother.update(&[(0, 1.0)]);
        smoother.zero_suspicious(&[0]);

        assert_eq!(smoother.snapshot()[0], 0.0);
    }

    #[test]
    fn vector_grows_to_accommodate_new_uids() {
        let smoother = RewardSmoother::new(0.1, vec![0.5]);
        smoother.update(&[(4, 1.0)]);

        let snapshot = smoother.snapshot();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot[1], 0.0);
        assert_eq!(snapshot[2], 0.0);
    }
}
