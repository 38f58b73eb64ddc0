//! Cost Guard
//!
//! Per-batch admission control for generation spend, in abstract budget
//! units. The guard holds no opinion on actual currency cost; pricing
//! lives with the generation collaborator.

use parking_lot::Mutex;

/// Default estimated cost of one regeneration, in budget units.
pub const UNIT_COST: u32 = 1;

/// Result of a budget reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Granted,
    Denied,
}

impl Reservation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Reservation::Granted)
    }
}

/// Tracks consumed budget across one batch.
///
/// The counter starts at zero per batch and never survives it. The
/// check-and-increment happens in a single lock region so concurrent
/// workers cannot jointly overshoot the budget.
pub struct CostGuard {
    budget: u32,
    enforce: bool,
    consumed: Mutex<u32>,
}

impl CostGuard {
    pub fn new(budget: u32, enforce: bool) -> Self {
        Self {
            budget,
            enforce,
            consumed: Mutex::new(0),
        }
    }

    /// Reserve `weight` budget units for one regeneration.
    ///
    /// With enforcement off every reservation is granted and the total is
    /// tracked for reporting only. Denial never carries state: a later,
    /// cheaper reservation may still succeed.
    pub fn reserve(&self, weight: u32) -> Reservation {
        let mut consumed = self.consumed.lock();
        if self.enforce && consumed.saturating_add(weight) > self.budget {
            return Reservation::Denied;
        }
        *consumed = consumed.saturating_add(weight);
        Reservation::Granted
    }

    /// Total budget units consumed so far.
    pub fn consumed(&self) -> u32 {
        *self.consumed.lock()
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn grants_until_budget_exhausted() {
        let guard = CostGuard::new(3, true);
        assert!(guard.reserve(UNIT_COST).is_granted());
        assert!(guard.reserve(UNIT_COST).is_granted());
        assert!(guard.reserve(UNIT_COST).is_granted());
        assert_eq!(guard.reserve(UNIT_COST), Reservation::Denied);
        assert_eq!(guard.consumed(), 3);
    }

    #[test]
    fn denial_does_not_consume_budget() {
        let guard = CostGuard::new(5, true);
        assert!(guard.reserve(4).is_granted());
        assert_eq!(guard.reserve(3), Reservation::Denied);
        // A smaller reservation still fits after a denial.
        assert!(guard.reserve(1).is_granted());
        assert_eq!(guard.consumed(), 5);
    }

    #[test]
    fn unenforced_guard_grants_past_budget_and_tracks_total() {
        let guard = CostGuard::new(1, false);
        for _ in 0..5 {
            assert!(guard.reserve(UNIT_COST).is_granted());
        }
        assert_eq!(guard.consumed(), 5);
    }

    #[test]
    fn concurrent_reservations_never_overshoot() {
        let guard = Arc::new(CostGuard::new(10, true));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = Arc::clone(&guard);
            handles.push(std::thread::spawn(move || {
                let mut granted = 0u32;
                for _ in 0..5 {
                    if guard.reserve(UNIT_COST).is_granted() {
                        granted += 1;
                    }
                }
                granted
            }));
        }
        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
        assert_eq!(guard.consumed(), 10);
    }

    proptest! {
        #[test]
        fn enforced_guard_never_exceeds_budget(
            budget in 0u32..100,
            weights in proptest::collection::vec(1u32..10, 0..50),
        ) {
            let guard = CostGuard::new(budget, true);
            for weight in weights {
                guard.reserve(weight);
                prop_assert!(guard.consumed() <= budget);
            }
        }
    }
}
