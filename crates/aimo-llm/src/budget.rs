//! Daily token-bucket budget controller (`spec.md` §4.7 "Budget"). The
//! spent-so-far counter is exclusively owned here — nothing else may mutate
//! it (`spec.md` §5 "Resource ownership").

use aimo_core::model::CandidateFlag;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// A-over-B-over-C-over-none priority used for budget admission decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CandidatePriority {
    None,
    C,
    B,
    A,
}

impl CandidatePriority {
    #[must_use]
    pub fn from_flags(flags: &BTreeSet<CandidateFlag>) -> Self {
        if flags.contains(&CandidateFlag::A) {
            CandidatePriority::A
        } else if flags.contains(&CandidateFlag::B) {
            CandidatePriority::B
        } else if flags.contains(&CandidateFlag::C) {
            CandidatePriority::C
        } else {
            CandidatePriority::None
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PriceTable {
    pub input_price_per_token: f64,
    pub output_price_per_token: f64,
    pub estimation_buffer: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    /// Proceed; cost estimate fit comfortably in budget (or priority forces it).
    Proceed,
    /// Proceed even though the estimate exceeds remaining budget (A/B overrun).
    ProceedOverrun,
    /// Skip — not enough remaining budget and priority doesn't force it.
    Skip,
}

struct BudgetState {
    day: NaiveDate,
    spent_usd: f64,
}

pub struct BudgetController {
    daily_limit_usd: f64,
    prices: PriceTable,
    state: Mutex<BudgetState>,
}

impl BudgetController {
    #[must_use]
    pub fn new(daily_limit_usd: f64, prices: PriceTable, now: DateTime<Utc>) -> Self {
        Self { daily_limit_usd, prices, state: Mutex::new(BudgetState { day: now.date_naive(), spent_usd: 0.0 }) }
    }

    fn estimated_cost(&self, est_input_tokens: u64, est_output_tokens: u64) -> f64 {
        (est_input_tokens as f64 * self.prices.input_price_per_token + est_output_tokens as f64 * self.prices.output_price_per_token) * self.prices.estimation_buffer
    }

    /// Resets the spent counter if `now` has rolled over a UTC day boundary
    /// since the last call.
    fn roll_over_if_needed(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().expect("budget mutex poisoned");
        let today = now.date_naive();
        if today != state.day {
            state.day = today;
            state.spent_usd = 0.0;
        }
    }

    #[must_use]
    pub fn remaining_usd(&self, now: DateTime<Utc>) -> f64 {
        self.roll_over_if_needed(now);
        let state = self.state.lock().expect("budget mutex poisoned");
        (self.daily_limit_usd - state.spent_usd).max(0.0)
    }

    /// Decides whether a candidate signature should be analyzed, per
    /// `spec.md` §4.7's priority table. A/B candidates always proceed (an
    /// overrun is logged, not blocked); C and no-priority candidates proceed
    /// only if the estimate fits in the remaining budget.
    pub fn decide(&self, priority: CandidatePriority, est_input_tokens: u64, est_output_tokens: u64, now: DateTime<Utc>) -> (BudgetDecision, f64) {
        self.roll_over_if_needed(now);
        let cost = self.estimated_cost(est_input_tokens, est_output_tokens);
        let remaining = self.remaining_usd(now);

        let decision = if matches!(priority, CandidatePriority::A | CandidatePriority::B) {
            if cost <= remaining {
                BudgetDecision::Proceed
            } else {
                tracing::warn!(priority = ?priority, cost, remaining, "LLM budget overrun for high-priority candidate, proceeding anyway");
                BudgetDecision::ProceedOverrun
            }
        } else if cost <= remaining {
            BudgetDecision::Proceed
        } else {
            BudgetDecision::Skip
        };

        (decision, cost)
    }

    /// Records actual spend against the counter. Only the caller that ran
    /// the request should call this — no other component may mutate spend.
    pub fn record_spend(&self, now: DateTime<Utc>, actual_cost_usd: f64) {
        self.roll_over_if_needed(now);
        let mut state = self.state.lock().expect("budget mutex poisoned");
        state.spent_usd += actual_cost_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn prices() -> PriceTable {
        PriceTable { input_price_per_token: 0.000_003, output_price_per_token: 0.000_015, estimation_buffer: 1.2 }
    }

    #[test]
    fn a_priority_proceeds_even_over_budget() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let controller = BudgetController::new(0.01, prices(), now);
        let (decision, _cost) = controller.decide(CandidatePriority::A, 1_000_000, 1_000_000, now);
        assert_eq!(decision, BudgetDecision::ProceedOverrun);
    }

    #[test]
    fn no_priority_skips_when_over_budget() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let controller = BudgetController::new(0.01, prices(), now);
        let (decision, _cost) = controller.decide(CandidatePriority::None, 1_000_000, 1_000_000, now);
        assert_eq!(decision, BudgetDecision::Skip);
    }

    #[test]
    fn budget_resets_on_new_utc_day() {
        let day1 = Utc.with_ymd_and_hms(2026, 1, 1, 23, 59, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 1, 0).unwrap();
        let controller = BudgetController::new(1.0, prices(), day1);
        controller.record_spend(day1, 0.9);
        assert!(controller.remaining_usd(day1) < 0.2);
        assert!((controller.remaining_usd(day2) - 1.0).abs() < f64::EPSILON);
    }
}
