/*
 * Budgets, Cancellation and Result Flags
 *
 * Every solver drives a worklist to fixpoint on the calling thread; the
 * only cooperative pause is at worklist-pop boundaries, where the budget
 * and the cancel token are inspected. Reaching either yields a partial
 * result annotated with `SolveFlags`, never an error.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation token. Cloned handles observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Optional step and wall-clock caps. `None` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct StepBudget {
    pub max_steps: Option<u64>,
    pub timeout: Option<Duration>,
}

impl StepBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            timeout: None,
        }
    }

    pub fn exhausted(&self, steps: u64, started: Instant) -> bool {
        if let Some(max) = self.max_steps {
            if steps >= max {
                return true;
            }
        }
        if let Some(limit) = self.timeout {
            if started.elapsed() >= limit {
                return true;
            }
        }
        false
    }
}

/// Outcome annotations on every solver result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveFlags {
    pub incomplete: bool,
    pub cancelled: bool,
}

impl SolveFlags {
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn is_partial(&self) -> bool {
        self.incomplete || self.cancelled
    }
}

/// Progress callback, invoked every N worklist pops when configured.
pub type ProgressFn = Box<dyn FnMut(u64)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn step_budget_trips_on_cap() {
        let budget = StepBudget::steps(10);
        let started = Instant::now();
        assert!(!budget.exhausted(9, started));
        assert!(budget.exhausted(10, started));
    }

    #[test]
    fn unlimited_budget_never_trips() {
        let budget = StepBudget::unlimited();
        assert!(!budget.exhausted(u64::MAX - 1, Instant::now()));
    }
}
