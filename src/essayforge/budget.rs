//! Shared token and cost accounting for a run.
//!
//! Every research task consults [`ResourceBudget::exceeded`] before it issues its
//! external call and records its usage afterwards. All counters live behind one lock, so
//! a reader never observes tokens from one task paired with the cost of another.
//!
//! The check happens before the call, not during it: tasks already in flight finish
//! normally, so the final totals may overshoot a ceiling by at most the usage of the
//! tasks that were running when it was crossed.
//!
//! # Example
//!
//! ```
//! use essayforge::budget::ResourceBudget;
//! use essayforge::client_wrapper::TokenUsage;
//!
//! let budget = ResourceBudget::new(100, 0.0);
//! budget.record("fact-gatherer-0-0", &TokenUsage::new(40, 59), 0.01);
//! assert!(!budget.exceeded());
//! budget.record("current-state-1-0", &TokenUsage::new(0, 1), 0.0);
//! assert!(budget.exceeded());
//! ```

use crate::client_wrapper::TokenUsage;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct BudgetState {
    total_tokens: usize,
    total_cost: f64,
    per_task: HashMap<String, usize>,
}

/// Point-in-time copy of the budget counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSnapshot {
    pub total_tokens: usize,
    pub total_cost: f64,
    pub token_limit: usize,
    pub cost_limit: f64,
    pub tasks_recorded: usize,
}

/// Token/cost ceilings plus running totals. A limit of zero means unlimited.
#[derive(Debug)]
pub struct ResourceBudget {
    token_limit: usize,
    cost_limit: f64,
    state: Mutex<BudgetState>,
}

impl ResourceBudget {
    /// Create a budget with the given ceilings (`0` / `0.0` disable a ceiling).
    pub fn new(token_limit: usize, cost_limit: f64) -> Self {
        ResourceBudget {
            token_limit,
            cost_limit,
            state: Mutex::new(BudgetState::default()),
        }
    }

    /// A budget that never blocks.
    pub fn unlimited() -> Self {
        Self::new(0, 0.0)
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        // Counters stay consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `true` once either enabled ceiling has been reached.
    pub fn exceeded(&self) -> bool {
        let state = self.lock();
        if self.token_limit > 0 && state.total_tokens >= self.token_limit {
            return true;
        }
        if self.cost_limit > 0.0 && state.total_cost >= self.cost_limit {
            return true;
        }
        false
    }

    /// Add one task's usage to the totals.
    ///
    /// Recording the same task id twice accumulates its per-task counter.
    pub fn record(&self, task_id: &str, usage: &TokenUsage, cost: f64) {
        let mut state = self.lock();
        state.total_tokens += usage.total_tokens;
        state.total_cost += cost;
        *state.per_task.entry(task_id.to_string()).or_insert(0) += usage.total_tokens;
    }

    pub fn total_tokens(&self) -> usize {
        self.lock().total_tokens
    }

    pub fn total_cost(&self) -> f64 {
        self.lock().total_cost
    }

    /// Tokens recorded for one task, if any.
    pub fn task_usage(&self, task_id: &str) -> Option<usize> {
        self.lock().per_task.get(task_id).copied()
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    pub fn cost_limit(&self) -> f64 {
        self.cost_limit
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let state = self.lock();
        BudgetSnapshot {
            total_tokens: state.total_tokens,
            total_cost: state.total_cost,
            token_limit: self.token_limit,
            cost_limit: self.cost_limit,
            tasks_recorded: state.per_task.len(),
        }
    }
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}
