//! Value tables and per-episode diagnostics produced by the solvers.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::Result;
use crate::envs::grid_world::{Action, GridWorld, Position};

/// Position → estimated discounted return.
pub type ValueTable = BTreeMap<Position, f64>;

/// Position → (Action → estimated discounted return).
pub type QTable = BTreeMap<Position, BTreeMap<Action, f64>>;

/// Position → number of episodes that occupied the state at least once.
pub type VisitCounts = BTreeMap<Position, u64>;

/// 0.0 for every non-solid state.
pub fn zero_values(env: &GridWorld) -> Result<ValueTable> {
    let mut values = ValueTable::new();
    for pos in env.positions() {
        if !env.is_solid(pos)? {
            values.insert(pos, 0.0);
        }
    }
    Ok(values)
}

/// 0.0 for every legal action of every non-solid state.
pub fn zero_q_values(env: &GridWorld) -> Result<QTable> {
    let mut q = QTable::new();
    for pos in env.positions() {
        if env.is_solid(pos)? {
            continue;
        }
        q.insert(pos, env.legal_actions(pos)?.into_iter().map(|a| (a, 0.0)).collect());
    }
    Ok(q)
}

/// Largest absolute per-state difference between two tables.
pub fn max_difference(a: &ValueTable, b: &ValueTable) -> f64 {
    a.iter()
        .map(|(pos, va)| (va - b.get(pos).copied().unwrap_or(0.0)).abs())
        .fold(0.0, f64::max)
}

/// Per-episode cumulative reward and state visit counts, kept for plotting.
/// Nothing here feeds back into any algorithm.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeStats {
    pub rewards: Vec<f64>,
    pub visits: VisitCounts,
    seen: BTreeSet<Position>,
    current: f64,
}

impl EpisodeStats {
    /// Start with a zero visit count for every non-solid state.
    pub fn new(env: &GridWorld) -> Result<Self> {
        let visits = zero_values(env)?.into_keys().map(|p| (p, 0)).collect();
        Ok(Self { rewards: Vec::new(), visits, seen: BTreeSet::new(), current: 0.0 })
    }

    pub fn begin_episode(&mut self) {
        self.seen.clear();
        self.current = 0.0;
    }

    /// Count `state` once for the running episode.
    pub fn visit(&mut self, state: Position) {
        if self.seen.insert(state) {
            *self.visits.entry(state).or_insert(0) += 1;
        }
    }

    pub fn reward(&mut self, reward: f64) { self.current += reward; }

    pub fn end_episode(&mut self) {
        self.rewards.push(self.current);
        self.current = 0.0;
    }

    pub fn episodes(&self) -> usize { self.rewards.len() }
}
