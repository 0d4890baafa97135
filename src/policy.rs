//! Stochastic policies over the grid world.
//!
//! A policy maps each non-solid state to a probability distribution over the
//! actions present at that state. Actions that would leave the grid or run
//! into a solid cell are never present as keys.

use std::collections::BTreeMap;

use rand::Rng;

use crate::core::{Result, RlError};
use crate::envs::grid_world::{Action, GridWorld, Position};

/// Tolerance used when checking that a distribution sums to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Position → (Action → probability).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StochasticPolicy {
    table: BTreeMap<Position, BTreeMap<Action, f64>>,
}

impl StochasticPolicy {
    /// A policy with no states; fill it with `set_distribution`.
    pub fn empty() -> Self { Self::default() }

    /// Uniform distribution over the legal actions of every non-solid state.
    ///
    /// Fails with `InvalidPolicyState` if a non-solid state has no legal action.
    pub fn uniform(env: &GridWorld) -> Result<Self> {
        let mut table = BTreeMap::new();
        for pos in env.positions() {
            if env.is_solid(pos)? {
                continue;
            }
            let legal = env.legal_actions(pos)?;
            if legal.is_empty() {
                return Err(RlError::policy(pos, "state has no legal actions"));
            }
            let p = 1.0 / legal.len() as f64;
            table.insert(pos, legal.into_iter().map(|a| (a, p)).collect());
        }
        Ok(Self { table })
    }

    /// States that carry a distribution, x-major.
    pub fn states(&self) -> impl Iterator<Item = Position> + '_ { self.table.keys().copied() }

    pub fn len(&self) -> usize { self.table.len() }

    pub fn is_empty(&self) -> bool { self.table.is_empty() }

    /// The distribution at `state`.
    pub fn actions(&self, state: Position) -> Result<&BTreeMap<Action, f64>> {
        self.table
            .get(&state)
            .ok_or_else(|| RlError::policy(state, "no policy entry for state"))
    }

    /// Number of actions present at `state` (`|A(s)|`).
    pub fn action_count(&self, state: Position) -> Result<usize> {
        let n = self.actions(state)?.len();
        if n == 0 {
            return Err(RlError::policy(state, "state has no actions"));
        }
        Ok(n)
    }

    /// π(action | state); 0.0 when the action is absent.
    pub fn probability(&self, state: Position, action: Action) -> f64 {
        self.table
            .get(&state)
            .and_then(|dist| dist.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of the probabilities at `state`.
    pub fn total(&self, state: Position) -> f64 {
        self.table.get(&state).map(|d| d.values().sum()).unwrap_or(0.0)
    }

    /// Whether every state's distribution sums to one within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        self.table
            .values()
            .all(|d| (d.values().sum::<f64>() - 1.0).abs() <= tolerance)
    }

    /// Replace the distribution at `state`.
    pub fn set_distribution(&mut self, state: Position, dist: BTreeMap<Action, f64>) {
        self.table.insert(state, dist);
    }

    /// Keep only `action`, with probability 1.
    pub fn set_deterministic(&mut self, state: Position, action: Action) {
        self.table.insert(state, BTreeMap::from([(action, 1.0)]));
    }

    /// Split probability evenly over `actions`; every other action is removed.
    pub fn set_uniform_over(&mut self, state: Position, actions: &[Action]) -> Result<()> {
        if actions.is_empty() {
            return Err(RlError::policy(state, "cannot spread probability over zero actions"));
        }
        let p = 1.0 / actions.len() as f64;
        self.table.insert(state, actions.iter().map(|&a| (a, p)).collect());
        Ok(())
    }

    /// Epsilon-soft update: `best` gets `1 - ε + ε/|A(s)|`, every other present
    /// action gets `ε/|A(s)|`.
    pub fn set_epsilon_soft(&mut self, state: Position, best: Action, epsilon: f64) -> Result<()> {
        let dist = self
            .table
            .get_mut(&state)
            .ok_or_else(|| RlError::policy(state, "no policy entry for state"))?;
        if !dist.contains_key(&best) {
            return Err(RlError::policy(state, format!("action {best} is not available")));
        }
        let share = epsilon / dist.len() as f64;
        for (action, p) in dist.iter_mut() {
            *p = if *action == best { 1.0 - epsilon + share } else { share };
        }
        Ok(())
    }

    /// Rescale the distribution at `state` so it sums to one.
    pub fn renormalize(&mut self, state: Position) -> Result<()> {
        let dist = self
            .table
            .get_mut(&state)
            .ok_or_else(|| RlError::policy(state, "no policy entry for state"))?;
        let total: f64 = dist.values().sum();
        if dist.is_empty() || !(total > 0.0) || !total.is_finite() {
            return Err(RlError::policy(state, format!("cannot renormalize total mass {total}")));
        }
        for p in dist.values_mut() {
            *p /= total;
        }
        Ok(())
    }

    /// Draw an action by walking the cumulative distribution.
    pub fn sample<R: Rng + ?Sized>(&self, state: Position, rng: &mut R) -> Result<Action> {
        let dist = self.actions(state)?;
        let total: f64 = dist.values().sum();
        if !(total > 0.0) {
            return Err(RlError::policy(state, "no probability mass to sample from"));
        }
        let u = rng.gen_range(0.0..total);
        let mut threshold = 0.0;
        let mut last = None;
        for (&action, &p) in dist {
            if p <= 0.0 {
                continue;
            }
            threshold += p;
            last = Some(action);
            if u < threshold {
                return Ok(action);
            }
        }
        // Rounding left `u` just above the accumulated mass.
        last.ok_or_else(|| RlError::policy(state, "no probability mass to sample from"))
    }

    /// The most probable action at `state`, first in canonical order on ties.
    pub fn most_likely(&self, state: Position) -> Result<Action> {
        let mut best: Option<(Action, f64)> = None;
        for (&action, &p) in self.actions(state)? {
            if best.is_none_or(|(_, bp)| p > bp) {
                best = Some((action, p));
            }
        }
        best.map(|(a, _)| a)
            .ok_or_else(|| RlError::policy(state, "state has no actions"))
    }

    /// Actions at `state` sorted by canonical order.
    pub fn action_set(&self, state: Position) -> Vec<Action> {
        self.table.get(&state).map(|d| d.keys().copied().collect()).unwrap_or_default()
    }
}
