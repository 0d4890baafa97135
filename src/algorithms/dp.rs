//! Dynamic programming over the full transition model: iterative policy
//! evaluation, greedy policy improvement, Policy Iteration and Value Iteration.
//!
//! All sweeps update the value table in place, visiting states x-major, and
//! skip solid and terminal states. Terminal values therefore stay at zero and
//! the reward for entering a terminal cell is carried by the transition.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::config::DpConfig;
use crate::core::{Result, RlError};
use crate::envs::grid_world::{Action, GridWorld, Position};
use crate::policy::StochasticPolicy;
use crate::tables::{zero_values, ValueTable};

/// Two action values closer than this are treated as tied.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Result of a dynamic programming run.
#[derive(Clone, Debug, PartialEq)]
pub struct DpOutcome {
    pub values: ValueTable,
    /// Improvement rounds (Policy Iteration) or sweeps (Value Iteration).
    pub iterations: usize,
    /// False when `max_iterations` ran out first.
    pub converged: bool,
}

/// States whose value is computed by bootstrapping.
fn sweep_states(env: &GridWorld) -> Result<Vec<Position>> {
    let mut states = Vec::new();
    for pos in env.positions() {
        let cell = env.cell(pos)?;
        if !cell.is_solid && !cell.is_terminal {
            states.push(pos);
        }
    }
    Ok(states)
}

/// `R(s,a) + γ·V(s')` for the deterministic successor of `(s, a)`.
pub fn action_value(
    env: &GridWorld,
    values: &ValueTable,
    state: Position,
    action: Action,
    gamma: f64,
) -> Result<f64> {
    let obs = env.peek(state, action)?;
    let next = values.get(&obs.position).copied().unwrap_or(0.0);
    Ok(obs.reward + gamma * next)
}

/// `Q(s,a)` for every legal action at `state`, in canonical order.
fn action_values(
    env: &GridWorld,
    values: &ValueTable,
    state: Position,
    gamma: f64,
) -> Result<Vec<(Action, f64)>> {
    let legal = env.legal_actions(state)?;
    if legal.is_empty() {
        return Err(RlError::policy(state, "state has no legal actions"));
    }
    legal
        .into_iter()
        .map(|a| Ok((a, action_value(env, values, state, a, gamma)?)))
        .collect()
}

/// Iterative policy evaluation starting from an all-zero table.
///
/// Sweeps `V(s) = Σ_a π(a|s)·(R(s,a) + γ·V(s'))` until the largest change in a
/// sweep drops below `theta`. Returns the table and whether it converged
/// within `max_iterations` sweeps.
pub fn evaluate_policy(
    env: &GridWorld,
    policy: &StochasticPolicy,
    config: &DpConfig,
) -> Result<(ValueTable, bool)> {
    let states = sweep_states(env)?;
    let mut values = zero_values(env)?;

    for sweep in 1..=config.max_iterations {
        let mut delta = 0.0_f64;
        for &s in &states {
            let mut v = 0.0;
            for (&action, &p) in policy.actions(s)? {
                v += p * action_value(env, &values, s, action, config.gamma)?;
            }
            let old = values.insert(s, v).unwrap_or(0.0);
            delta = delta.max((v - old).abs());
        }
        if delta < config.theta {
            debug!("policy evaluation converged after {sweep} sweeps (delta={delta:e})");
            return Ok((values, true));
        }
    }
    warn!("policy evaluation stopped after {} sweeps without converging", config.max_iterations);
    Ok((values, false))
}

/// Make the policy greedy with respect to `values`.
///
/// Each non-terminal state keeps exactly the actions whose `Q(s,a)` ties for
/// the maximum, sharing probability equally. Returns true when no state's
/// action set changed.
pub fn improve_policy(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    values: &ValueTable,
    gamma: f64,
) -> Result<bool> {
    let mut stable = true;
    for s in sweep_states(env)? {
        let q = action_values(env, values, s, gamma)?;
        let best_value = q.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
        let best: Vec<Action> = q
            .iter()
            .filter(|&&(_, v)| best_value - v <= TIE_TOLERANCE)
            .map(|&(a, _)| a)
            .collect();
        if policy.action_set(s) != best {
            stable = false;
        }
        policy.set_uniform_over(s, &best)?;
    }
    Ok(stable)
}

/// Alternate evaluation and improvement until the policy is stable.
pub fn policy_iteration(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    config: &DpConfig,
) -> Result<DpOutcome> {
    config.validate()?;
    env.validate()?;
    *policy = StochasticPolicy::uniform(env)?;

    let mut round = 0;
    loop {
        round += 1;
        let (values, _) = evaluate_policy(env, policy, config)?;
        let stable = improve_policy(env, policy, &values, config.gamma)?;
        debug!("policy iteration round {round}: stable={stable}");
        if stable {
            info!("policy iteration converged after {round} rounds");
            return Ok(DpOutcome { values, iterations: round, converged: true });
        }
        if round >= config.max_iterations {
            warn!("policy iteration stopped after {round} rounds without a stable policy");
            return Ok(DpOutcome { values, iterations: round, converged: false });
        }
    }
}

/// One in-place Value Iteration sweep.
///
/// Every non-terminal state takes the best action value over its legal
/// actions; the first action in canonical order wins ties. Returns the largest
/// change and the chosen action per state.
pub fn value_iteration_sweep(
    env: &GridWorld,
    values: &mut ValueTable,
    gamma: f64,
) -> Result<(f64, BTreeMap<Position, Action>)> {
    let mut delta = 0.0_f64;
    let mut best_actions = BTreeMap::new();
    for s in sweep_states(env)? {
        let mut best: Option<(Action, f64)> = None;
        for (action, q) in action_values(env, values, s, gamma)? {
            if best.is_none_or(|(_, bq)| q > bq) {
                best = Some((action, q));
            }
        }
        let Some((best_action, best_value)) = best else {
            return Err(RlError::policy(s, "state has no legal actions"));
        };
        let old = values.insert(s, best_value).unwrap_or(0.0);
        delta = delta.max((old - best_value).abs());
        best_actions.insert(s, best_action);
    }
    Ok((delta, best_actions))
}

/// Value Iteration from an all-zero table.
pub fn value_iteration(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    config: &DpConfig,
) -> Result<DpOutcome> {
    let values = zero_values(env)?;
    value_iteration_from(env, policy, config, values)
}

/// Value Iteration from a caller-supplied table, then collapse the policy to
/// the best action at every non-terminal state.
pub fn value_iteration_from(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    config: &DpConfig,
    mut values: ValueTable,
) -> Result<DpOutcome> {
    config.validate()?;
    env.validate()?;
    *policy = StochasticPolicy::uniform(env)?;

    let mut sweeps = 0;
    let mut converged = false;
    let mut best_actions = BTreeMap::new();
    while sweeps < config.max_iterations {
        let (delta, best) = value_iteration_sweep(env, &mut values, config.gamma)?;
        sweeps += 1;
        best_actions = best;
        debug!("value iteration sweep {sweeps}: delta={delta:e}");
        if delta < config.theta {
            converged = true;
            break;
        }
    }
    if converged {
        info!("value iteration converged after {sweeps} sweeps");
    } else {
        warn!("value iteration stopped after {sweeps} sweeps without converging");
    }

    for (state, action) in best_actions {
        policy.set_deterministic(state, action);
    }
    Ok(DpOutcome { values, iterations: sweeps, converged })
}
