//! Temporal-difference methods: on-policy SARSA over state values, off-policy
//! Q-Learning over an explicit action-value table, and TD(0) prediction.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::algorithms::dp::TIE_TOLERANCE;
use crate::algorithms::monte_carlo::PredictionOutcome;
use crate::config::{QLearningConfig, SarsaConfig, TdPredictionConfig};
use crate::core::{Result, RlError};
use crate::envs::grid_world::{Action, GridWorld, Position};
use crate::policy::StochasticPolicy;
use crate::tables::{zero_q_values, zero_values, EpisodeStats, QTable, ValueTable};

#[derive(Clone, Debug, PartialEq)]
pub struct SarsaOutcome {
    pub values: ValueTable,
    pub stats: EpisodeStats,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QLearningOutcome {
    pub q_values: QTable,
    pub stats: EpisodeStats,
}

fn step_cap_reached(cap: Option<usize>, steps: usize, episode: usize) -> bool {
    let reached = cap.is_some_and(|cap| steps >= cap);
    if reached {
        warn!("episode {episode} truncated after {steps} steps");
    }
    reached
}

/// Actions at `state` whose successor has the highest value, in canonical
/// order. The first action that enters a terminal cell wins outright.
pub fn best_successor_actions(
    env: &GridWorld,
    values: &ValueTable,
    state: Position,
) -> Result<Vec<Action>> {
    let legal = env.legal_actions(state)?;
    if legal.is_empty() {
        return Err(RlError::policy(state, "state has no legal actions"));
    }
    let mut scored = Vec::with_capacity(legal.len());
    for action in legal {
        let next = env.peek(state, action)?;
        if next.is_terminal {
            return Ok(vec![action]);
        }
        scored.push((action, values.get(&next.position).copied().unwrap_or(0.0)));
    }
    let best = scored.iter().map(|&(_, v)| v).fold(f64::NEG_INFINITY, f64::max);
    Ok(scored.into_iter().filter(|&(_, v)| best - v <= TIE_TOLERANCE).map(|(a, _)| a).collect())
}

fn sarsa_action<R: Rng + ?Sized>(
    env: &GridWorld,
    values: &ValueTable,
    reference: &StochasticPolicy,
    state: Position,
    epsilon: f64,
    rng: &mut R,
) -> Result<Action> {
    if rng.gen_bool(epsilon) {
        return reference.sample(state, rng);
    }
    best_successor_actions(env, values, state)?
        .choose(rng)
        .copied()
        .ok_or_else(|| RlError::policy(state, "state has no legal actions"))
}

/// SARSA on state values.
///
/// Exploratory moves are drawn from a fixed uniform policy, never from the one
/// being learned. Once all episodes are done the policy is rebuilt from the
/// value table with [`best_successor_actions`], ties sharing probability.
pub fn sarsa<R: Rng + ?Sized>(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    config: &SarsaConfig,
    rng: &mut R,
) -> Result<SarsaOutcome> {
    config.validate()?;
    env.validate()?;
    *policy = StochasticPolicy::uniform(env)?;

    let reference = policy.clone();
    let mut values = zero_values(env)?;
    let mut stats = EpisodeStats::new(env)?;

    for n in 0..config.num_episodes {
        let epsilon = config.exploration.epsilon(n);
        let mut state = env.start();
        let mut action = sarsa_action(env, &values, &reference, state, epsilon, rng)?;
        let mut steps = 0;
        stats.begin_episode();

        while !step_cap_reached(config.max_episode_steps, steps, n) {
            stats.visit(state);
            let next = env.peek(state, action)?;
            stats.reward(next.reward);
            steps += 1;

            let next_action = if next.is_terminal {
                None
            } else {
                Some(sarsa_action(env, &values, &reference, next.position, epsilon, rng)?)
            };

            let bootstrap =
                if next.is_terminal { 0.0 } else { values.get(&next.position).copied().unwrap_or(0.0) };
            let v = values.entry(state).or_insert(0.0);
            *v += config.alpha * (next.reward + config.gamma * bootstrap - *v);

            match next_action {
                Some(a) => {
                    state = next.position;
                    action = a;
                }
                None => break,
            }
        }
        stats.end_episode();
        debug!("sarsa episode {n}: steps={steps}");
    }

    for state in env.positions() {
        if env.is_solid(state)? {
            continue;
        }
        let best = best_successor_actions(env, &values, state)?;
        policy.set_uniform_over(state, &best)?;
    }
    info!("sarsa finished {} episodes", config.num_episodes);

    Ok(SarsaOutcome { values, stats })
}

/// Highest-valued action in a Q row, first in canonical order on ties.
pub fn argmax(row: &BTreeMap<Action, f64>) -> Option<(Action, f64)> {
    let mut best: Option<(Action, f64)> = None;
    for (&action, &q) in row {
        if best.is_none_or(|(_, bq)| q > bq) {
            best = Some((action, q));
        }
    }
    best
}

fn greedy_action(q: &QTable, state: Position) -> Result<Action> {
    q.get(&state)
        .and_then(argmax)
        .map(|(a, _)| a)
        .ok_or_else(|| RlError::policy(state, "state has no legal actions"))
}

/// Off-policy Q-Learning.
///
/// Behaves ε-greedily against a static uniform policy but always bootstraps
/// from the best next action. The final policy is deterministic on the
/// greedy action of every state.
pub fn q_learning<R: Rng + ?Sized>(
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    config: &QLearningConfig,
    rng: &mut R,
) -> Result<QLearningOutcome> {
    config.validate()?;
    env.validate()?;
    *policy = StochasticPolicy::uniform(env)?;

    let behavior = policy.clone();
    let mut q = zero_q_values(env)?;
    let mut stats = EpisodeStats::new(env)?;

    for n in 0..config.num_episodes {
        let epsilon = config.exploration.epsilon(n);
        let mut state = env.start();
        let mut steps = 0;
        stats.begin_episode();

        while !step_cap_reached(config.max_episode_steps, steps, n) {
            stats.visit(state);
            let action = if rng.gen_bool(epsilon) {
                behavior.sample(state, rng)?
            } else {
                greedy_action(&q, state)?
            };
            let next = env.peek(state, action)?;
            stats.reward(next.reward);
            steps += 1;

            let future = if next.is_terminal {
                0.0
            } else {
                q.get(&next.position).and_then(argmax).map_or(0.0, |(_, v)| v)
            };
            let entry = q
                .get_mut(&state)
                .and_then(|row| row.get_mut(&action))
                .ok_or_else(|| RlError::policy(state, format!("no Q entry for {action}")))?;
            *entry += config.alpha * (next.reward + config.gamma * future - *entry);

            if next.is_terminal {
                break;
            }
            state = next.position;
        }
        stats.end_episode();
        debug!("q-learning episode {n}: epsilon={epsilon:.4} steps={steps}");
    }

    for (&state, row) in &q {
        let (best, _) =
            argmax(row).ok_or_else(|| RlError::policy(state, "state has no legal actions"))?;
        policy.set_deterministic(state, best);
    }
    info!("q-learning finished {} episodes", config.num_episodes);

    Ok(QLearningOutcome { q_values: q, stats })
}

/// TD(0) estimate of the state values of a fixed policy.
///
/// Each step applies `V(s) += α(r + γ·V(s')·[not terminal] - V(s))` while
/// following `policy` from the start state. The policy is not modified.
pub fn td_prediction<R: Rng + ?Sized>(
    env: &GridWorld,
    policy: &StochasticPolicy,
    config: &TdPredictionConfig,
    rng: &mut R,
) -> Result<PredictionOutcome> {
    config.validate()?;
    env.validate()?;

    let mut values = zero_values(env)?;
    let mut stats = EpisodeStats::new(env)?;

    for n in 0..config.num_episodes {
        let mut state = env.start();
        let mut steps = 0;
        stats.begin_episode();

        while !step_cap_reached(config.max_episode_steps, steps, n) {
            stats.visit(state);
            let action = policy.sample(state, rng)?;
            let next = env.peek(state, action)?;
            stats.reward(next.reward);
            steps += 1;

            let bootstrap =
                if next.is_terminal { 0.0 } else { values.get(&next.position).copied().unwrap_or(0.0) };
            let v = values.entry(state).or_insert(0.0);
            *v += config.alpha * (next.reward + config.gamma * bootstrap - *v);

            if next.is_terminal {
                break;
            }
            state = next.position;
        }
        stats.end_episode();
        debug!("td prediction episode {n}: steps={steps}");
    }
    info!("td prediction finished {} episodes", config.num_episodes);

    Ok(PredictionOutcome { values, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::dp::evaluate_policy;
    use crate::config::{DpConfig, Exploration};
    use crate::policy::PROBABILITY_TOLERANCE;
    use crate::utils::rng::rng_from_seed;

    const OPTIMUM: f64 = -(1.0 + 0.9 + 0.81) + 0.729 * 10.0;

    fn open_grid() -> GridWorld {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(2, 2), 10.0).unwrap();
        env.with_base_reward(-1.0)
    }

    #[test]
    fn terminal_successor_short_circuits() {
        let env = open_grid();
        let mut values = zero_values(&env).unwrap();
        values.insert(Position::new(2, 0), 100.0);
        let best = best_successor_actions(&env, &values, Position::new(2, 1)).unwrap();
        assert_eq!(best, vec![Action::Down]);
        let best = best_successor_actions(&env, &values, Position::new(1, 0)).unwrap();
        assert_eq!(best, vec![Action::Right]);
        let ties = best_successor_actions(&env, &zero_values(&env).unwrap(), Position::new(1, 1));
        assert_eq!(ties.unwrap(), Action::ALL.to_vec());
    }

    #[test]
    fn q_learning_reaches_optimal_start_value() {
        let env = open_grid();
        let mut policy = StochasticPolicy::uniform(&env).unwrap();
        let config = QLearningConfig {
            alpha: 0.5,
            gamma: 0.9,
            exploration: Exploration::Constant(0.3),
            num_episodes: 3000,
            max_episode_steps: Some(1000),
        };
        let out = q_learning(&env, &mut policy, &config, &mut rng_from_seed(3)).unwrap();
        let (action, value) = argmax(&out.q_values[&Position::new(0, 0)]).unwrap();
        assert!((value - OPTIMUM).abs() < 1e-2, "got {value}");
        assert!(matches!(action, Action::Right | Action::Down));
        assert_eq!(policy.action_set(Position::new(0, 0)), vec![action]);
        assert!(policy.is_normalized(PROBABILITY_TOLERANCE));
        assert_eq!(out.stats.episodes(), 3000);
    }

    #[test]
    fn sarsa_values_never_exceed_the_optimum() {
        let env = open_grid();
        let mut policy = StochasticPolicy::uniform(&env).unwrap();
        let config = SarsaConfig {
            alpha: 0.5,
            gamma: 0.9,
            exploration: Exploration::Constant(0.1),
            num_episodes: 500,
            max_episode_steps: Some(1000),
        };
        let out = sarsa(&env, &mut policy, &config, &mut rng_from_seed(8)).unwrap();
        assert!(out.values[&Position::new(0, 0)] <= OPTIMUM + 1e-9);
        let near = out.values[&Position::new(2, 1)].max(out.values[&Position::new(1, 2)]);
        assert!(near > 9.0, "got {near}");
        assert_eq!(policy.action_set(Position::new(2, 1)), vec![Action::Down]);
        assert_eq!(policy.action_set(Position::new(1, 2)), vec![Action::Right]);
        assert!(policy.is_normalized(PROBABILITY_TOLERANCE));
    }

    #[test]
    fn step_cap_bounds_every_episode() {
        let env = open_grid();
        let mut policy = StochasticPolicy::uniform(&env).unwrap();
        let config = QLearningConfig {
            exploration: Exploration::Constant(1.0),
            num_episodes: 20,
            max_episode_steps: Some(2),
            ..QLearningConfig::default()
        };
        let out = q_learning(&env, &mut policy, &config, &mut rng_from_seed(0)).unwrap();
        // Two steps can never reach the target from (0,0).
        assert!(out.stats.rewards.iter().all(|&r| r == -2.0));
    }

    #[test]
    fn td_prediction_matches_dp_evaluation() {
        let env = open_grid();
        let mut policy = StochasticPolicy::uniform(&env).unwrap();
        let path = [
            (Position::new(0, 0), Action::Right),
            (Position::new(1, 0), Action::Right),
            (Position::new(2, 0), Action::Down),
            (Position::new(2, 1), Action::Down),
        ];
        for (state, action) in path {
            policy.set_deterministic(state, action);
        }
        let before = policy.clone();

        let dp_config = DpConfig { gamma: 0.9, theta: 1e-12, max_iterations: 10_000 };
        let (expected, converged) = evaluate_policy(&env, &policy, &dp_config).unwrap();
        assert!(converged);

        let config = TdPredictionConfig { alpha: 0.5, gamma: 0.9, num_episodes: 200, max_episode_steps: None };
        let out = td_prediction(&env, &policy, &config, &mut rng_from_seed(6)).unwrap();
        assert_eq!(policy, before);
        for (state, _) in path {
            assert!((out.values[&state] - expected[&state]).abs() < 1e-6, "state {state}");
        }
        assert!((out.values[&Position::new(0, 0)] - OPTIMUM).abs() < 1e-6);
        assert_eq!(out.stats.rewards, vec![7.0; 200]);
        // Off the path nothing is ever updated.
        assert_eq!(out.values[&Position::new(0, 2)], 0.0);
    }
}
