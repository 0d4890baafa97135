//! The five control algorithms, two prediction methods and the shared episode
//! generator.
//!
//! Every solver takes the environment by shared reference and returns its
//! tables. Control solvers first reset the caller's [`StochasticPolicy`] to
//! uniform over the legal actions and then update it in place; prediction only
//! reads it. [`run`] dispatches on
//! an [`AlgorithmKind`] for drivers that pick the algorithm at runtime.

pub mod dp;
pub mod episode;
pub mod monte_carlo;
pub mod td;

use rand::Rng;

use crate::config::{DpConfig, MonteCarloConfig, QLearningConfig, SarsaConfig};
use crate::core::Result;
use crate::envs::grid_world::GridWorld;
use crate::policy::StochasticPolicy;
use crate::tables::{EpisodeStats, QTable, ValueTable, VisitCounts};
use crate::utils::rng::rng_from_seed;

pub use dp::{policy_iteration, value_iteration, DpOutcome};
pub use episode::{generate_episode, sample_action, Episode, Transition};
pub use monte_carlo::{monte_carlo_prediction, MonteCarloControl, MonteCarloOutcome, PredictionOutcome};
pub use td::{q_learning, sarsa, td_prediction, QLearningOutcome, SarsaOutcome};

/// An algorithm together with its hyperparameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlgorithmKind {
    PolicyIteration(DpConfig),
    ValueIteration(DpConfig),
    MonteCarlo(MonteCarloConfig),
    Sarsa(SarsaConfig),
    QLearning(QLearningConfig),
}

impl AlgorithmKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::PolicyIteration(_) => "policy-iteration",
            AlgorithmKind::ValueIteration(_) => "value-iteration",
            AlgorithmKind::MonteCarlo(_) => "monte-carlo",
            AlgorithmKind::Sarsa(_) => "sarsa",
            AlgorithmKind::QLearning(_) => "q-learning",
        }
    }

    /// Every algorithm with its default hyperparameters.
    pub fn all_default() -> [AlgorithmKind; 5] {
        [
            AlgorithmKind::PolicyIteration(DpConfig::default()),
            AlgorithmKind::ValueIteration(DpConfig::default()),
            AlgorithmKind::MonteCarlo(MonteCarloConfig::default()),
            AlgorithmKind::Sarsa(SarsaConfig::default()),
            AlgorithmKind::QLearning(QLearningConfig::default()),
        ]
    }
}

/// What a solver hands back besides the mutated policy.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Dp(DpOutcome),
    MonteCarlo(MonteCarloOutcome),
    Sarsa(SarsaOutcome),
    QLearning(QLearningOutcome),
}

impl RunOutcome {
    /// State values, for the algorithms that keep them.
    pub fn values(&self) -> Option<&ValueTable> {
        match self {
            RunOutcome::Dp(out) => Some(&out.values),
            RunOutcome::Sarsa(out) => Some(&out.values),
            _ => None,
        }
    }

    pub fn q_values(&self) -> Option<&QTable> {
        match self {
            RunOutcome::MonteCarlo(out) => Some(&out.q_values),
            RunOutcome::QLearning(out) => Some(&out.q_values),
            _ => None,
        }
    }

    fn stats(&self) -> Option<&EpisodeStats> {
        match self {
            RunOutcome::Dp(_) => None,
            RunOutcome::MonteCarlo(out) => Some(&out.stats),
            RunOutcome::Sarsa(out) => Some(&out.stats),
            RunOutcome::QLearning(out) => Some(&out.stats),
        }
    }

    /// Cumulative reward of each episode, for the sampling algorithms.
    pub fn episode_rewards(&self) -> Option<&[f64]> { self.stats().map(|s| s.rewards.as_slice()) }

    /// Episodes that occupied each state, for the sampling algorithms.
    pub fn visits(&self) -> Option<&VisitCounts> { self.stats().map(|s| &s.visits) }
}

/// Run `kind` on `env`, updating `policy` in place.
pub fn run<R: Rng + ?Sized>(
    kind: &AlgorithmKind,
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    rng: &mut R,
) -> Result<RunOutcome> {
    log::info!("running {}", kind.name());
    let outcome = match kind {
        AlgorithmKind::PolicyIteration(config) => RunOutcome::Dp(policy_iteration(env, policy, config)?),
        AlgorithmKind::ValueIteration(config) => RunOutcome::Dp(value_iteration(env, policy, config)?),
        AlgorithmKind::MonteCarlo(config) => {
            RunOutcome::MonteCarlo(MonteCarloControl::new(config.clone()).run(env, policy, rng)?)
        }
        AlgorithmKind::Sarsa(config) => RunOutcome::Sarsa(sarsa(env, policy, config, rng)?),
        AlgorithmKind::QLearning(config) => RunOutcome::QLearning(q_learning(env, policy, config, rng)?),
    };
    Ok(outcome)
}

/// [`run`] with a fresh ChaCha stream seeded from `seed`.
pub fn run_seeded(
    kind: &AlgorithmKind,
    env: &GridWorld,
    policy: &mut StochasticPolicy,
    seed: u64,
) -> Result<RunOutcome> {
    let mut rng = rng_from_seed(seed);
    run(kind, env, policy, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::grid_world::Position;
    use crate::policy::PROBABILITY_TOLERANCE;

    fn grid() -> GridWorld {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(2, 2), 10.0).unwrap();
        env.with_base_reward(-1.0)
    }

    #[test]
    fn outcome_shape_follows_algorithm() {
        let env = grid();
        for (i, kind) in AlgorithmKind::all_default().iter().enumerate() {
            let mut policy = StochasticPolicy::uniform(&env).unwrap();
            let out = run_seeded(kind, &env, &mut policy, i as u64).unwrap();
            match kind {
                AlgorithmKind::PolicyIteration(_) | AlgorithmKind::ValueIteration(_) => {
                    assert!(out.values().is_some());
                    assert!(out.episode_rewards().is_none());
                }
                AlgorithmKind::MonteCarlo(c) => {
                    assert!(out.q_values().is_some());
                    assert_eq!(out.episode_rewards().unwrap().len(), c.num_episodes);
                }
                AlgorithmKind::Sarsa(c) => {
                    assert!(out.values().is_some());
                    assert_eq!(out.visits().unwrap()[&Position::new(0, 0)], c.num_episodes as u64);
                }
                AlgorithmKind::QLearning(_) => assert!(out.q_values().is_some()),
            }
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let env = grid();
        let kind = AlgorithmKind::QLearning(QLearningConfig::default());
        let mut p1 = StochasticPolicy::uniform(&env).unwrap();
        let mut p2 = StochasticPolicy::uniform(&env).unwrap();
        let a = run_seeded(&kind, &env, &mut p1, 42).unwrap();
        let b = run_seeded(&kind, &env, &mut p2, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(p1, p2);
    }

    #[test]
    fn each_run_starts_from_a_uniform_policy() {
        let env = grid();
        let start = Position::new(0, 0);
        let legal = env.legal_actions(start).unwrap();

        let mut policy = StochasticPolicy::empty();
        let pi = AlgorithmKind::PolicyIteration(DpConfig::default());
        run_seeded(&pi, &env, &mut policy, 0).unwrap();
        assert!(policy.is_normalized(PROBABILITY_TOLERANCE));

        let vi = AlgorithmKind::ValueIteration(DpConfig::default());
        run_seeded(&vi, &env, &mut policy, 1).unwrap();
        assert_eq!(policy.action_set(start).len(), 1);

        // Control after a greedy run still explores every legal move.
        let mc = AlgorithmKind::MonteCarlo(MonteCarloConfig::default());
        run_seeded(&mc, &env, &mut policy, 2).unwrap();
        assert_eq!(policy.action_set(start), legal);
        assert!(legal.iter().all(|&a| policy.probability(start, a) > 0.0));
        assert!(policy.is_normalized(PROBABILITY_TOLERANCE));
    }
}
