//! First-visit Monte Carlo methods: on-policy ε-soft control and state-value
//! prediction under a fixed policy.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use rand::Rng;

use crate::algorithms::episode::{generate_episode, Episode};
use crate::config::MonteCarloConfig;
use crate::core::Result;
use crate::envs::grid_world::{Action, GridWorld, Position};
use crate::policy::StochasticPolicy;
use crate::tables::{zero_values, EpisodeStats, QTable, ValueTable};

/// Result of a Monte Carlo Control run.
#[derive(Clone, Debug, PartialEq)]
pub struct MonteCarloOutcome {
    /// Mean first-visit return per (state, action) pair that was ever visited.
    pub q_values: QTable,
    pub stats: EpisodeStats,
}

/// Result of Monte Carlo Prediction.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionOutcome {
    pub values: ValueTable,
    pub stats: EpisodeStats,
}

fn mean(xs: &[f64]) -> f64 { xs.iter().sum::<f64>() / xs.len() as f64 }

/// On-policy first-visit Monte Carlo Control with an ε-soft policy.
#[derive(Clone, Debug)]
pub struct MonteCarloControl {
    config: MonteCarloConfig,
    returns: BTreeMap<(Position, Action), Vec<f64>>,
    q_values: QTable,
}

impl MonteCarloControl {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config, returns: BTreeMap::new(), q_values: QTable::new() }
    }

    pub fn config(&self) -> &MonteCarloConfig { &self.config }

    /// Current estimates; only pairs with at least one return are present.
    pub fn q_values(&self) -> &QTable { &self.q_values }

    /// First-visit returns recorded for `(state, action)`.
    pub fn returns(&self, state: Position, action: Action) -> &[f64] {
        self.returns.get(&(state, action)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest estimate at `state`, first in canonical order on ties.
    pub fn best_action(&self, state: Position) -> Option<Action> {
        let mut best: Option<(Action, f64)> = None;
        for (&action, &q) in self.q_values.get(&state)? {
            if best.is_none_or(|(_, bq)| q > bq) {
                best = Some((action, q));
            }
        }
        best.map(|(a, _)| a)
    }

    /// Credit one episode.
    ///
    /// Walks it backwards accumulating `G ← γ·G + r`. The first time a pair is
    /// met in this backward pass its return is recorded, its mean recomputed and the
    /// policy at that state made ε-soft around the current best action, before
    /// the walk continues to earlier steps.
    pub fn update(
        &mut self,
        episode: &Episode,
        policy: &mut StochasticPolicy,
        epsilon: f64,
    ) -> Result<()> {
        let mut g = 0.0;
        let mut visited = BTreeSet::new();

        for t in episode.transitions.iter().rev() {
            g = self.config.gamma * g + t.reward;

            if !visited.insert((t.state, t.action)) {
                continue;
            }
            let returns = self.returns.entry((t.state, t.action)).or_default();
            returns.push(g);
            let estimate = mean(returns);
            self.q_values.entry(t.state).or_default().insert(t.action, estimate);

            if let Some(best) = self.best_action(t.state) {
                policy.set_epsilon_soft(t.state, best, epsilon)?;
            }
        }
        Ok(())
    }

    /// Run `num_episodes` episodes from the environment's start state.
    pub fn run<R: Rng + ?Sized>(
        mut self,
        env: &GridWorld,
        policy: &mut StochasticPolicy,
        rng: &mut R,
    ) -> Result<MonteCarloOutcome> {
        self.config.validate_control()?;
        env.validate()?;
        *policy = StochasticPolicy::uniform(env)?;

        let mut stats = EpisodeStats::new(env)?;
        for n in 0..self.config.num_episodes {
            let epsilon = self.config.exploration.epsilon(n);
            let episode =
                generate_episode(env, policy, env.start(), self.config.max_episode_steps, rng)?;

            stats.begin_episode();
            for t in &episode.transitions {
                stats.visit(t.state);
                stats.reward(t.reward);
            }
            stats.end_episode();

            self.update(&episode, policy, epsilon)?;
            debug!(
                "monte carlo episode {n}: epsilon={epsilon:.4} steps={} reward={}",
                episode.len(),
                episode.total_reward()
            );
        }
        info!("monte carlo control finished {} episodes", self.config.num_episodes);

        Ok(MonteCarloOutcome { q_values: self.q_values, stats })
    }
}

/// First-visit Monte Carlo estimate of the state values of a fixed policy.
pub fn monte_carlo_prediction<R: Rng + ?Sized>(
    env: &GridWorld,
    policy: &StochasticPolicy,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> Result<PredictionOutcome> {
    config.validate()?;
    env.validate()?;

    let mut values = zero_values(env)?;
    let mut returns: BTreeMap<Position, Vec<f64>> = BTreeMap::new();
    let mut stats = EpisodeStats::new(env)?;

    for n in 0..config.num_episodes {
        let episode = generate_episode(env, policy, env.start(), config.max_episode_steps, rng)?;
        stats.begin_episode();

        let mut g = 0.0;
        let mut visited = BTreeSet::new();
        for t in episode.transitions.iter().rev() {
            g = config.gamma * g + t.reward;
            stats.visit(t.state);
            stats.reward(t.reward);
            if visited.insert(t.state) {
                let state_returns = returns.entry(t.state).or_default();
                state_returns.push(g);
                values.insert(t.state, mean(state_returns));
            }
        }
        stats.end_episode();
        debug!("monte carlo prediction episode {n}: steps={}", episode.len());
    }
    info!("monte carlo prediction finished {} episodes", config.num_episodes);

    Ok(PredictionOutcome { values, stats })
}
