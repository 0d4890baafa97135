//! An agent that follows a (usually learned) policy through the `Env`
//! interface, so wrappers such as [`crate::wrappers::TimeLimit`] apply.

use log::debug;
use rand::Rng;

use crate::core::{Env, InfoValue, Result};
use crate::envs::grid_world::{Action, Position};
use crate::policy::StochasticPolicy;

/// Outcome of one episode driven by [`Agent::run_episode`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub steps: usize,
    pub total_reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

#[derive(Clone, Debug)]
pub struct Agent {
    policy: StochasticPolicy,
    position: Position,
    last_reward: f64,
}

impl Agent {
    pub fn new(policy: StochasticPolicy, position: Position) -> Self {
        Self { policy, position, last_reward: 0.0 }
    }

    pub fn policy(&self) -> &StochasticPolicy { &self.policy }

    pub fn policy_mut(&mut self) -> &mut StochasticPolicy { &mut self.policy }

    pub fn position(&self) -> Position { self.position }

    pub fn set_position(&mut self, position: Position) { self.position = position; }

    pub fn last_reward(&self) -> f64 { self.last_reward }

    /// Sample the next action at the current position.
    pub fn act<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Action> {
        self.policy.sample(self.position, rng)
    }

    /// Reset `env` and follow the policy until it terminates or truncates.
    ///
    /// When the environment reports `episode_return`/`episode_length` (see
    /// [`crate::wrappers::RecordEpisodeStatistics`]) those figures are used for
    /// the summary.
    pub fn run_episode<E, R>(&mut self, env: &mut E, rng: &mut R) -> Result<EpisodeSummary>
    where
        E: Env<Obs = Position, Act = Action>,
        R: Rng + ?Sized,
    {
        let (start, _) = env.reset(None);
        self.position = start;
        self.last_reward = 0.0;

        let mut summary =
            EpisodeSummary { steps: 0, total_reward: 0.0, terminated: false, truncated: false };
        loop {
            let action = self.act(rng)?;
            let step = env.step(action)?;
            debug!("[step {}] {} -> {} reward={}", action, self.position, step.observation, step.reward);

            self.position = step.observation;
            self.last_reward = step.reward;
            summary.steps += 1;
            summary.total_reward += step.reward;

            if step.terminated || step.truncated {
                summary.terminated = step.terminated;
                summary.truncated = step.truncated;
                if let Some(ret) = step.info.get("episode_return").and_then(InfoValue::as_f64) {
                    summary.total_reward = ret;
                }
                if let Some(len) = step.info.get("episode_length").and_then(InfoValue::as_i64) {
                    summary.steps = len as usize;
                }
                return Ok(summary);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::grid_world::GridWorld;
    use crate::utils::rng::rng_from_seed;
    use crate::wrappers::{RecordEpisodeStatistics, TimeLimit};

    fn corridor() -> GridWorld {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(2, 0), 4.0).unwrap();
        env.with_base_reward(-1.0)
    }

    fn walk_right(env: &GridWorld) -> StochasticPolicy {
        let mut policy = StochasticPolicy::uniform(env).unwrap();
        policy.set_deterministic(Position::new(0, 0), Action::Right);
        policy.set_deterministic(Position::new(1, 0), Action::Right);
        policy
    }

    #[test]
    fn deterministic_policy_reaches_target() {
        let env = corridor();
        let mut agent = Agent::new(walk_right(&env), env.start());
        let mut env = RecordEpisodeStatistics::new(env);
        let summary = agent.run_episode(&mut env, &mut rng_from_seed(0)).unwrap();
        assert_eq!(
            summary,
            EpisodeSummary { steps: 2, total_reward: 3.0, terminated: true, truncated: false }
        );
        assert_eq!(agent.position(), Position::new(2, 0));
        assert_eq!(agent.last_reward(), 4.0);
    }

    #[test]
    fn time_limit_stops_a_looping_policy() {
        let env = corridor();
        let mut policy = walk_right(&env);
        policy.set_deterministic(Position::new(0, 0), Action::Down);
        policy.set_deterministic(Position::new(0, 1), Action::Up);
        let mut agent = Agent::new(policy, env.start());
        let mut env = TimeLimit::new(env, 5);
        let summary = agent.run_episode(&mut env, &mut rng_from_seed(1)).unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.steps, 5);
        assert_eq!(summary.total_reward, -5.0);
    }
}
