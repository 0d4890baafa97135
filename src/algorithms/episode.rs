use log::warn;
use rand::Rng;

use crate::core::Result;
use crate::envs::grid_world::{Action, GridWorld, Position};
use crate::policy::StochasticPolicy;

/// One recorded transition: the state, the action taken there and the reward
/// earned by the move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub state: Position,
    pub action: Action,
    pub reward: f64,
}

/// A rolled-out episode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Episode {
    pub transitions: Vec<Transition>,
    /// The step cap ended the episode before a terminal cell was entered.
    pub truncated: bool,
}

impl Episode {
    /// Build an episode from `(state, action, reward)` triples.
    pub fn from_triples<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = (Position, Action, f64)>,
    {
        let transitions = triples
            .into_iter()
            .map(|(state, action, reward)| Transition { state, action, reward })
            .collect();
        Self { transitions, truncated: false }
    }

    pub fn len(&self) -> usize { self.transitions.len() }

    pub fn is_empty(&self) -> bool { self.transitions.is_empty() }

    /// Undiscounted sum of rewards.
    pub fn total_reward(&self) -> f64 { self.transitions.iter().map(|t| t.reward).sum() }
}

/// Sample an action for `state` from `policy`.
pub fn sample_action<R: Rng + ?Sized>(
    policy: &StochasticPolicy,
    state: Position,
    rng: &mut R,
) -> Result<Action> {
    policy.sample(state, rng)
}

/// Roll `policy` out from `start` until a terminal cell is entered.
///
/// Transitions are queried with `GridWorld::peek`, so the environment's own
/// agent never moves. `max_steps` ends the episode early and marks it
/// truncated.
pub fn generate_episode<R: Rng + ?Sized>(
    env: &GridWorld,
    policy: &StochasticPolicy,
    start: Position,
    max_steps: Option<usize>,
    rng: &mut R,
) -> Result<Episode> {
    let mut episode = Episode::default();
    let mut state = start;
    loop {
        if max_steps.is_some_and(|cap| episode.len() >= cap) {
            warn!("episode from {start} truncated after {} steps", episode.len());
            episode.truncated = true;
            break;
        }
        let action = sample_action(policy, state, rng)?;
        let obs = env.peek(state, action)?;
        episode.transitions.push(Transition { state, action, reward: obs.reward });
        if obs.is_terminal {
            break;
        }
        state = obs.position;
    }
    Ok(episode)
}
