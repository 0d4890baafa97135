//! Hyperparameters for every solver, with the defaults each algorithm ships with.

use crate::core::{Result, RlError};

/// How the exploration rate evolves across the episodes of one run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exploration {
    /// The same ε for every episode.
    Constant(f64),
    /// `ε_n = 1 / (1 + n·modifier)` for episode index `n`.
    Decaying { modifier: f64 },
}

impl Exploration {
    /// ε for episode `episode` (0-based).
    pub fn epsilon(&self, episode: usize) -> f64 {
        match *self {
            Exploration::Constant(eps) => eps,
            Exploration::Decaying { modifier } => 1.0 / (1.0 + episode as f64 * modifier),
        }
    }

    /// True when some episode would run with ε = 0.
    pub fn reaches_zero(&self) -> bool { matches!(*self, Exploration::Constant(eps) if eps == 0.0) }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Exploration::Constant(eps) if !(0.0..=1.0).contains(&eps) => {
                Err(RlError::InvalidConfig(format!("epsilon must be in [0, 1], got {eps}")))
            }
            Exploration::Decaying { modifier } if !(modifier >= 0.0 && modifier.is_finite()) => {
                Err(RlError::InvalidConfig(format!(
                    "epsilon decay modifier must be finite and >= 0, got {modifier}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for Exploration {
    fn default() -> Self { Exploration::Decaying { modifier: 1.0 } }
}

fn check_gamma(gamma: f64) -> Result<()> {
    if (0.0..1.0).contains(&gamma) {
        Ok(())
    } else {
        Err(RlError::InvalidConfig(format!("gamma must be in [0, 1), got {gamma}")))
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(RlError::InvalidConfig(format!("alpha must be in (0, 1], got {alpha}")))
    }
}

fn check_episode_cap(cap: Option<usize>) -> Result<()> {
    match cap {
        Some(0) => Err(RlError::InvalidConfig("max_episode_steps must be > 0".into())),
        _ => Ok(()),
    }
}

/// Policy Iteration and Value Iteration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpConfig {
    pub gamma: f64,
    /// Convergence threshold on the largest per-sweep value change.
    pub theta: f64,
    /// Upper bound on improvement rounds (Policy Iteration) or sweeps
    /// (Value Iteration, and each policy evaluation).
    pub max_iterations: usize,
}

impl Default for DpConfig {
    fn default() -> Self { Self { gamma: 0.8, theta: 0.001, max_iterations: 1000 } }
}

impl DpConfig {
    pub fn validate(&self) -> Result<()> {
        check_gamma(self.gamma)?;
        if !(self.theta > 0.0) {
            return Err(RlError::InvalidConfig(format!("theta must be > 0, got {}", self.theta)));
        }
        if self.max_iterations == 0 {
            return Err(RlError::InvalidConfig("max_iterations must be > 0".into()));
        }
        Ok(())
    }
}

/// Monte Carlo Control and Monte Carlo Prediction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonteCarloConfig {
    pub gamma: f64,
    pub num_episodes: usize,
    /// Ignored by prediction, which never changes the policy.
    pub exploration: Exploration,
    pub max_episode_steps: Option<usize>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            num_episodes: 200,
            exploration: Exploration::Decaying { modifier: 1.0 },
            max_episode_steps: None,
        }
    }
}

impl MonteCarloConfig {
    /// Defaults used for first-visit prediction.
    pub fn prediction() -> Self { Self { gamma: 0.9, num_episodes: 100, ..Self::default() } }

    pub fn validate(&self) -> Result<()> {
        check_gamma(self.gamma)?;
        self.exploration.validate()?;
        check_episode_cap(self.max_episode_steps)
    }

    /// [`validate`](Self::validate) plus the rule for control: a greedy
    /// policy rolled out without a step cap can cycle forever, so ε = 0 needs
    /// `max_episode_steps`.
    pub fn validate_control(&self) -> Result<()> {
        self.validate()?;
        if self.max_episode_steps.is_none() && self.exploration.reaches_zero() {
            return Err(RlError::InvalidConfig(
                "monte carlo control with epsilon 0 needs max_episode_steps".into(),
            ));
        }
        Ok(())
    }
}

/// TD(0) prediction of state values under a fixed policy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TdPredictionConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub num_episodes: usize,
    pub max_episode_steps: Option<usize>,
}

impl Default for TdPredictionConfig {
    fn default() -> Self { Self { alpha: 1.0, gamma: 0.8, num_episodes: 100, max_episode_steps: None } }
}

impl TdPredictionConfig {
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        check_gamma(self.gamma)?;
        check_episode_cap(self.max_episode_steps)
    }
}

/// SARSA over state values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SarsaConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub exploration: Exploration,
    pub num_episodes: usize,
    pub max_episode_steps: Option<usize>,
}

impl Default for SarsaConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.95,
            exploration: Exploration::Constant(0.05),
            num_episodes: 100,
            max_episode_steps: None,
        }
    }
}

impl SarsaConfig {
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        check_gamma(self.gamma)?;
        self.exploration.validate()?;
        check_episode_cap(self.max_episode_steps)
    }
}

/// Off-policy Q-Learning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QLearningConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub exploration: Exploration,
    pub num_episodes: usize,
    pub max_episode_steps: Option<usize>,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.95,
            exploration: Exploration::Decaying { modifier: 1.0 },
            num_episodes: 100,
            max_episode_steps: None,
        }
    }
}

impl QLearningConfig {
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        check_gamma(self.gamma)?;
        self.exploration.validate()?;
        check_episode_cap(self.max_episode_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decaying_epsilon_is_monotone() {
        let e = Exploration::default();
        assert_eq!(e.epsilon(0), 1.0);
        assert_eq!(e.epsilon(1), 0.5);
        let slow = Exploration::Decaying { modifier: 0.25 };
        assert_eq!(slow.epsilon(4), 0.5);
        for n in 0..100 {
            assert!(slow.epsilon(n + 1) < slow.epsilon(n));
        }
        assert_eq!(Exploration::Constant(0.05).epsilon(1000), 0.05);
    }

    #[test]
    fn defaults_validate() {
        DpConfig::default().validate().unwrap();
        MonteCarloConfig::default().validate().unwrap();
        MonteCarloConfig::prediction().validate().unwrap();
        MonteCarloConfig::default().validate_control().unwrap();
        TdPredictionConfig::default().validate().unwrap();
        SarsaConfig::default().validate().unwrap();
        QLearningConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let dp = DpConfig { gamma: 1.0, ..DpConfig::default() };
        assert!(matches!(dp.validate(), Err(RlError::InvalidConfig(_))));
        let dp = DpConfig { theta: 0.0, ..DpConfig::default() };
        assert!(dp.validate().is_err());
        let sarsa = SarsaConfig { alpha: 0.0, ..SarsaConfig::default() };
        assert!(sarsa.validate().is_err());
        let q = QLearningConfig { exploration: Exploration::Constant(1.5), ..QLearningConfig::default() };
        assert!(q.validate().is_err());
        let mc = MonteCarloConfig { max_episode_steps: Some(0), ..MonteCarloConfig::default() };
        assert!(mc.validate().is_err());
        let mc = MonteCarloConfig {
            exploration: Exploration::Decaying { modifier: -1.0 },
            ..MonteCarloConfig::default()
        };
        assert!(mc.validate().is_err());
    }

    #[test]
    fn greedy_control_needs_a_step_cap() {
        let greedy = MonteCarloConfig { exploration: Exploration::Constant(0.0), ..MonteCarloConfig::default() };
        greedy.validate().unwrap();
        assert!(matches!(greedy.validate_control(), Err(RlError::InvalidConfig(_))));

        let capped = MonteCarloConfig { max_episode_steps: Some(200), ..greedy };
        capped.validate_control().unwrap();

        assert!(!Exploration::Decaying { modifier: 1.0 }.reaches_zero());
        assert!(!Exploration::Constant(0.01).reaches_zero());
    }
}
