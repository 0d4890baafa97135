// Core traits and types shared by the grid world and the solvers.

use crate::envs::grid_world::Position;

/// A minimal info map (without pulling serde as a dependency).
/// It stores small numbers of key-value pairs attached to each step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Info {
    entries: Vec<(String, InfoValue)>,
}

impl Info {
    /// Create an empty Info map.
    pub fn new() -> Self { Self { entries: Vec::new() } }

    /// Insert or replace a key with the given value.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: InfoValue) {
        let k = key.into();
        if let Some((_, v)) = self.entries.iter_mut().find(|(kk, _)| kk == &k) {
            *v = value;
        } else {
            self.entries.push((k, value));
        }
    }

    /// Get a reference to a value by key.
    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn len(&self) -> usize { self.entries.len() }
}

/// Value types carried in info maps.
#[derive(Clone, Debug, PartialEq)]
pub enum InfoValue {
    I64(i64),
    F64(f64),
}

impl InfoValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InfoValue::F64(v) => Some(*v),
            InfoValue::I64(v) => Some(*v as f64),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            InfoValue::I64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for InfoValue { fn from(v: i64) -> Self { InfoValue::I64(v) } }
impl From<f64> for InfoValue { fn from(v: f64) -> Self { InfoValue::F64(v) } }

/// A frame returned by `Env::render`.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderFrame {
    /// Textual representation of a frame, one line per grid row.
    Text(String),
}

/// A step result from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Step<Obs> {
    pub observation: Obs,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

impl<Obs> Step<Obs> {
    pub fn new(observation: Obs, reward: f64, terminated: bool, truncated: bool, info: Info) -> Self {
        Self { observation, reward, terminated, truncated, info }
    }
}

/// Contract violations raised by the environment, the policy and the solvers.
///
/// None of these are recoverable inside a run: the current call is aborted and
/// the caller is expected to fix the environment or configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RlError {
    #[error("Invalid policy state at {position}: {reason}")]
    InvalidPolicyState { position: Position, reason: String },
    #[error("Position {position} is outside the {grid_size}x{grid_size} grid")]
    OutOfBoundsPosition { position: Position, grid_size: usize },
    #[error("No cell registered at {0}")]
    MissingCellDefinition(Position),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RlError {
    pub(crate) fn policy<S: Into<String>>(position: Position, reason: S) -> Self {
        RlError::InvalidPolicyState { position, reason: reason.into() }
    }
}

/// Convenience alias for results using RlError.
pub type Result<T> = std::result::Result<T, RlError>;

/// Core environment trait following the Gymnasium contract.
pub trait Env {
    type Obs;
    type Act;

    /// Reset the environment to its initial state.
    fn reset(&mut self, seed: Option<u64>) -> (Self::Obs, Info);

    /// Apply an action and advance the environment by one step.
    fn step(&mut self, action: Self::Act) -> Result<Step<Self::Obs>>;

    /// Render a frame of the current state, if supported.
    fn render(&self) -> Option<RenderFrame> { None }

    /// Close and release any external resources.
    fn close(&mut self) {}
}
