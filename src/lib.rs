pub mod core;
pub mod spaces;
pub mod utils;
pub mod envs;
pub mod wrappers;
pub mod policy;
pub mod tables;
pub mod config;
pub mod algorithms;
pub mod agent;

pub use crate::core::{Env, Info, InfoValue, RenderFrame, Result, RlError, Step};
pub use crate::spaces::{ActionSpace, GridSpace, Space};
pub use crate::envs::{Action, Cell, GridWorld, Observation, Position, DEFAULT_BASE_REWARD};
pub use crate::wrappers::{RecordEpisodeStatistics, TimeLimit};
pub use crate::policy::{StochasticPolicy, PROBABILITY_TOLERANCE};
pub use crate::tables::{EpisodeStats, QTable, ValueTable, VisitCounts};
pub use crate::config::{
    DpConfig, Exploration, MonteCarloConfig, QLearningConfig, SarsaConfig, TdPredictionConfig,
};
pub use crate::algorithms::{run, run_seeded, AlgorithmKind, RunOutcome};
pub use crate::agent::{Agent, EpisodeSummary};
pub use crate::utils::{render_grid, render_policy, render_values, rng_from_seed, RngStream, SeedSequence};
