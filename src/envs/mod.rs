pub mod grid_world;

pub use grid_world::{Action, Cell, GridWorld, Observation, Position, DEFAULT_BASE_REWARD};
