pub mod rng;
pub mod render;

pub use rng::{RngStream, SeedSequence, rng_from_seed};
pub use render::{render_grid, render_policy, render_values};
