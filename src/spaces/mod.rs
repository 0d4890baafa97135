//! Observation and action spaces of the grid world.

pub mod space;
pub mod interop;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::envs::grid_world::{Action, Position};

pub use space::Space;

/// The square set of positions `[0, size)²`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpace {
    size: usize,
}

impl GridSpace {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "GridSpace requires size > 0");
        Self { size }
    }

    pub fn size(&self) -> usize { self.size }

    /// Number of positions in the space.
    pub fn len(&self) -> usize { self.size * self.size }

    pub fn is_empty(&self) -> bool { self.size == 0 }

    /// Clamp each coordinate into `[0, size - 1]`.
    pub fn clamp(&self, pos: Position) -> Position {
        let hi = self.size as i32 - 1;
        Position::new(pos.x.clamp(0, hi), pos.y.clamp(0, hi))
    }

    /// All positions, x-major, in the order solvers sweep them.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let n = self.size as i32;
        (0..n).flat_map(move |x| (0..n).map(move |y| Position::new(x, y)))
    }
}

impl Space for GridSpace {
    type Element = Position;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        let dist = Uniform::from(0..self.size as i32);
        Position::new(dist.sample(rng), dist.sample(rng))
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        let n = self.size as i32;
        (0..n).contains(&elem.x) && (0..n).contains(&elem.y)
    }
}

/// The four unit moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionSpace;

impl ActionSpace {
    pub fn n(&self) -> usize { Action::ALL.len() }
}

impl Space for ActionSpace {
    type Element = Action;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        let dist = Uniform::from(0..Action::ALL.len());
        Action::ALL[dist.sample(rng)]
    }

    fn contains(&self, _elem: &Self::Element) -> bool { true }
}
