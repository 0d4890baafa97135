use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::core::{Env, Info, InfoValue, RenderFrame, Result, RlError, Step};
use crate::spaces::{ActionSpace, GridSpace, Space};

/// Reward earned on entering a cell nothing else was registered at.
pub const DEFAULT_BASE_REWARD: f64 = -1.0;

/// A cell coordinate. Ordered x-major so tables iterate in sweep order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }

    /// Unclamped translation by an action vector.
    pub fn offset(self, action: Action) -> Position {
        let (dx, dy) = action.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Position) -> i64 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as i64
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self { Position::new(x, y) }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A unit move. Declaration order is the canonical order used for
/// first-encountered tie-breaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Left, Action::Right, Action::Up, Action::Down];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
            Action::Up => (0, -1),
            Action::Down => (0, 1),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Action::Left => "LEFT",
            Action::Right => "RIGHT",
            Action::Up => "UP",
            Action::Down => "DOWN",
        }
    }

    pub const fn arrow(self) -> char {
        match self {
            Action::Left => '←',
            Action::Right => '→',
            Action::Up => '↑',
            Action::Down => '↓',
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// One square of the grid.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub position: Position,
    /// Reward obtained by entering this cell.
    pub reward: f64,
    pub is_terminal: bool,
    /// Impassable; moving into it leaves the agent where it was.
    pub is_solid: bool,
}

impl Cell {
    pub fn new(position: Position, reward: f64) -> Self {
        Self { position, reward, is_terminal: false, is_solid: false }
    }

    pub fn terminal(position: Position, reward: f64) -> Self {
        Self { position, reward, is_terminal: true, is_solid: false }
    }

    pub fn solid(position: Position) -> Self {
        Self { position, reward: 0.0, is_terminal: false, is_solid: true }
    }
}

/// Result of a transition: where the agent ends up and what that cell pays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub position: Position,
    pub reward: f64,
    pub is_terminal: bool,
}

/// A square, deterministic grid world.
///
/// Transitions add the action vector to the state, clamp into the grid and
/// stay put when the destination is solid. Reward and termination come from
/// the cell the agent ends up in.
#[derive(Clone, Debug)]
pub struct GridWorld {
    space: GridSpace,
    cells: HashMap<Position, Cell>,
    /// Rewards as registered; `reset` restores them.
    registered_rewards: HashMap<Position, f64>,
    start: Position,
    agent: Position,
    target: Option<Position>,
}

impl GridWorld {
    /// An empty grid. Every position must be registered (or filled with
    /// `with_base_reward`) before a solver runs on it.
    pub fn new(grid_size: usize, start: Position) -> Result<Self> {
        if grid_size == 0 {
            return Err(RlError::InvalidConfig("grid_size must be > 0".into()));
        }
        let space = GridSpace::new(grid_size);
        if !space.contains(&start) {
            return Err(RlError::OutOfBoundsPosition { position: start, grid_size });
        }
        Ok(Self {
            space,
            cells: HashMap::new(),
            registered_rewards: HashMap::new(),
            start,
            agent: start,
            target: None,
        })
    }

    /// Fill every position without a cell with a plain cell paying `reward`.
    pub fn with_base_reward(mut self, reward: f64) -> Self {
        let missing: Vec<Position> =
            self.space.positions().filter(|p| !self.cells.contains_key(p)).collect();
        for pos in missing {
            self.insert(Cell::new(pos, reward));
        }
        self
    }

    /// Insert or overwrite the cell at `cell.position`.
    pub fn register(&mut self, cell: Cell) -> Result<()> {
        self.check_bounds(cell.position)?;
        if cell.is_solid && cell.is_terminal {
            return Err(RlError::InvalidConfig(format!(
                "cell at {} cannot be both solid and terminal",
                cell.position
            )));
        }
        if cell.is_solid && cell.position == self.start {
            return Err(RlError::InvalidConfig(format!(
                "start position {} cannot be solid",
                cell.position
            )));
        }
        if self.target == Some(cell.position) && !cell.is_terminal {
            self.target = None;
        }
        debug!(
            "register cell at {} (reward={}, terminal={}, solid={})",
            cell.position, cell.reward, cell.is_terminal, cell.is_solid
        );
        self.insert(cell);
        Ok(())
    }

    /// Register a terminal cell and remember it as the target.
    pub fn register_target(&mut self, position: Position, reward: f64) -> Result<()> {
        self.register(Cell::terminal(position, reward))?;
        self.target = Some(position);
        Ok(())
    }

    pub fn register_solid(&mut self, position: Position) -> Result<()> {
        self.register(Cell::solid(position))
    }

    /// Change a cell's reward at runtime. `reset` restores the registered value.
    pub fn set_reward(&mut self, position: Position, reward: f64) -> Result<()> {
        self.check_bounds(position)?;
        let cell = self
            .cells
            .get_mut(&position)
            .ok_or(RlError::MissingCellDefinition(position))?;
        cell.reward = reward;
        Ok(())
    }

    fn insert(&mut self, cell: Cell) {
        self.registered_rewards.insert(cell.position, cell.reward);
        self.cells.insert(cell.position, cell);
    }

    /// Check that the grid is complete and the start is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.space.positions().find(|p| !self.cells.contains_key(p)) {
            return Err(RlError::MissingCellDefinition(pos));
        }
        if self.cell(self.start)?.is_solid {
            return Err(RlError::InvalidConfig(format!("start position {} is solid", self.start)));
        }
        Ok(())
    }

    pub fn grid_size(&self) -> usize { self.space.size() }

    pub fn observation_space(&self) -> &GridSpace { &self.space }

    pub fn action_space(&self) -> ActionSpace { ActionSpace }

    /// The canonical start state of every episode.
    pub fn start(&self) -> Position { self.start }

    /// Current agent position (moved only by `advance` / `Env::step`).
    pub fn agent(&self) -> Position { self.agent }

    pub fn target(&self) -> Option<Position> { self.target }

    /// All positions, x-major.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ { self.space.positions() }

    fn check_bounds(&self, position: Position) -> Result<()> {
        if self.space.contains(&position) {
            Ok(())
        } else {
            Err(RlError::OutOfBoundsPosition { position, grid_size: self.space.size() })
        }
    }

    pub fn cell(&self, position: Position) -> Result<&Cell> {
        self.check_bounds(position)?;
        self.cells.get(&position).ok_or(RlError::MissingCellDefinition(position))
    }

    pub fn is_terminal(&self, position: Position) -> Result<bool> {
        Ok(self.cell(position)?.is_terminal)
    }

    pub fn is_solid(&self, position: Position) -> Result<bool> {
        Ok(self.cell(position)?.is_solid)
    }

    /// Actions, in canonical order, whose destination is inside the grid and
    /// not solid.
    pub fn legal_actions(&self, state: Position) -> Result<Vec<Action>> {
        self.check_bounds(state)?;
        let mut legal = Vec::with_capacity(Action::ALL.len());
        for action in Action::ALL {
            let dest = state.offset(action);
            if self.space.contains(&dest) && !self.cell(dest)?.is_solid {
                legal.push(action);
            }
        }
        Ok(legal)
    }

    /// The observation for standing on `state` without moving.
    pub fn observe(&self, state: Position) -> Result<Observation> {
        let cell = self.cell(state)?;
        Ok(Observation { position: state, reward: cell.reward, is_terminal: cell.is_terminal })
    }

    /// Pure transition query: where `action` from `state` leads. Does not move
    /// the agent.
    pub fn peek(&self, state: Position, action: Action) -> Result<Observation> {
        self.check_bounds(state)?;
        let dest = self.space.clamp(state.offset(action));
        let landed = if self.cell(dest)?.is_solid { state } else { dest };
        self.observe(landed)
    }

    /// Apply `action` from the current agent position and move the agent.
    pub fn advance(&mut self, action: Action) -> Result<Observation> {
        let obs = self.peek(self.agent, action)?;
        self.agent = obs.position;
        Ok(obs)
    }

    /// Restore the agent position and every registered reward.
    pub fn restore(&mut self) {
        self.agent = self.start;
        for (pos, reward) in &self.registered_rewards {
            if let Some(cell) = self.cells.get_mut(pos) {
                cell.reward = *reward;
            }
        }
    }

    fn info(&self) -> Info {
        let mut info = Info::new();
        if let Some(target) = self.target {
            info.insert("distance", InfoValue::from(self.agent.manhattan(target)));
        }
        info
    }

    /// One character per cell, rows top to bottom.
    pub fn render_text(&self) -> String {
        let base = self.space.positions().filter_map(|p| self.cells.get(&p)).map(|c| c.reward);
        let base = mode(base).unwrap_or(DEFAULT_BASE_REWARD);
        let n = self.space.size() as i32;
        let mut out = String::with_capacity((n as usize + 1) * n as usize);
        for y in 0..n {
            for x in 0..n {
                let pos = Position::new(x, y);
                let ch = match self.cells.get(&pos) {
                    _ if pos == self.agent => 'A',
                    None => '?',
                    Some(c) if c.is_solid => '#',
                    Some(c) if c.is_terminal => 'T',
                    Some(c) if c.reward > base => '+',
                    Some(c) if c.reward < base => '-',
                    Some(_) => '.',
                };
                out.push(ch);
            }
            out.push('\n');
        }
        out
    }
}

/// Most frequent reward, treated as the base reward when rendering.
fn mode(rewards: impl Iterator<Item = f64>) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for r in rewards {
        match counts.iter_mut().find(|(v, _)| *v == r) {
            Some((_, c)) => *c += 1,
            None => counts.push((r, 1)),
        }
    }
    counts.into_iter().max_by_key(|&(_, c)| c).map(|(v, _)| v)
}

impl Env for GridWorld {
    type Obs = Position;
    type Act = Action;

    fn reset(&mut self, _seed: Option<u64>) -> (Self::Obs, Info) {
        self.restore();
        (self.agent, self.info())
    }

    fn step(&mut self, action: Self::Act) -> Result<Step<Self::Obs>> {
        let obs = self.advance(action)?;
        Ok(Step::new(obs.position, obs.reward, obs.is_terminal, false, self.info()))
    }

    fn render(&self) -> Option<RenderFrame> { Some(RenderFrame::Text(self.render_text())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_by_three() -> GridWorld {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(2, 2), 10.0).unwrap();
        env.with_base_reward(-1.0)
    }

    #[test]
    fn edge_bump_clamps_and_pays_base_reward() {
        let env = three_by_three();
        let obs = env.peek(Position::new(0, 0), Action::Left).unwrap();
        assert_eq!(obs.position, Position::new(0, 0));
        assert_eq!(obs.reward, -1.0);
        assert!(!obs.is_terminal);

        let obs = env.peek(Position::new(2, 0), Action::Up).unwrap();
        assert_eq!(obs.position, Position::new(2, 0));
    }

    #[test]
    fn solid_cell_blocks_and_is_not_legal() {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_solid(Position::new(1, 0)).unwrap();
        let env = env.with_base_reward(-1.0);

        let obs = env.peek(Position::new(0, 0), Action::Right).unwrap();
        assert_eq!(obs.position, Position::new(0, 0));
        assert_eq!(env.legal_actions(Position::new(0, 0)).unwrap(), vec![Action::Down]);
        assert_eq!(
            env.legal_actions(Position::new(1, 1)).unwrap(),
            vec![Action::Left, Action::Right, Action::Down]
        );
    }

    #[test]
    fn peek_is_pure_and_advance_moves() {
        let mut env = three_by_three();
        let before = env.agent();
        let _ = env.peek(before, Action::Right).unwrap();
        assert_eq!(env.agent(), before);

        let obs = env.advance(Action::Right).unwrap();
        assert_eq!(obs.position, Position::new(1, 0));
        assert_eq!(env.agent(), Position::new(1, 0));
    }

    #[test]
    fn entering_target_terminates() {
        let env = three_by_three();
        let obs = env.peek(Position::new(2, 1), Action::Down).unwrap();
        assert_eq!(obs.position, Position::new(2, 2));
        assert_eq!(obs.reward, 10.0);
        assert!(obs.is_terminal);
    }

    #[test]
    fn reset_restores_agent_and_rewards() {
        let mut env = three_by_three();
        env.set_reward(Position::new(1, 1), 5.0).unwrap();
        env.step(Action::Down).unwrap();
        let (obs, info) = env.reset(None);
        assert_eq!(obs, Position::new(0, 0));
        assert_eq!(env.cell(Position::new(1, 1)).unwrap().reward, -1.0);
        assert_eq!(info.get("distance"), Some(&InfoValue::I64(4)));
    }

    #[test]
    fn incomplete_grid_reports_missing_cell() {
        let env = GridWorld::new(2, Position::new(0, 0)).unwrap();
        assert_eq!(
            env.validate(),
            Err(RlError::MissingCellDefinition(Position::new(0, 0)))
        );
        assert!(matches!(
            env.peek(Position::new(0, 0), Action::Right),
            Err(RlError::MissingCellDefinition(_))
        ));
    }

    #[test]
    fn out_of_bounds_queries_are_rejected() {
        let env = three_by_three();
        let err = env.peek(Position::new(3, 0), Action::Left).unwrap_err();
        assert!(matches!(err, RlError::OutOfBoundsPosition { grid_size: 3, .. }));
        assert!(GridWorld::new(3, Position::new(-1, 0)).is_err());
    }

    #[test]
    fn solid_start_is_rejected() {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        assert!(matches!(
            env.register_solid(Position::new(0, 0)),
            Err(RlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn render_marks_cells() {
        let mut env = GridWorld::new(3, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(2, 2), 10.0).unwrap();
        env.register_solid(Position::new(1, 1)).unwrap();
        env.register(Cell::new(Position::new(2, 0), -8.0)).unwrap();
        let env = env.with_base_reward(-1.0);
        assert_eq!(env.render_text(), "A.-\n.#.\n..T\n");
        assert!(matches!(env.render(), Some(RenderFrame::Text(_))));
    }
}
