use std::fmt::Write;

use crate::envs::grid_world::{GridWorld, Position};
use crate::policy::StochasticPolicy;
use crate::tables::ValueTable;

/// The environment layout, one character per cell.
///
/// See [`GridWorld::render_text`] for the legend.
pub fn render_grid(env: &GridWorld) -> String { env.render_text() }

fn rows(env: &GridWorld) -> impl Iterator<Item = Vec<Position>> + '_ {
    let n = env.grid_size() as i32;
    (0..n).map(move |y| (0..n).map(|x| Position::new(x, y)).collect())
}

/// One glyph per state: the arrow of the policy's single action, `*` when
/// several actions carry probability, `T` for terminal and `#` for solid
/// cells. States without a policy entry show `?`.
pub fn render_policy(env: &GridWorld, policy: &StochasticPolicy) -> String {
    let mut out = String::new();
    for row in rows(env) {
        for pos in row {
            let glyph = match env.cell(pos) {
                Ok(c) if c.is_solid => '#',
                Ok(c) if c.is_terminal => 'T',
                Err(_) => '?',
                Ok(_) => {
                    let live: Vec<_> = policy
                        .actions(pos)
                        .map(|d| d.iter().filter(|&(_, &p)| p > 0.0).collect())
                        .unwrap_or_default();
                    match live.as_slice() {
                        [] => '?',
                        [(action, _)] => action.arrow(),
                        _ => '*',
                    }
                }
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

/// Values as a fixed-width grid with two decimals; solid or unknown states
/// print as `#`.
pub fn render_values(env: &GridWorld, values: &ValueTable) -> String {
    let mut out = String::new();
    for row in rows(env) {
        let cells: Vec<String> = row
            .into_iter()
            .map(|pos| match values.get(&pos) {
                Some(v) => format!("{v:>8.2}"),
                None => format!("{:>8}", "#"),
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::grid_world::Action;

    fn env() -> GridWorld {
        let mut env = GridWorld::new(2, Position::new(0, 0)).unwrap();
        env.register_target(Position::new(1, 1), 5.0).unwrap();
        env.register_solid(Position::new(1, 0)).unwrap();
        env.with_base_reward(-1.0)
    }

    #[test]
    fn policy_glyphs() {
        let env = env();
        let mut policy = StochasticPolicy::uniform(&env).unwrap();
        policy.set_deterministic(Position::new(0, 1), Action::Right);
        // (0,0) has a single legal action (Down) in the uniform policy.
        assert_eq!(render_policy(&env, &policy), "↓#\n→T\n");
        policy.set_uniform_over(Position::new(0, 1), &[Action::Up, Action::Right]).unwrap();
        assert_eq!(render_policy(&env, &policy), "↓#\n*T\n");
    }

    #[test]
    fn values_are_fixed_width() {
        let env = env();
        let values = ValueTable::from([
            (Position::new(0, 0), 3.5),
            (Position::new(0, 1), 4.0),
            (Position::new(1, 1), 0.0),
        ]);
        let text = render_values(&env, &values);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["    3.50        #", "    4.00     0.00"]);
    }

    #[test]
    fn grid_marks_agent() {
        assert_eq!(render_grid(&env()), "A#\n.T\n");
    }
}
