use gridworld_rl::agent::Agent;
use gridworld_rl::{
    AlgorithmKind, Cell, GridWorld, Position, RecordEpisodeStatistics, SeedSequence,
    StochasticPolicy, TimeLimit, render_grid, render_policy, render_values, run,
};

fn school() -> gridworld_rl::Result<GridWorld> {
    let mut env = GridWorld::new(8, Position::new(2, 2))?;
    env.register_target(Position::new(7, 7), 15.0)?;
    env.register(Cell::new(Position::new(3, 2), -15.0))?;
    for (x, y) in [(0, 1), (1, 5), (3, 3), (3, 7)] {
        env.register(Cell::new(Position::new(x, y), -8.0))?;
    }
    for (x, y) in [(1, 1), (2, 1), (3, 1)] {
        env.register_solid(Position::new(x, y))?;
    }
    Ok(env.with_base_reward(-1.0))
}

fn main() -> gridworld_rl::Result<()> {
    let env = school()?;
    println!("{}", render_grid(&env));

    let mut seeds = SeedSequence::new(7);
    for kind in AlgorithmKind::all_default() {
        let mut policy = StochasticPolicy::uniform(&env)?;
        let mut rng = seeds.next_rng();
        let outcome = run(&kind, &env, &mut policy, &mut rng)?;

        println!("== {} ==", kind.name());
        println!("{}", render_policy(&env, &policy));
        if let Some(values) = outcome.values() {
            println!("{}", render_values(&env, values));
        }
        if let Some(rewards) = outcome.episode_rewards() {
            let tail = &rewards[rewards.len().saturating_sub(10)..];
            let mean = tail.iter().sum::<f64>() / tail.len().max(1) as f64;
            println!("mean reward over last {} episodes: {mean:.2}", tail.len());
        }

        let mut agent = Agent::new(policy, env.start());
        let mut episode_env = RecordEpisodeStatistics::new(TimeLimit::new(env.clone(), 200));
        let summary = agent.run_episode(&mut episode_env, &mut rng)?;
        println!(
            "greedy rollout: {} steps, return {:.1}, reached target: {}\n",
            summary.steps, summary.total_reward, summary.terminated
        );
    }
    Ok(())
}
