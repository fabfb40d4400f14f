use anyhow::Result;
use botlink_core::drivers::SimulatedRobot;
use botlink_core::link::MemoryMailbox;
use botlink_core::{BotlinkConfig, RemoteControlNode};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on cycles spent waiting for one maneuver
const MAX_CYCLES_PER_COMMAND: usize = 200;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Testing botlink core against the simulator");

    let mut config = BotlinkConfig::default();
    config.link.cycle_period_ms = 20;
    config.simulation.time_scale = 10.0;

    let robot = Arc::new(SimulatedRobot::new(&config.geometry, &config.simulation));
    let host = MemoryMailbox::new();
    let mut node = RemoteControlNode::new(robot.clone(), host.clone(), &config);
    node.start()?;
    let state = node.state();

    let script = [
        "Move 0 17.6 50",
        "Move 90 0 40",
        "Move -45 -10 30",
        "Mve 1 2 3",
        "Move 0 0 50",
    ];

    let mut ticker = tokio::time::interval(Duration::from_millis(config.link.cycle_period_ms));
    for command in script {
        println!("Host -> robot: {}", command);
        host.post(command);

        // One cycle to pick the command up, then wait for the robot to be ready.
        ticker.tick().await;
        node.cycle().await?;
        for _ in 0..MAX_CYCLES_PER_COMMAND {
            if state.is_ready() {
                break;
            }
            ticker.tick().await;
            node.cycle().await?;
        }
        ticker.tick().await;
        node.cycle().await?;

        println!(
            "Robot -> host: {}",
            host.latest_report().unwrap_or_default()
        );
    }

    println!("Motor commands issued: {}", robot.command_log().len());
    node.shutdown().await?;
    println!("Node shut down");
    Ok(())
}
