//! botlink node daemon
//!
//! Polls the inbox file for motion commands, drives the robot, and rewrites
//! the outbox report every control cycle until Ctrl-C.

use anyhow::{Context, Result};
use botlink_core::drivers::SimulatedRobot;
use botlink_core::link::FileMailbox;
use botlink_core::{BotlinkConfig, RemoteControlNode};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML parameter file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the inbox file from the configuration
    #[arg(long)]
    inbox: Option<PathBuf>,

    /// Override the outbox name from the configuration
    #[arg(long)]
    outbox: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BotlinkConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BotlinkConfig::default(),
    };
    if let Some(inbox) = args.inbox {
        config.link.inbox = inbox;
    }
    if let Some(outbox) = args.outbox {
        config.link.outbox = outbox;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    info!("botlink node v{} starting...", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => info!("Using config: {}", path.display()),
        None => info!("Using built-in defaults"),
    }
    info!(
        "Geometry: wheel circumference {} cm, track width {} cm",
        config.geometry.wheel_circumference_cm, config.geometry.track_width_cm
    );
    info!("Turn policy: {:?}", config.motion.turn_policy);

    let driver = Arc::new(SimulatedRobot::new(&config.geometry, &config.simulation));
    let mailbox = FileMailbox::new(
        &config.link.inbox,
        &config.link.outbox,
        config.link.max_message_len,
    );
    info!(
        "Mailbox: inbox {}, outbox {}",
        mailbox.inbox_path().display(),
        mailbox.outbox_path().display()
    );

    let mut node = RemoteControlNode::new(driver, mailbox, &config);
    node.start().context("starting node")?;

    let run = node
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;

    // Close the mailbox even when the loop died on a driver failure.
    let shutdown = node.shutdown().await;
    run.context("control loop failed")?;
    shutdown.context("shutting down node")?;

    info!("botlink node stopped");
    Ok(())
}
