//! Remote control node: the fixed-period loop between host and robot
//!
//! Every cycle takes at most one message from the mailbox, hands a parsed
//! request to the scheduler and writes a fresh telemetry report back.

use crate::behaviors::{CommandScheduler, SubmitOutcome};
use crate::common::units::UnitConverter;
use crate::config::BotlinkConfig;
use crate::control::{ControllerState, MotionController};
use crate::drivers::RobotDriver;
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::link::{parse, Mailbox};
use crate::perception::{TelemetryReport, TelemetrySampler};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

/// Couples a mailbox, a driver and the motion stack into one control loop
pub struct RemoteControlNode<M: Mailbox> {
    base: LifecycleNodeBase,
    driver: Arc<dyn RobotDriver>,
    mailbox: M,
    state: Arc<ControllerState>,
    scheduler: CommandScheduler,
    sampler: TelemetrySampler,
    cycle_period: Duration,
}

impl<M: Mailbox> RemoteControlNode<M> {
    /// Build the node and its motion stack
    pub fn new(driver: Arc<dyn RobotDriver>, mailbox: M, config: &BotlinkConfig) -> Self {
        let state = Arc::new(ControllerState::new());
        let controller = Arc::new(MotionController::new(Arc::clone(&driver), config));
        let converter = UnitConverter::from_geometry(&config.geometry);

        RemoteControlNode {
            base: LifecycleNodeBase::new("remote_control_node"),
            scheduler: CommandScheduler::new(controller, Arc::clone(&state)),
            sampler: TelemetrySampler::new(Arc::clone(&driver), Arc::clone(&state), converter),
            driver,
            mailbox,
            state,
            cycle_period: config.link.cycle_period(),
        }
    }

    /// Shared controller state, e.g. for watching `ready` from outside
    pub fn state(&self) -> Arc<ControllerState> {
        Arc::clone(&self.state)
    }

    pub fn lifecycle_state(&self) -> State {
        self.base.state()
    }

    /// Run one control cycle
    ///
    /// Malformed commands and mailbox failures are logged and skipped. Only
    /// driver failures are returned.
    pub async fn cycle(&mut self) -> Result<Option<TelemetryReport>> {
        // Reap first so a finished maneuver's failure is seen before new work.
        self.scheduler.poll_finished().await?;

        let raw = match self.mailbox.receive() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Mailbox receive failed: {}", e);
                String::new()
            }
        };

        match parse(&raw) {
            Ok(Some(request)) => {
                if self.scheduler.submit(request).await? == SubmitOutcome::Dropped {
                    warn!("Robot busy, dropped '{}'", request);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Dropping message '{}': {}", raw.trim_end_matches('\0'), e),
        }

        let report = self.sampler.sample()?;
        match self.mailbox.send(&report.to_string()) {
            Ok(()) => {
                debug!("Report: {}", report);
                Ok(Some(report))
            }
            Err(e) => {
                warn!("Mailbox send failed, report skipped: {}", e);
                Ok(None)
            }
        }
    }

    /// Cycle at the configured period until `shutdown` resolves or a cycle fails
    ///
    /// A cycle that overruns delays the following ticks instead of bursting.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.cycle_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "{}: control loop running every {:?}",
            self.base.name, self.cycle_period
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("{}: shutdown requested", self.base.name);
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.cycle().await?;
                }
            }
        }
    }

    /// Bring the node from unconfigured to active
    pub fn start(&mut self) -> Result<()> {
        self.on_configure()?;
        self.on_activate()
    }

    /// Wait for the in-flight maneuver, then deactivate and clean up
    ///
    /// This is the way to stop a node that may be busy: `on_deactivate`
    /// alone refuses while a maneuver runs. The maneuver's own failure, if any, is returned after the mailbox has
    /// been closed.
    pub async fn shutdown(&mut self) -> Result<()> {
        let maneuver = self.scheduler.join().await;
        if self.base.state() == State::Active {
            self.on_deactivate()?;
        }
        if self.base.state() == State::Inactive {
            self.on_cleanup()?;
        }
        maneuver
    }
}

impl<M: Mailbox> LifecycleNode for RemoteControlNode<M> {
    fn on_configure(&mut self) -> Result<()> {
        let mailbox = &mut self.mailbox;
        let driver = &self.driver;
        let state = &self.state;
        self.base
            .transition(State::Unconfigured, State::Inactive, || {
                mailbox.open()?;
                let reset = driver
                    .reset_encoders()
                    .and_then(|()| driver.reset_heading());
                if let Err(e) = reset {
                    if let Err(close) = mailbox.close() {
                        warn!("Closing mailbox after failed configure: {}", close);
                    }
                    return Err(e.into());
                }
                state.set_current_heading(0.0);
                Ok(())
            })
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.transition(State::Inactive, State::Active, || Ok(()))
    }

    fn on_deactivate(&mut self) -> Result<()> {
        let driver = &self.driver;
        let state = &self.state;
        self.base.transition(State::Active, State::Inactive, || {
            // Never blocks: callers join the maneuver first, see `shutdown`.
            if !state.is_ready() {
                return Err(Error::Lifecycle(
                    "cannot deactivate while a maneuver is running".to_string(),
                ));
            }
            driver.drive_differential(0.0, 0.0)?;
            Ok(())
        })
    }

    fn on_cleanup(&mut self) -> Result<()> {
        let mailbox = &mut self.mailbox;
        self.base.transition(State::Inactive, State::Finalized, || {
            mailbox.close()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{DriverError, MockRobotDriver};
    use crate::link::MemoryMailbox;

    fn idle_driver() -> MockRobotDriver {
        let mut driver = MockRobotDriver::new();
        driver.expect_reset_encoders().returning(|| Ok(()));
        driver.expect_reset_heading().returning(|| Ok(()));
        driver.expect_read_heading().returning(|| Ok(0.0));
        driver.expect_read_encoder().returning(|_| Ok(0));
        driver.expect_read_range().returning(|| Ok(100.0));
        driver
    }

    fn node_with(driver: MockRobotDriver) -> (RemoteControlNode<MemoryMailbox>, MemoryMailbox) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mailbox = MemoryMailbox::new();
        let node = RemoteControlNode::new(Arc::new(driver), mailbox.clone(), &BotlinkConfig::default());
        (node, mailbox)
    }

    #[tokio::test]
    async fn test_idle_cycle_reports() {
        let (mut node, mailbox) = node_with(idle_driver());
        node.start().unwrap();

        let report = node.cycle().await.unwrap().unwrap();
        assert!(report.ready);
        assert_eq!(mailbox.latest_report().as_deref(), Some("1 0.0 0.0 100.0"));
    }

    #[tokio::test]
    async fn test_malformed_message_is_dropped() {
        // No drive expectations: any motor command would panic.
        let (mut node, mailbox) = node_with(idle_driver());
        node.start().unwrap();

        for raw in ["Mve 1 2 3", "Move abc 2 3", "Move 1 2"] {
            mailbox.post(raw);
            let report = node.cycle().await.unwrap().unwrap();
            assert!(report.ready);
        }
        assert_eq!(mailbox.reports_sent(), 3);
    }

    #[tokio::test]
    async fn test_receive_failure_keeps_reporting() {
        let (mut node, mailbox) = node_with(idle_driver());
        // Never opened: receive and send fail with Closed, the cycle still succeeds.
        mailbox.post("Move 0 10 50");
        assert_eq!(node.cycle().await.unwrap(), None);
        assert_eq!(mailbox.reports_sent(), 0);
    }

    #[tokio::test]
    async fn test_sensor_failure_stops_the_cycle() {
        let mut driver = MockRobotDriver::new();
        driver.expect_reset_encoders().returning(|| Ok(()));
        driver.expect_reset_heading().returning(|| Ok(()));
        driver
            .expect_read_heading()
            .returning(|| Err(DriverError::Disconnected));
        let (mut node, _mailbox) = node_with(driver);
        node.start().unwrap();

        let result = node.cycle().await;
        assert!(matches!(result, Err(Error::Driver(DriverError::Disconnected))));
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let mut driver = idle_driver();
        driver
            .expect_drive_differential()
            .withf(|left, right| *left == 0.0 && *right == 0.0)
            .times(1)
            .returning(|_, _| Ok(()));
        let (mut node, mailbox) = node_with(driver);

        assert!(node.on_activate().is_err());
        node.start().unwrap();
        assert!(mailbox.is_open());
        assert_eq!(node.lifecycle_state(), State::Active);

        node.shutdown().await.unwrap();
        assert_eq!(node.lifecycle_state(), State::Finalized);
        assert!(!mailbox.is_open());
    }

    #[tokio::test]
    async fn test_failed_reset_closes_the_mailbox() {
        let mut driver = MockRobotDriver::new();
        driver
            .expect_reset_encoders()
            .returning(|| Err(DriverError::Disconnected));
        let (mut node, mailbox) = node_with(driver);

        let result = node.start();
        assert!(matches!(result, Err(Error::Driver(DriverError::Disconnected))));
        assert!(!mailbox.is_open());
        assert_eq!(node.lifecycle_state(), State::Unconfigured);
    }

    #[tokio::test]
    async fn test_failed_heading_reset_closes_the_mailbox() {
        let mut driver = MockRobotDriver::new();
        driver.expect_reset_encoders().returning(|| Ok(()));
        driver
            .expect_reset_heading()
            .returning(|| Err(DriverError::Disconnected));
        let (mut node, mailbox) = node_with(driver);

        assert!(node.on_configure().is_err());
        assert!(!mailbox.is_open());
        assert_eq!(node.lifecycle_state(), State::Unconfigured);
    }

    #[tokio::test]
    async fn test_deactivate_refuses_while_busy() {
        let mut driver = idle_driver();
        driver
            .expect_drive_differential()
            .withf(|left, right| *left == 0.0 && *right == 0.0)
            .times(1)
            .returning(|_, _| Ok(()));
        let (mut node, _mailbox) = node_with(driver);
        node.start().unwrap();

        let state = node.state();
        assert!(state.try_claim());
        assert!(matches!(node.on_deactivate(), Err(Error::Lifecycle(_))));
        assert_eq!(node.lifecycle_state(), State::Active);

        state.set_ready(true);
        node.on_deactivate().unwrap();
        assert_eq!(node.lifecycle_state(), State::Inactive);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let (mut node, mailbox) = node_with(idle_driver());
        node.start().unwrap();

        node.run_until(time::sleep(Duration::from_millis(250)))
            .await
            .unwrap();
        assert!(mailbox.reports_sent() >= 2);
    }
}
