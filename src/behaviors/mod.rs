//! Command scheduling: at most one maneuver in flight
//!
//! The control loop must keep reporting while a maneuver runs, so accepted
//! requests execute on tokio's blocking pool and the loop only polls for
//! completion.

use crate::control::{ControllerState, MotionController};
use crate::error::{Error, Result};
use crate::link::MotionRequest;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What happened to a submitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The request started executing
    Accepted,
    /// A maneuver was already running; the request was discarded
    Dropped,
}

/// Runs motion requests one at a time in the background
pub struct CommandScheduler {
    controller: Arc<MotionController>,
    state: Arc<ControllerState>,
    active: Option<JoinHandle<Result<()>>>,
}

impl CommandScheduler {
    /// Create a scheduler around a shared controller and state
    pub fn new(controller: Arc<MotionController>, state: Arc<ControllerState>) -> Self {
        CommandScheduler {
            controller,
            state,
            active: None,
        }
    }

    /// Start `request` if the robot is ready, otherwise drop it
    ///
    /// A previous maneuver that finished but was not reaped yet is joined
    /// first, so its failure is never lost. Must be called from within a
    /// tokio runtime.
    pub async fn submit(&mut self, request: MotionRequest) -> Result<SubmitOutcome> {
        if !self.state.try_claim() {
            debug!("Busy, dropping '{}'", request);
            return Ok(SubmitOutcome::Dropped);
        }

        if let Err(e) = self.join().await {
            self.state.set_ready(true);
            return Err(e);
        }

        info!("Accepted '{}'", request);
        let controller = Arc::clone(&self.controller);
        let state = Arc::clone(&self.state);
        self.active = Some(tokio::task::spawn_blocking(move || {
            controller.execute(&request, &state)
        }));
        Ok(SubmitOutcome::Accepted)
    }

    /// True while a maneuver task has not been reaped
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Reap a finished maneuver without waiting
    ///
    /// Returns the maneuver's error if it failed. Ok when nothing finished.
    pub async fn poll_finished(&mut self) -> Result<()> {
        let finished = self
            .active
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if finished {
            self.join().await
        } else {
            Ok(())
        }
    }

    /// Wait for the current maneuver, if any, to finish
    pub async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.active.take() else {
            return Ok(());
        };

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Maneuver failed: {}", e);
                Err(e)
            }
            Err(e) => {
                // A task cancelled before it started never released the flag.
                self.state.set_ready(true);
                Err(Error::Task(e))
            }
        }
    }
}
