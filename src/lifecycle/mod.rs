//! Lifecycle management for botlink components
//!
//! Unconfigured -> (configure) -> Inactive -> (activate) -> Active, back to
//! Inactive on deactivate, and Finalized after cleanup.

use crate::error::{Error, Result};

/// Components brought up and torn down in a fixed order
pub trait LifecycleNode: Send {
    /// Acquire resources; nothing moves yet
    fn on_configure(&mut self) -> Result<()>;

    fn on_activate(&mut self) -> Result<()>;

    /// Bring the robot to rest
    fn on_deactivate(&mut self) -> Result<()>;

    /// Release resources acquired in `on_configure`
    fn on_cleanup(&mut self) -> Result<()>;
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
    Finalized,
}

/// Name and state bookkeeping shared by lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

impl LifecycleNodeBase {
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Run `action` if the node is in `from`, then move it to `to`
    ///
    /// The state is left untouched when the node is elsewhere or `action`
    /// fails.
    pub fn transition<F>(&mut self, from: State, to: State, action: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.state != from {
            return Err(Error::Lifecycle(format!(
                "{}: cannot go to {:?} from {:?}",
                self.name, to, self.state
            )));
        }
        action()?;
        log::info!("{}: {:?} -> {:?}", self.name, from, to);
        self.state = to;
        Ok(())
    }
}
