//! Remote motion control for a differential-drive robot
//!
//! A host posts short text commands (`Move <angle> <distance> <power>`) into a
//! mailbox; the robot turns, then drives, and reports its state back every
//! control cycle.

pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod lifecycle;
pub mod link;
pub mod node;
pub mod perception;

pub use crate::config::BotlinkConfig;
pub use crate::error::{Error, Result};
pub use crate::node::RemoteControlNode;
