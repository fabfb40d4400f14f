//! Host link: inbound command decoding and the mailbox transport
pub mod command;
pub mod mailbox;

pub use command::{parse, MotionRequest, ParseError};
pub use mailbox::{FileMailbox, Mailbox, MemoryMailbox, TransportError};
