//! Mailbox transport between host and robot
//!
//! A mailbox carries at most one message per poll in each direction. Reading
//! never blocks and yields `""` when nothing is pending. Writing replaces the
//! previous outbound message, so the host only ever sees the latest report.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Suffix of the outbox file the host polls
pub const OUTBOX_EXTENSION: &str = "rtf";

/// Transport failures; the control loop treats them as "no message"
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error on the underlying medium
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mailbox was used before `open` or after `close`
    #[error("mailbox is closed")]
    Closed,
}

/// Single-slot bidirectional message channel
pub trait Mailbox: Send {
    /// Prepare the mailbox for use
    fn open(&mut self) -> Result<(), TransportError>;

    /// Take the pending inbound message, or `""` if there is none
    fn receive(&mut self) -> Result<String, TransportError>;

    /// Replace the outbound message
    fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Release the mailbox; calling it again is a no-op
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Cut `message` to at most `max_len` bytes on a character boundary
pub fn truncate_message(message: &str, max_len: usize) -> &str {
    if message.len() <= max_len {
        return message;
    }
    let mut end = max_len;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

/// In-memory mailbox shared between the robot side and a test or demo host
#[derive(Clone, Default)]
pub struct MemoryMailbox {
    inner: Arc<Mutex<MemoryMailboxInner>>,
}

#[derive(Default)]
struct MemoryMailboxInner {
    open: bool,
    inbox: Option<String>,
    outbox: Option<String>,
    reports_sent: usize,
}

impl MemoryMailbox {
    /// Create a closed, empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Host side: post a command, replacing any unread one
    pub fn post(&self, message: &str) {
        self.lock().inbox = Some(message.to_string());
    }

    /// Host side: the most recent report written by the robot
    pub fn latest_report(&self) -> Option<String> {
        self.lock().outbox.clone()
    }

    /// Number of reports written since creation
    pub fn reports_sent(&self) -> usize {
        self.lock().reports_sent
    }

    /// Whether the robot side currently has the mailbox open
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    fn lock(&self) -> MutexGuard<'_, MemoryMailboxInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Mailbox for MemoryMailbox {
    fn open(&mut self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.open = true;
        inner.outbox = Some(String::new());
        Ok(())
    }

    fn receive(&mut self) -> Result<String, TransportError> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::Closed);
        }
        Ok(inner.inbox.take().unwrap_or_default())
    }

    fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(TransportError::Closed);
        }
        inner.outbox = Some(message.to_string());
        inner.reports_sent += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.lock().open = false;
        Ok(())
    }
}

/// File-backed mailbox
///
/// The host writes a command into the inbox file; the robot consumes it by
/// reading and truncating the file. Reports are written to `<outbox>.rtf`,
/// rewritten in full on every send.
#[derive(Debug)]
pub struct FileMailbox {
    inbox: PathBuf,
    outbox: PathBuf,
    max_message_len: usize,
    open: bool,
}

impl FileMailbox {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(inbox: P, outbox: Q, max_message_len: usize) -> Self {
        FileMailbox {
            inbox: inbox.as_ref().to_path_buf(),
            outbox: outbox.as_ref().with_extension(OUTBOX_EXTENSION),
            max_message_len,
            open: false,
        }
    }

    /// Path of the file the reports are written to
    pub fn outbox_path(&self) -> &Path {
        &self.outbox
    }

    /// Path of the file commands are read from
    pub fn inbox_path(&self) -> &Path {
        &self.inbox
    }
}

impl Mailbox for FileMailbox {
    fn open(&mut self) -> Result<(), TransportError> {
        fs::write(&self.outbox, "")?;
        self.open = true;
        log::debug!(
            "Mailbox open: inbox={}, outbox={}",
            self.inbox.display(),
            self.outbox.display()
        );
        Ok(())
    }

    fn receive(&mut self) -> Result<String, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }

        let mut file = match OpenOptions::new().read(true).write(true).open(&self.inbox) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Ok(String::new());
        }
        file.set_len(0)?;

        let text = String::from_utf8_lossy(&bytes);
        let message = text.trim_end_matches(|c: char| c == '\0' || c == '\n' || c == '\r');
        Ok(truncate_message(message, self.max_message_len).to_string())
    }

    fn send(&mut self, message: &str) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        fs::write(&self.outbox, message)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_mailbox_single_slot() {
        let host = MemoryMailbox::new();
        let mut robot = host.clone();
        robot.open().unwrap();

        assert_eq!(robot.receive().unwrap(), "");
        host.post("Move 0 10 30");
        host.post("Move 0 20 30");
        assert_eq!(robot.receive().unwrap(), "Move 0 20 30");
        assert_eq!(robot.receive().unwrap(), "");

        robot.send("1 0.0 0.0 150.0").unwrap();
        robot.send("0 1.0 0.0 150.0").unwrap();
        assert_eq!(host.latest_report().as_deref(), Some("0 1.0 0.0 150.0"));
        assert_eq!(host.reports_sent(), 2);
    }

    #[test]
    fn test_memory_mailbox_close_is_idempotent() {
        let mut mailbox = MemoryMailbox::new();
        assert!(matches!(mailbox.receive(), Err(TransportError::Closed)));
        mailbox.close().unwrap();
        mailbox.open().unwrap();
        mailbox.close().unwrap();
        mailbox.close().unwrap();
        assert!(!mailbox.is_open());
    }

    #[test]
    fn test_file_mailbox_consumes_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("EV3_INBOX0");
        let mut mailbox = FileMailbox::new(&inbox, dir.path().join("EV3_OUTBOX0"), 32);
        mailbox.open().unwrap();

        // Nothing written yet
        assert_eq!(mailbox.receive().unwrap(), "");

        fs::write(&inbox, "Move 0 17.6 50\0").unwrap();
        assert_eq!(mailbox.receive().unwrap(), "Move 0 17.6 50");
        assert_eq!(mailbox.receive().unwrap(), "");
    }

    #[test]
    fn test_file_mailbox_truncates_long_messages() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("in");
        let mut mailbox = FileMailbox::new(&inbox, dir.path().join("out"), 8);
        mailbox.open().unwrap();

        fs::write(&inbox, "Move 0 10 30").unwrap();
        assert_eq!(mailbox.receive().unwrap(), "Move 0 1");
    }

    #[test]
    fn test_file_mailbox_outbox_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut mailbox = FileMailbox::new(dir.path().join("in"), dir.path().join("EV3_OUTBOX0"), 32);
        assert_eq!(mailbox.outbox_path(), dir.path().join("EV3_OUTBOX0.rtf"));

        mailbox.open().unwrap();
        assert_eq!(fs::read_to_string(mailbox.outbox_path()).unwrap(), "");

        mailbox.send("1 0.0 0.0 150.0").unwrap();
        mailbox.send("0 12.5 3.1 140.2").unwrap();
        assert_eq!(
            fs::read_to_string(mailbox.outbox_path()).unwrap(),
            "0 12.5 3.1 140.2"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_message("abc", 8), "abc");
        assert_eq!(truncate_message("héllo", 2), "h");
    }
}
