//! Streamed process output messages
//!
//! A run produces exactly one [`StreamMessage::Started`], any number of
//! [`StreamMessage::Stdout`] / [`StreamMessage::Stderr`] lines, and exactly one
//! [`StreamMessage::Finished`] as its last message.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Numeric code reported for a run terminated by `abort()`
pub const ABORTED_EXIT_CODE: i32 = -1;

/// Numeric code reported when reading a pipe failed and the child was killed
pub const STREAM_ERROR_EXIT_CODE: i32 = -2;

/// Producer half of the per-run message queue
pub type MessageSender = mpsc::UnboundedSender<StreamMessage>;

/// Consumer half of the per-run message queue
pub type MessageReceiver = mpsc::UnboundedReceiver<StreamMessage>;

/// Create a fresh message queue for a single run.
pub fn message_queue() -> (MessageSender, MessageReceiver) {
    mpsc::unbounded_channel()
}

/// Which pipe a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    Stdout,
    Stderr,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "code")]
pub enum RunStatus {
    /// The child exited on its own with this code
    Exited(i32),
    /// The child was killed by `abort()`
    Aborted,
}

impl RunStatus {
    /// Numeric exit code, with [`ABORTED_EXIT_CODE`] for aborted runs
    pub fn code(&self) -> i32 {
        match self {
            RunStatus::Exited(code) => *code,
            RunStatus::Aborted => ABORTED_EXIT_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RunStatus::Aborted)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Exited(0) => write!(f, "succeeded"),
            RunStatus::Exited(STREAM_ERROR_EXIT_CODE) => write!(f, "failed reading output"),
            RunStatus::Exited(code) => write!(f, "failed with exit code {}", code),
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// One line-tagged unit of streamed output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "payload")]
pub enum StreamMessage {
    /// The child has been spawned; always the first message of a run
    Started,
    /// One line of stdout, without its terminator
    Stdout(String),
    /// One line of stderr, without its terminator
    Stderr(String),
    /// The run is over; always the last message of a run
    Finished(RunStatus),
}

impl StreamMessage {
    /// Build a line message for the given pipe
    pub fn line(source: LineSource, text: String) -> Self {
        match source {
            LineSource::Stdout => StreamMessage::Stdout(text),
            LineSource::Stderr => StreamMessage::Stderr(text),
        }
    }

    /// Source and text for line messages, `None` for control messages
    pub fn as_line(&self) -> Option<(LineSource, &str)> {
        match self {
            StreamMessage::Stdout(text) => Some((LineSource::Stdout, text)),
            StreamMessage::Stderr(text) => Some((LineSource::Stderr, text)),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, StreamMessage::Finished(_))
    }
}
