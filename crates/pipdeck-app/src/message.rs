//! Message types for the application (TEA pattern)

use pipdeck_core::StreamMessage;
use pipdeck_daemon::PipCommand;

use crate::page::NavEvent;

/// All possible messages/actions in the application
#[derive(Debug, Clone)]
pub enum Message {
    /// Page navigation
    Navigate(NavEvent),

    /// Run a pip command with streamed output
    Execute(PipCommand),

    /// Run an arbitrary command with streamed output
    RunCommand { argv: Vec<String> },

    /// Output from the current run's queue
    Stream(StreamMessage),

    /// The requested run could not be spawned
    StartFailed { reason: String },

    /// User asked to stop the current run (Ctrl-C)
    RequestAbort,
}
