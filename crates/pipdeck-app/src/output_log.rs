//! Polling consumer for streamed run output
//!
//! [`OutputLog`] is the display-side end of a run's message queue. It is
//! drained with `try_recv` on a timer so the caller never blocks waiting for
//! the child.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::error::TryRecvError;

use pipdeck_core::prelude::*;
use pipdeck_core::{LineSource, MessageReceiver, RunStatus, StreamMessage};

/// Default number of lines kept before the oldest are dropped
pub const DEFAULT_MAX_LINES: usize = 10_000;

/// One displayed line of child output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub source: LineSource,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl LogLine {
    pub fn is_stderr(&self) -> bool {
        self.source == LineSource::Stderr
    }
}

/// Result of draining the queue once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The run is still going; poll again later
    Pending,
    /// `Finished` has been received
    Finished(RunStatus),
    /// The producer went away without sending `Finished`
    Disconnected,
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::Pending)
    }
}

/// Bounded buffer of the current run's output
#[derive(Debug, Clone)]
pub struct OutputLog {
    lines: VecDeque<LogLine>,
    max_lines: usize,
    started: bool,
    status: Option<RunStatus>,
    stderr_count: usize,
    /// Lines evicted from the front since `Started`
    dropped: usize,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl OutputLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            started: false,
            status: None,
            stderr_count: 0,
            dropped: 0,
        }
    }

    /// Apply one message to the buffer.
    ///
    /// Returns the appended line, if the message was a line.
    pub fn apply(&mut self, message: StreamMessage) -> Option<&LogLine> {
        match message {
            StreamMessage::Started => {
                self.clear();
                self.started = true;
                None
            }
            StreamMessage::Stdout(text) => self.push(LineSource::Stdout, text),
            StreamMessage::Stderr(text) => self.push(LineSource::Stderr, text),
            StreamMessage::Finished(status) => {
                self.status = Some(status);
                None
            }
        }
    }

    fn push(&mut self, source: LineSource, text: String) -> Option<&LogLine> {
        if source == LineSource::Stderr {
            self.stderr_count += 1;
        }
        self.lines.push_back(LogLine {
            source,
            text,
            timestamp: Local::now(),
        });

        // Trim oldest entries if over max size (ring buffer behavior)
        while self.lines.len() > self.max_lines {
            if let Some(evicted) = self.lines.pop_front() {
                if evicted.is_stderr() {
                    self.stderr_count = self.stderr_count.saturating_sub(1);
                }
                self.dropped += 1;
            }
        }

        self.lines.back()
    }

    /// Drain every message currently in the queue without blocking.
    ///
    /// Once `Finished` has been seen no more messages are read; call
    /// [`OutputLog::clear`] before reusing the log for another run.
    pub fn poll(&mut self, rx: &mut MessageReceiver) -> PollOutcome {
        self.poll_with(rx, |_| {})
    }

    /// Like [`OutputLog::poll`], calling `on_line` for each appended line
    pub fn poll_with(
        &mut self,
        rx: &mut MessageReceiver,
        mut on_line: impl FnMut(&LogLine),
    ) -> PollOutcome {
        loop {
            if let Some(status) = self.status {
                return PollOutcome::Finished(status);
            }
            match rx.try_recv() {
                Ok(message) => {
                    if let Some(line) = self.apply(message) {
                        on_line(line);
                    }
                }
                Err(TryRecvError::Empty) => return PollOutcome::Pending,
                Err(TryRecvError::Disconnected) => {
                    warn!("Output queue closed before the run finished");
                    return PollOutcome::Disconnected;
                }
            }
        }
    }

    /// Poll on a fixed interval until the run finishes or the queue closes
    pub async fn drive(
        &mut self,
        rx: &mut MessageReceiver,
        interval: Duration,
        mut on_line: impl FnMut(&LogLine),
    ) -> PollOutcome {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = self.poll_with(rx, &mut on_line);
            if outcome.is_terminal() {
                return outcome;
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.started = false;
        self.status = None;
        self.stderr_count = 0;
        self.dropped = 0;
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// Most recently appended line
    pub fn last_line(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    pub fn stderr_count(&self) -> usize {
        self.stderr_count
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
