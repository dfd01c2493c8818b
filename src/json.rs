//! NDJSON event output for `--json`
//!
//! One event per line on stdout, each with an `event` field:
//!
//! ```json
//! {"event":"line","source":"stdout","text":"Collecting six","timestamp":1704700001020}
//! {"event":"finished","status":{"status":"exited","code":0},"timestamp":1704700003000}
//! {"event":"notice","message":"Everything is up to date","timestamp":1704700003000}
//! ```

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;

use pipdeck_core::prelude::*;
use pipdeck_core::{LineSource, RunStatus};

/// Events emitted in JSON mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JsonEvent {
    Line {
        source: LineSource,
        text: String,
        timestamp: i64,
    },
    Finished {
        status: RunStatus,
        timestamp: i64,
    },
    Error {
        message: String,
        timestamp: i64,
    },
    /// Informational outcome when there is nothing to run
    Notice {
        message: String,
        timestamp: i64,
    },
}

impl JsonEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn line(source: LineSource, text: &str) -> Self {
        Self::Line {
            source,
            text: text.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn finished(status: RunStatus) -> Self {
        Self::Finished {
            status,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
            timestamp: Self::now(),
        }
    }
}
