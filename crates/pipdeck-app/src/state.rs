//! Application state (Model in TEA pattern)

use std::path::PathBuf;

use pipdeck_core::RunStatus;
use pipdeck_daemon::PipInvocation;

use crate::config::Settings;
use crate::output_log::OutputLog;
use crate::page::Page;

/// Complete application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Current page
    pub page: Page,

    /// Page shown before the current one, restored on `Back` from the task log
    pub previous_page: Option<Page>,

    /// Output of the current (or last) run
    pub log: OutputLog,

    /// A run has been requested and has not finished yet
    pub running: bool,

    /// Abort has been requested for the current run
    pub abort_requested: bool,

    /// Description of the current (or last) run
    pub current_task: Option<String>,

    /// Status of the last finished run
    pub last_status: Option<RunStatus>,

    /// One-line feedback for the user
    pub status_line: Option<String>,

    /// How pip is launched
    pub invocation: PipInvocation,

    pub project_path: PathBuf,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(PathBuf::from("."), &Settings::default())
    }
}

impl AppState {
    pub fn with_settings(project_path: PathBuf, settings: &Settings) -> Self {
        Self {
            page: Page::default(),
            previous_page: None,
            log: OutputLog::new(settings.streaming.max_log_lines),
            running: false,
            abort_requested: false,
            current_task: None,
            last_status: None,
            status_line: None,
            invocation: settings.pip.invocation(),
            project_path,
        }
    }

    /// Move to `page`, remembering where we came from
    pub fn go_to(&mut self, page: Page) {
        if page != self.page {
            self.previous_page = Some(self.page);
            self.page = page;
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status_line = Some(status.into());
    }
}
