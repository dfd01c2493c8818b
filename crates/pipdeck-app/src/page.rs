//! Page navigation state machine
//!
//! Pages form a closed set and every move between them goes through
//! [`Page::transition`]. A `None` result means the event is not valid on the
//! current page and the caller stays put.

use serde::{Deserialize, Serialize};

/// Where an install takes its packages from, as picked on the install pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPage {
    PyPi,
    LocalArchive,
    Requirements,
    WheelIndex,
}

/// Every screen of the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Welcome,
    InstallFromPyPi,
    InstallFromLocalArchive,
    InstallFromRequirements,
    InstallFromWheelIndex,
    ManageInstalled,
    UpdatePackages,
    /// Live output of the current (or last) run
    TaskLog,
}

/// Navigation events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    OpenInstall,
    OpenManage,
    OpenUpdate,
    SelectInstallSource(InstallPage),
    RunStarted,
    RunFinished,
    Back,
}

impl From<InstallPage> for Page {
    fn from(source: InstallPage) -> Self {
        match source {
            InstallPage::PyPi => Page::InstallFromPyPi,
            InstallPage::LocalArchive => Page::InstallFromLocalArchive,
            InstallPage::Requirements => Page::InstallFromRequirements,
            InstallPage::WheelIndex => Page::InstallFromWheelIndex,
        }
    }
}

impl Page {
    pub fn is_install(&self) -> bool {
        matches!(
            self,
            Page::InstallFromPyPi
                | Page::InstallFromLocalArchive
                | Page::InstallFromRequirements
                | Page::InstallFromWheelIndex
        )
    }

    /// Next page for `event`, `None` if the move is not allowed.
    ///
    /// `run_active` pins the task log while a child is still running.
    pub fn transition(self, event: NavEvent, run_active: bool) -> Option<Page> {
        use NavEvent::*;
        use Page::*;

        match (self, event) {
            // Any run switches to the task log
            (_, RunStarted) => Some(TaskLog),
            (TaskLog, RunFinished) => Some(TaskLog),
            (_, RunFinished) => None,

            (TaskLog, Back) if run_active => None,
            (TaskLog, Back) => Some(Welcome),
            (TaskLog, _) if run_active => None,

            (Welcome, Back) => None,
            (_, Back) => Some(Welcome),

            (_, OpenInstall) => Some(InstallFromPyPi),
            (_, OpenManage) => Some(ManageInstalled),
            (_, OpenUpdate) => Some(UpdatePackages),

            (page, SelectInstallSource(source)) if page.is_install() => Some(source.into()),
            (_, SelectInstallSource(_)) => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Welcome => "Welcome",
            Page::InstallFromPyPi => "Install from PyPI",
            Page::InstallFromLocalArchive => "Install from local archive",
            Page::InstallFromRequirements => "Install from requirements file",
            Page::InstallFromWheelIndex => "Install from wheel index",
            Page::ManageInstalled => "Manage installed packages",
            Page::UpdatePackages => "Update packages",
            Page::TaskLog => "Task log",
        }
    }
}
