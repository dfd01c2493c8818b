//! Tool availability checking
//!
//! Locates the pip executable and the optional elevation helper before any
//! command is spawned, so a missing tool is reported once at startup instead
//! of as a spawn failure mid-run.

use std::path::PathBuf;

use pipdeck_core::prelude::*;

use crate::commands::PipInvocation;

/// Resolved locations of the external tools pipdeck drives
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    /// Absolute path of the pip executable, if found
    pub pip_path: Option<PathBuf>,

    /// Absolute path of the elevation helper (first word of `elevate`),
    /// `None` if elevation is not configured or the helper is missing
    pub elevate_path: Option<PathBuf>,

    /// Whether an elevation prefix is configured at all
    pub elevate_configured: bool,
}

impl ToolAvailability {
    /// Check tool availability (run once at startup)
    pub fn check(invocation: &PipInvocation) -> Self {
        let pip_path = Self::locate(&invocation.executable);
        let elevate_configured = !invocation.elevate.is_empty();
        let elevate_path = invocation
            .elevate
            .first()
            .and_then(|helper| Self::locate(helper));

        Self {
            pip_path,
            elevate_path,
            elevate_configured,
        }
    }

    fn locate(program: &str) -> Option<PathBuf> {
        which::which(program)
            .inspect_err(|e| debug!("{} not found on PATH: {}", program, e))
            .ok()
    }

    pub fn pip_available(&self) -> bool {
        self.pip_path.is_some()
    }

    /// Elevation is usable when it is either not configured or resolvable
    pub fn elevation_available(&self) -> bool {
        !self.elevate_configured || self.elevate_path.is_some()
    }

    /// Fail with [`Error::ExecutableNotFound`] if pip cannot be located
    pub fn require_pip(&self, invocation: &PipInvocation) -> Result<&PathBuf> {
        self.pip_path
            .as_ref()
            .ok_or_else(|| Error::executable_not_found(&invocation.executable))
    }

    /// Get user-friendly message for a missing pip
    pub fn pip_unavailable_message(&self) -> Option<&'static str> {
        if self.pip_available() {
            None
        } else {
            Some("pip not found. Install pip or set [pip] executable in .pipdeck/config.toml.")
        }
    }

    /// Get user-friendly message for a missing elevation helper
    pub fn elevation_unavailable_message(&self) -> Option<&'static str> {
        if self.elevation_available() {
            None
        } else {
            Some("Elevation helper not found. Check [pip] elevate in .pipdeck/config.toml.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pip() {
        let invocation = PipInvocation {
            executable: "pipdeck-no-such-pip".into(),
            elevate: Vec::new(),
        };
        let tools = ToolAvailability::check(&invocation);
        assert!(!tools.pip_available());
        assert!(tools.elevation_available());
        assert!(tools.pip_unavailable_message().is_some());
        assert!(matches!(
            tools.require_pip(&invocation),
            Err(Error::ExecutableNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolves_programs_on_path() {
        let invocation = PipInvocation {
            executable: "sh".into(),
            elevate: vec!["env".into(), "--".into()],
        };
        let tools = ToolAvailability::check(&invocation);
        assert!(tools.pip_available());
        assert!(tools.elevate_path.is_some());
        assert!(tools.elevation_unavailable_message().is_none());
    }

    #[test]
    fn test_missing_elevation_helper() {
        let invocation = PipInvocation {
            executable: "pip3".into(),
            elevate: vec!["pipdeck-no-such-sudo".into()],
        };
        let tools = ToolAvailability::check(&invocation);
        assert!(tools.elevate_configured);
        assert!(!tools.elevation_available());
    }
}
