//! pip command construction
//!
//! [`PipCommand`] describes *what* to ask pip; [`PipInvocation`] describes
//! *how* pip is launched (executable, optional privilege elevation).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pipdeck_core::prelude::*;

/// Default pip executable
pub const DEFAULT_PIP: &str = "pip3";

/// How to launch pip
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipInvocation {
    /// pip executable name or path
    pub executable: String,
    /// Prefix for commands that modify the environment, e.g. `["gksudo", "--"]`
    pub elevate: Vec<String>,
}

impl Default for PipInvocation {
    fn default() -> Self {
        Self {
            executable: DEFAULT_PIP.to_string(),
            elevate: Vec::new(),
        }
    }
}

/// Where `pip install` takes packages from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// Package specifiers resolved against PyPI
    PyPi(Vec<String>),
    /// A local sdist or wheel
    LocalArchive(PathBuf),
    /// A requirements file (`-r`)
    Requirements(PathBuf),
    /// Packages resolved against another index
    AlternateIndex {
        index_url: String,
        packages: Vec<String>,
    },
    /// A direct wheel URL, as published by a wheel index
    WheelUrl(String),
}

/// A pip operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipCommand {
    Search { query: String },
    Install { source: InstallSource, upgrade: bool },
    Uninstall { packages: Vec<String> },
    List,
    ListOutdated,
    Show { package: String },
}

impl PipCommand {
    /// Install from PyPI with upgrade, the default install flow
    pub fn install(packages: Vec<String>) -> Self {
        PipCommand::Install {
            source: InstallSource::PyPi(packages),
            upgrade: true,
        }
    }

    pub fn uninstall(packages: Vec<String>) -> Self {
        PipCommand::Uninstall { packages }
    }

    /// Reject commands pip would fail on before anything is spawned
    pub fn validate(&self) -> Result<()> {
        match self {
            PipCommand::Search { query } if query.trim().is_empty() => {
                Err(Error::process("search query is empty"))
            }
            PipCommand::Show { package } if package.trim().is_empty() => {
                Err(Error::process("package name is empty"))
            }
            PipCommand::Uninstall { packages } if packages.is_empty() => {
                Err(Error::process("no packages to uninstall"))
            }
            PipCommand::Install { source, .. } => match source {
                InstallSource::PyPi(packages) | InstallSource::AlternateIndex { packages, .. }
                    if packages.is_empty() =>
                {
                    Err(Error::process("no packages to install"))
                }
                InstallSource::WheelUrl(url) if url.trim().is_empty() => {
                    Err(Error::process("wheel URL is empty"))
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Arguments that follow the pip executable
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            PipCommand::Search { query } => {
                args.push("search".into());
                args.push(query.clone());
            }
            PipCommand::Install { source, upgrade } => {
                args.push("install".into());
                if *upgrade {
                    args.push("-U".into());
                }
                match source {
                    InstallSource::PyPi(packages) => {
                        args.push("--no-cache-dir".into());
                        args.extend(packages.iter().cloned());
                    }
                    InstallSource::LocalArchive(path) => {
                        args.push(path.display().to_string());
                    }
                    InstallSource::Requirements(path) => {
                        args.push("-r".into());
                        args.push(path.display().to_string());
                    }
                    InstallSource::AlternateIndex {
                        index_url,
                        packages,
                    } => {
                        args.push("--index-url".into());
                        args.push(index_url.clone());
                        args.extend(packages.iter().cloned());
                    }
                    InstallSource::WheelUrl(url) => {
                        args.push(url.clone());
                    }
                }
            }
            PipCommand::Uninstall { packages } => {
                args.push("uninstall".into());
                args.push("--yes".into());
                args.extend(packages.iter().cloned());
            }
            PipCommand::List => {
                args.push("list".into());
            }
            PipCommand::ListOutdated => {
                args.push("list".into());
                args.push("--outdated".into());
            }
            PipCommand::Show { package } => {
                args.push("show".into());
                args.push("--no-cache-dir".into());
                args.push(package.clone());
            }
        }
        args
    }

    /// Full argv: elevation prefix (if any), executable, arguments
    pub fn argv(&self, invocation: &PipInvocation) -> Vec<String> {
        let mut argv = Vec::new();
        if self.modifies_environment() {
            argv.extend(invocation.elevate.iter().cloned());
        }
        argv.push(invocation.executable.clone());
        argv.extend(self.args());
        argv
    }

    /// Install and uninstall change site-packages and may need elevation
    pub fn modifies_environment(&self) -> bool {
        matches!(self, PipCommand::Install { .. } | PipCommand::Uninstall { .. })
    }

    /// Long-running commands whose output is streamed live; the rest are
    /// captured and parsed into rows.
    pub fn streams_output(&self) -> bool {
        self.modifies_environment()
    }

    /// Short human-readable description for status lines
    pub fn describe(&self) -> String {
        match self {
            PipCommand::Search { query } => format!("Searching PyPI for '{}'", query),
            PipCommand::Install { source, .. } => match source {
                InstallSource::PyPi(packages) => format!("Installing {}", packages.join(", ")),
                InstallSource::LocalArchive(path) => format!("Installing {}", path.display()),
                InstallSource::Requirements(path) => {
                    format!("Installing requirements from {}", path.display())
                }
                InstallSource::AlternateIndex {
                    index_url,
                    packages,
                } => format!("Installing {} from {}", packages.join(", "), index_url),
                InstallSource::WheelUrl(url) => format!("Installing wheel {}", url),
            },
            PipCommand::Uninstall { packages } => format!("Uninstalling {}", packages.join(", ")),
            PipCommand::List => "Listing installed packages".to_string(),
            PipCommand::ListOutdated => "Listing outdated packages".to_string(),
            PipCommand::Show { package } => format!("Showing {}", package),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_install_from_pypi_args() {
        let cmd = PipCommand::install(strings(&["requests", "six"]));
        assert_eq!(
            cmd.args(),
            strings(&["install", "-U", "--no-cache-dir", "requests", "six"])
        );
    }

    #[test]
    fn test_install_without_upgrade() {
        let cmd = PipCommand::Install {
            source: InstallSource::PyPi(strings(&["flask"])),
            upgrade: false,
        };
        assert_eq!(cmd.args(), strings(&["install", "--no-cache-dir", "flask"]));
    }

    #[test]
    fn test_install_from_requirements_args() {
        let cmd = PipCommand::Install {
            source: InstallSource::Requirements(PathBuf::from("req.txt")),
            upgrade: false,
        };
        assert_eq!(cmd.args(), strings(&["install", "-r", "req.txt"]));
    }

    #[test]
    fn test_install_from_archive_args() {
        let cmd = PipCommand::Install {
            source: InstallSource::LocalArchive(PathBuf::from("dist/pkg-1.0.tar.gz")),
            upgrade: false,
        };
        assert_eq!(cmd.args(), strings(&["install", "dist/pkg-1.0.tar.gz"]));
    }

    #[test]
    fn test_install_from_alternate_index_args() {
        let cmd = PipCommand::Install {
            source: InstallSource::AlternateIndex {
                index_url: "https://test.pypi.org/simple".into(),
                packages: strings(&["demo"]),
            },
            upgrade: false,
        };
        assert_eq!(
            cmd.args(),
            strings(&[
                "install",
                "--index-url",
                "https://test.pypi.org/simple",
                "demo"
            ])
        );
    }

    #[test]
    fn test_uninstall_is_non_interactive() {
        let cmd = PipCommand::uninstall(strings(&["six"]));
        assert_eq!(cmd.args(), strings(&["uninstall", "--yes", "six"]));
    }

    #[test]
    fn test_list_and_show_args() {
        assert_eq!(PipCommand::List.args(), strings(&["list"]));
        assert_eq!(
            PipCommand::ListOutdated.args(),
            strings(&["list", "--outdated"])
        );
        let show = PipCommand::Show {
            package: "six".into(),
        };
        assert_eq!(show.args(), strings(&["show", "--no-cache-dir", "six"]));
    }

    #[test]
    fn test_elevation_applies_only_to_modifying_commands() {
        let invocation = PipInvocation {
            executable: "pip3".into(),
            elevate: strings(&["gksudo", "--"]),
        };
        let install = PipCommand::install(strings(&["six"]));
        assert_eq!(
            install.argv(&invocation),
            strings(&["gksudo", "--", "pip3", "install", "-U", "--no-cache-dir", "six"])
        );
        assert_eq!(
            PipCommand::List.argv(&invocation),
            strings(&["pip3", "list"])
        );
    }

    #[test]
    fn test_streams_output() {
        assert!(PipCommand::install(strings(&["six"])).streams_output());
        assert!(PipCommand::uninstall(strings(&["six"])).streams_output());
        assert!(!PipCommand::List.streams_output());
        assert!(!PipCommand::Search {
            query: "six".into()
        }
        .streams_output());
    }

    #[test]
    fn test_validate_rejects_empty_inputs() {
        assert!(PipCommand::install(vec![]).validate().is_err());
        assert!(PipCommand::uninstall(vec![]).validate().is_err());
        assert!(PipCommand::Search { query: "  ".into() }.validate().is_err());
        assert!(PipCommand::Show {
            package: String::new()
        }
        .validate()
        .is_err());
        assert!(PipCommand::install(strings(&["six"])).validate().is_ok());
        assert!(PipCommand::List.validate().is_ok());
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            PipCommand::install(strings(&["a", "b"])).describe(),
            "Installing a, b"
        );
        assert_eq!(
            PipCommand::uninstall(strings(&["a"])).describe(),
            "Uninstalling a"
        );
    }
}
