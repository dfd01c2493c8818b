//! Subcommand implementations
//!
//! Streamed commands (install, uninstall, update, run) go through the
//! [`Engine`]; captured queries call the daemon directly and print rows.

use std::path::PathBuf;

use color_eyre::eyre::{bail, eyre, Result};

use pipdeck_app::config::{self, Settings};
use pipdeck_app::{Engine, LogLine, Message};
use pipdeck_core::prelude::{debug, info, warn};
use pipdeck_core::{host_architecture, LineSource, ParseReport, RunStatus, WheelIndex};
use pipdeck_daemon::{
    list_installed, list_outdated, search_packages, show_package, InstallSource, PipCommand,
    PipQueryResult, ToolAvailability,
};

use crate::cli::{Command, WheelsCommand};
use crate::json::JsonEvent;

/// Process exit code for a finished command
pub type ExitCode = i32;

/// Output options shared by every subcommand
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

/// Dispatch a parsed subcommand
pub async fn execute(command: Command, project_path: PathBuf, output: Output) -> Result<ExitCode> {
    let mut engine = Engine::new(project_path);

    match command {
        Command::Search { query } => {
            require_pip(&engine.settings)?;
            let result = search_packages(
                &engine.state.invocation,
                &query,
                engine.settings.pip.capture_timeout(),
            )
            .await?;
            print_report(&result, |hit| {
                format!(
                    "{:<30} {:<16} {:<12} {}",
                    hit.name,
                    hit.installed_display(),
                    hit.latest,
                    hit.summary
                )
            });
            Ok(0)
        }

        Command::List { outdated: false } => {
            require_pip(&engine.settings)?;
            let result =
                list_installed(&engine.state.invocation, engine.settings.pip.capture_timeout())
                    .await?;
            print_report(&result, |p| format!("{:<30} {}", p.name, p.version));
            Ok(0)
        }

        Command::List { outdated: true } => {
            require_pip(&engine.settings)?;
            let result =
                list_outdated(&engine.state.invocation, engine.settings.pip.capture_timeout())
                    .await?;
            print_report(&result, |p| {
                format!("{:<30} {:<16} {}", p.name, p.version, p.latest)
            });
            Ok(0)
        }

        Command::Show { package } => {
            require_pip(&engine.settings)?;
            let result = show_package(
                &engine.state.invocation,
                &package,
                engine.settings.pip.capture_timeout(),
            )
            .await?;
            if result.report.rows.is_empty() {
                bail!("package '{}' is not installed", package);
            }
            print_report(&result, |details| {
                details
                    .fields
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            Ok(0)
        }

        Command::Install {
            packages,
            requirements,
            archive,
            index_url,
            no_upgrade,
        } => {
            require_pip(&engine.settings)?;
            let source = install_source(packages, requirements, archive, index_url)?;
            let command = PipCommand::Install {
                source,
                upgrade: !no_upgrade,
            };
            stream(&mut engine, Message::Execute(command), output).await
        }

        Command::Uninstall { packages } => {
            require_pip(&engine.settings)?;
            stream(
                &mut engine,
                Message::Execute(PipCommand::uninstall(packages)),
                output,
            )
            .await
        }

        Command::Update { packages } => {
            require_pip(&engine.settings)?;
            let packages = if packages.is_empty() {
                let outdated =
                    list_outdated(&engine.state.invocation, engine.settings.pip.capture_timeout())
                        .await?;
                outdated.report.rows.into_iter().map(|p| p.name).collect()
            } else {
                packages
            };
            if packages.is_empty() {
                report_notice("Everything is up to date", output);
                return Ok(0);
            }
            stream(
                &mut engine,
                Message::Execute(PipCommand::install(packages)),
                output,
            )
            .await
        }

        Command::Wheels { command } => {
            let index_path = engine
                .settings
                .wheel_index
                .resolve_path(&engine.state.project_path);
            let index = WheelIndex::load(&index_path)?;
            match command {
                WheelsCommand::Search { term } => {
                    for row in index.search(&term) {
                        println!(
                            "{:<30} {:<12} {}",
                            row.module, row.latest.version, row.latest.summary
                        );
                    }
                    Ok(0)
                }
                WheelsCommand::Install { module, version } => {
                    require_pip(&engine.settings)?;
                    let url = pick_wheel(&index, &engine.settings, &module, version.as_deref())?;
                    let command = PipCommand::Install {
                        source: InstallSource::WheelUrl(url),
                        upgrade: false,
                    };
                    stream(&mut engine, Message::Execute(command), output).await
                }
            }
        }

        Command::Run { command } => {
            stream(&mut engine, Message::RunCommand { argv: command }, output).await
        }

        Command::Init => {
            let path = config::init_config_dir(&engine.state.project_path)?;
            println!("Config at {}", path.display());
            Ok(0)
        }
    }
}

/// Fail early with a friendly message when pip cannot be located
fn require_pip(settings: &Settings) -> Result<()> {
    let invocation = settings.pip.invocation();
    let tools = ToolAvailability::check(&invocation);
    if let Some(message) = tools.elevation_unavailable_message() {
        warn!("{}", message);
        eprintln!("warning: {}", message);
    }
    match tools.pip_unavailable_message() {
        Some(message) => Err(eyre!("{}", message)),
        None => {
            debug!("Using pip at {:?}", tools.pip_path);
            Ok(())
        }
    }
}

fn install_source(
    packages: Vec<String>,
    requirements: Option<PathBuf>,
    archive: Option<PathBuf>,
    index_url: Option<String>,
) -> Result<InstallSource> {
    if let Some(path) = requirements {
        return Ok(InstallSource::Requirements(path));
    }
    if let Some(path) = archive {
        return Ok(InstallSource::LocalArchive(path));
    }
    if let Some(index_url) = index_url {
        url::Url::parse(&index_url).map_err(|e| eyre!("invalid index URL '{}': {}", index_url, e))?;
        return Ok(InstallSource::AlternateIndex {
            index_url,
            packages,
        });
    }
    Ok(InstallSource::PyPi(packages))
}

fn pick_wheel(
    index: &WheelIndex,
    settings: &Settings,
    module: &str,
    version: Option<&str>,
) -> Result<String> {
    let candidates = index.compatible(
        module,
        &settings.wheel_index.python_tag,
        host_architecture(),
    );
    let wheel = match version {
        Some(version) => candidates.into_iter().find(|d| d.version == version),
        None => candidates.into_iter().next(),
    };
    match wheel {
        Some(dist) => {
            info!("Picked {} {} ({})", module, dist.version, dist.compatibility_tag);
            Ok(dist.url.clone())
        }
        None if index.distributions(module).is_empty() => {
            bail!("module '{}' is not in the wheel index", module)
        }
        None => bail!(
            "no {} wheel of '{}' for {}",
            version.unwrap_or("compatible"),
            module,
            settings.wheel_index.python_tag
        ),
    }
}

/// Stream a run to the terminal and map its final status to an exit code
async fn stream(engine: &mut Engine, message: Message, output: Output) -> Result<ExitCode> {
    let print_line = |line: &LogLine| {
        if output.json {
            JsonEvent::line(line.source, &line.text).emit();
        } else {
            match line.source {
                LineSource::Stdout => println!("{}", line.text),
                LineSource::Stderr => eprintln!("{}", line.text),
            }
        }
    };

    let status = engine.run(message, print_line).await;
    let summary = engine.state.status_line.clone().unwrap_or_default();

    match status {
        Some(status) => {
            report_finished(&summary, status, output);
            Ok(if status.is_success() { 0 } else { 1 })
        }
        None => {
            if output.json {
                JsonEvent::error(summary).emit();
            } else {
                eprintln!("{}", summary);
            }
            Ok(1)
        }
    }
}

fn report_finished(summary: &str, status: RunStatus, output: Output) {
    if output.json {
        JsonEvent::finished(status).emit();
    } else {
        eprintln!("{}", summary);
    }
}

fn report_notice(message: &str, output: Output) {
    if output.json {
        JsonEvent::notice(message).emit();
    } else {
        println!("{}", message);
    }
}

fn print_report<T>(result: &PipQueryResult<T>, format_row: impl Fn(&T) -> String) {
    for row in &result.report.rows {
        println!("{}", format_row(row));
    }
    print_rejected(&result.report);
    if let Some(warning) = &result.warning {
        eprintln!("{}", warning);
    }
}

fn print_rejected<T>(report: &ParseReport<T>) {
    for rejected in &report.rejected {
        eprintln!(
            "warning: could not parse line {}: {}",
            rejected.line_number, rejected.line
        );
    }
}

/// Resolve `--project`, defaulting to the working directory
pub fn project_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}
