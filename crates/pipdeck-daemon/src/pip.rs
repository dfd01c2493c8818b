//! Captured (run-to-completion) pip commands
//!
//! Short commands such as `list`, `search` and `show` are run to completion
//! and their stdout is parsed into rows. Installs and uninstalls go through
//! [`crate::StreamedProcess`] instead.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;

use pipdeck_core::prelude::*;
use pipdeck_core::{InstalledPackage, OutdatedPackage, PackageDetails, ParseReport, SearchHit};

use crate::commands::{PipCommand, PipInvocation};
use crate::parse::{
    parse_list_output, parse_outdated_output, parse_search_output, parse_show_output,
};

/// Default timeout for captured pip commands
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of a command run to completion
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
    pub elapsed: Duration,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Parsed rows from a captured pip command
#[derive(Debug, Clone)]
pub struct PipQueryResult<T> {
    pub report: ParseReport<T>,
    /// Anything pip printed on stderr
    pub warning: Option<String>,
    pub elapsed: Duration,
}

/// Run `argv` to completion, collecting both pipes.
///
/// The child is killed if `timeout_duration` elapses first.
pub async fn run_captured(argv: &[String], timeout_duration: Duration) -> Result<CapturedOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::spawn("empty command"))?;

    debug!("Running captured: {}", argv.join(" "));
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .env("PYTHONIOENCODING", "utf-8")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::from_spawn(program, e))?;

    let output = timeout(timeout_duration, child.wait_with_output())
        .await
        .map_err(|_| Error::ProcessTimeout {
            program: program.clone(),
            elapsed: start.elapsed(),
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    trace!("{} stdout: {}", program, stdout);
    if !stderr.is_empty() {
        debug!("{} stderr: {}", program, stderr);
    }

    Ok(CapturedOutput {
        stdout,
        stderr,
        code: output.status.code(),
        elapsed: start.elapsed(),
    })
}

/// Run a captured pip command and parse its stdout.
///
/// A non-zero exit with no stdout is an error; a non-zero exit with partial
/// output (e.g. a search that failed half way) still yields the rows.
async fn query<T>(
    command: PipCommand,
    invocation: &PipInvocation,
    timeout_duration: Duration,
    parse: fn(&str) -> ParseReport<T>,
) -> Result<PipQueryResult<T>> {
    command.validate()?;
    info!("{}", command.describe());

    let output = run_captured(&command.argv(invocation), timeout_duration).await?;

    if !output.success() && output.stdout.trim().is_empty() {
        let reason = match output.stderr.trim() {
            "" => format!("pip exited with {:?}", output.code),
            stderr => stderr.to_string(),
        };
        return Err(Error::process(reason));
    }

    let report = parse(&output.stdout);
    if !report.rejected.is_empty() {
        debug!("{} unparsed lines: {:?}", report.rejected.len(), report.rejected);
    }

    let warning = match output.stderr.trim() {
        "" => None,
        stderr => Some(stderr.to_string()),
    };

    Ok(PipQueryResult {
        report,
        warning,
        elapsed: output.elapsed,
    })
}

/// Search PyPI via `pip search`
pub async fn search_packages(
    invocation: &PipInvocation,
    query_text: &str,
    timeout_duration: Duration,
) -> Result<PipQueryResult<SearchHit>> {
    let command = PipCommand::Search {
        query: query_text.to_string(),
    };
    query(command, invocation, timeout_duration, parse_search_output).await
}

/// List installed packages via `pip list`
pub async fn list_installed(
    invocation: &PipInvocation,
    timeout_duration: Duration,
) -> Result<PipQueryResult<InstalledPackage>> {
    query(
        PipCommand::List,
        invocation,
        timeout_duration,
        parse_list_output,
    )
    .await
}

/// List outdated packages via `pip list --outdated`
pub async fn list_outdated(
    invocation: &PipInvocation,
    timeout_duration: Duration,
) -> Result<PipQueryResult<OutdatedPackage>> {
    query(
        PipCommand::ListOutdated,
        invocation,
        timeout_duration,
        parse_outdated_output,
    )
    .await
}

/// Show package metadata via `pip show`
pub async fn show_package(
    invocation: &PipInvocation,
    package: &str,
    timeout_duration: Duration,
) -> Result<PipQueryResult<PackageDetails>> {
    let command = PipCommand::Show {
        package: package.to_string(),
    };
    query(command, invocation, timeout_duration, parse_show_output).await
}
