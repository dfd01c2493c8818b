//! # pipdeck-daemon - pip Process Management
//!
//! Spawns pip (or any command) as a child process, streams its output line
//! by line into a [`pipdeck_core::MessageSender`], and runs short pip queries
//! to completion for parsing.
//!
//! Depends on [`pipdeck_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Streaming
//! - [`StreamedProcess`] - Spawn a child and stream tagged output lines
//! - [`StreamOptions`] - Read strategy, drain timeout, environment
//! - [`ReadStrategy`] - One multiplexed reader or one reader per pipe
//!
//! ### pip Commands
//! - [`PipCommand`] - A pip operation (install, uninstall, list, ...)
//! - [`InstallSource`] - Where `pip install` takes packages from
//! - [`PipInvocation`] - Executable plus optional elevation prefix
//!
//! ### Captured Queries
//! - [`run_captured()`] - Run a command to completion with a timeout
//! - [`search_packages()`], [`list_installed()`], [`list_outdated()`], [`show_package()`]
//!
//! ### Output Parsing
//! - [`parse_search_output()`], [`parse_list_output()`],
//!   [`parse_outdated_output()`], [`parse_show_output()`]
//!
//! ### Platform Utilities
//! - [`ToolAvailability`] - Locate pip and the elevation helper

pub mod commands;
pub mod parse;
pub mod pip;
pub mod process;
pub mod tool_availability;

// Public API re-exports
pub use commands::{InstallSource, PipCommand, PipInvocation, DEFAULT_PIP};
pub use parse::{
    parse_list_output, parse_outdated_output, parse_search_output, parse_show_output,
};
pub use pip::{
    list_installed, list_outdated, run_captured, search_packages, show_package, CapturedOutput,
    PipQueryResult, CAPTURE_TIMEOUT,
};
pub use process::{ReadStrategy, StreamOptions, StreamedProcess, DEFAULT_DRAIN_TIMEOUT};
pub use tool_availability::ToolAvailability;
