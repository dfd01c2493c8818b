//! # pipdeck-app - Application State and Orchestration
//!
//! TEA-style state management for pipdeck: settings, page navigation, the
//! polling consumer of streamed output, and the engine that ties a
//! [`pipdeck_daemon::StreamedProcess`] to `update`.
//!
//! ## Public API
//!
//! ### Configuration
//! - [`config::Settings`] - `.pipdeck/config.toml`
//! - [`config::load_settings()`], [`config::init_config_dir()`]
//!
//! ### Output
//! - [`OutputLog`] - Bounded, non-blocking consumer of a run's queue
//! - [`PollOutcome`] - Result of draining the queue once
//!
//! ### TEA
//! - [`AppState`], [`Message`], [`update()`], [`UpdateAction`], [`UpdateResult`]
//! - [`Page`], [`NavEvent`] - Navigation state machine
//! - [`Engine`] - Runs the update loop for streamed commands

pub mod config;
pub mod engine;
pub mod handler;
pub mod message;
pub mod output_log;
pub mod page;
pub mod signals;
pub mod state;

pub use engine::Engine;
pub use handler::{update, UpdateAction, UpdateResult};
pub use message::Message;
pub use output_log::{LogLine, OutputLog, PollOutcome, DEFAULT_MAX_LINES};
pub use page::{InstallPage, NavEvent, Page};
pub use state::AppState;
