//! # pipdeck-core - Core Domain Types
//!
//! Foundation crate for pipdeck. Provides the streamed-output message types,
//! error handling, package row types and the third-party wheel index model.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, serde_json, thiserror, tokio, tracing).
//!
//! ## Public API
//!
//! ### Events (`events`)
//! - [`StreamMessage`] - One line-tagged unit of child process output
//! - [`RunStatus`] - Terminal status carried by [`StreamMessage::Finished`]
//! - [`message_queue()`] - Create the per-run message queue
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Packages (`packages`)
//! - [`SearchHit`], [`InstalledPackage`], [`OutdatedPackage`], [`PackageDetails`]
//! - [`ParseReport`] - Rows plus the lines that could not be parsed
//!
//! ### Wheel Index (`wheel_index`)
//! - [`WheelIndex`] - PythonLibs-style index of prebuilt wheels
//! - [`WheelDist`] - A single downloadable distribution
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use pipdeck_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod packages;
pub mod wheel_index;

/// Prelude for common imports used throughout all pipdeck crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{
    message_queue, LineSource, MessageReceiver, MessageSender, RunStatus, StreamMessage,
    ABORTED_EXIT_CODE, STREAM_ERROR_EXIT_CODE,
};
pub use packages::{
    InstalledPackage, OutdatedPackage, PackageDetails, ParseReport, RejectedLine, SearchHit,
};
pub use wheel_index::{host_architecture, WheelDist, WheelIndex, WheelRow};
