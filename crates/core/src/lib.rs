//! Crash-safe, all-or-nothing replacement of a single file.
//!
//! ```no_run
//! atomicwrite_core::write("settings.json", br#"{"theme":"dark"}"#)?;
//! # Ok::<(), atomicwrite_core::AtomicWriteError>(())
//! ```

pub mod error;
pub mod fs;
pub mod platform;

pub use error::{AtomicWriteError, Step};
pub use fs::{write, write_async, write_with};
pub use platform::{NativePlatform, Platform, TempFile};
