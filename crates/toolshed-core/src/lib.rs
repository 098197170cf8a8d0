//! toolshed-core — job types, error taxonomy, and configuration.
//! All other toolshed crates depend on this one.

pub mod config;
pub mod error;
pub mod job;
pub mod media;

pub use error::{ExecError, GiveUpReason, JobError};
pub use job::{JobKind, JobRequest, MediaSpec, OutputKind, Quality};
pub use media::{FormatInfo, MediaInfo};
