//! The one failure the batch treats as a configuration error rather than a
//! per-file fault: an undeclared classpath. It aborts the whole run with a
//! distinct exit status so build tooling can tell misconfiguration apart from
//! ordinary I/O failures.

use std::path::PathBuf;

/// Exit status for a missing classpath declaration file.
pub const EXIT_MISSING_CLASSPATH: i32 = 10;

#[derive(Debug, thiserror::Error)]
#[error("classpath declaration file does not exist: {}", .path.display())]
pub struct MissingClasspath {
    pub path: PathBuf,
}
