//! # exec-report
//!
//! Batch generation of XML coverage reports from recorded JVM execution data.
//!
//! ## Architecture
//!
//! - **layout**: Fixed project layout, project discovery and exec-file enumeration
//! - **classpath**: Classpath declaration parsing with the fatal-on-missing policy
//! - **loader**: Execution-data file loading through the engine
//! - **analysis**: Structural analyzer driver with per-entry skip diagnostics
//! - **emit**: Report emission through the visitor protocol
//! - **batch**: Per-project, per-file orchestration with failure isolation
//! - **engine**: Coverage engine contract plus the bundled probe-count engine
//! - **error**: The typed configuration error and its exit status
//! - **cli**: Command-line surface

pub mod analysis;
pub mod batch;
pub mod classpath;
pub mod cli;
pub mod emit;
pub mod engine;
pub mod error;
pub mod layout;
pub mod loader;
