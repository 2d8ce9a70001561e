//! Report emission.
//!
//! Drives the engine's report visitor through its fixed protocol against a
//! buffered file writer. The writer is owned by the visitor and dropped on
//! every exit path, so no file handle outlives a failed emission; the report
//! is complete only once `visit_end` has flushed it.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::engine::{CoverageBundle, Engine, ExecFileData, ReportVisitor, SourceLocator};

pub fn write_report<E: Engine>(
    engine: &E,
    bundle: &CoverageBundle,
    data: &ExecFileData,
    report_file: &Path,
    sources: &SourceLocator,
) -> Result<()> {
    if let Some(parent) = report_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }
    let file = File::create(report_file)
        .with_context(|| format!("failed to create report file: {}", report_file.display()))?;

    let mut visitor = engine.visitor(Box::new(BufWriter::new(file)))?;
    visitor.visit_info(&data.sessions, &data.records)?;
    visitor.visit_bundle(bundle, sources)?;
    visitor.visit_end()?;
    Ok(())
}
