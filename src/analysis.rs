//! Structural analyzer driver.
//!
//! Feeds every classpath entry and the compiled-artifacts directory through
//! the engine's analyzer. A failing classpath entry is skipped and recorded;
//! partial coverage beats an aborted report. The compiled-artifacts directory
//! gets no such bypass, its failure propagates to the per-file boundary.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::engine::{Analyzer, CoverageBundle, Engine, ExecFileData};

/// One classpath entry that failed to analyze.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

/// Analysis output: the accumulated bundle plus the entries that did not
/// contribute to it.
#[derive(Debug)]
pub struct Analysis {
    pub bundle: CoverageBundle,
    pub skipped: Vec<SkippedEntry>,
}

pub fn run<E: Engine>(
    engine: &E,
    data: &ExecFileData,
    classes_dir: &Path,
    entries: &[String],
    title: &str,
) -> Result<Analysis> {
    let mut analyzer = engine.analyzer(data);
    let mut skipped = Vec::new();

    for entry in entries {
        if let Err(err) = analyzer.analyze_all(Path::new(entry)) {
            warn!(entry = %entry, reason = %err, "skipping classpath entry");
            skipped.push(SkippedEntry {
                path: entry.clone(),
                reason: err.to_string(),
            });
        }
    }

    analyzer
        .analyze_all(classes_dir)
        .with_context(|| format!("failed to analyze compiled classes: {}", classes_dir.display()))?;

    Ok(Analysis {
        bundle: analyzer.into_bundle(title),
        skipped,
    })
}
