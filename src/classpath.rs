//! Classpath declaration parsing.
//!
//! A project declares the binary locations to analyze in a single
//! path-separator-delimited line. An absent declaration file is a
//! configuration error that must halt the whole batch; entries that point
//! nowhere are kept here and surface later as per-entry analysis skips.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::MissingClasspath;
use crate::layout::Layout;

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Ordered classpath entries of one project. Entry existence is validated at
/// analyze time, not here.
pub fn resolve(project: &Path, layout: &Layout) -> Result<Vec<String>> {
    let file = project.join(&layout.classpath_file);
    if !file.is_file() {
        return Err(MissingClasspath { path: file }.into());
    }
    let content = fs::read_to_string(&file)
        .with_context(|| format!("failed to read classpath file: {}", file.display()))?;
    Ok(split(&content))
}

fn split(content: &str) -> Vec<String> {
    content
        .split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
