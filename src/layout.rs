//! Fixed project layout and project discovery.
//!
//! Every path a pipeline component touches derives from the project root plus
//! these fixed names; the struct is built once at startup and passed
//! explicitly, never read from ambient state.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Layout {
    /// Classpath declaration file, one path-separator-delimited line.
    pub classpath_file: String,
    pub sources_dir: String,
    pub classes_dir: String,
    pub exec_dir: String,
    pub report_dir: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            classpath_file: "classpath.cp".to_string(),
            sources_dir: "src".to_string(),
            classes_dir: "target".to_string(),
            exec_dir: "exec".to_string(),
            report_dir: "reports".to_string(),
        }
    }
}

/// Project name, taken from the directory base name.
pub fn project_title(project: &Path) -> String {
    project
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| project.to_string_lossy().to_string())
}

/// Project directories to batch over. A root carrying its own exec-data
/// subdirectory is a single project; otherwise every immediate child
/// directory carrying one is a project. A root with neither yields no work.
pub fn discover_projects(root: &Path, layout: &Layout) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("root directory does not exist: {}", root.display());
    }
    if root.join(&layout.exec_dir).is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut projects = Vec::new();
    let entries =
        fs::read_dir(root).with_context(|| format!("failed to read root: {}", root.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() && path.join(&layout.exec_dir).is_dir() {
            projects.push(path);
        }
    }
    Ok(projects)
}

/// Execution-data file names of one project, in the order the filesystem
/// reports them. An absent subdirectory means no work, not an error.
pub fn list_exec_files(project: &Path, layout: &Layout) -> Result<Vec<String>> {
    let dir = project.join(&layout.exec_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    let entries = fs::read_dir(&dir)
        .with_context(|| format!("failed to read exec-data directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}
