//! Execution-data file loading.
//!
//! Locates one recorded execution-data file under a project's exec-data
//! subdirectory and hands it to the engine's loader. A failure here is fatal
//! for that file only; the batch driver owns the isolation boundary.

use anyhow::{Context, Result};
use std::path::Path;

use crate::engine::{Engine, ExecFileData};
use crate::layout::Layout;

pub fn load<E: Engine>(
    engine: &E,
    project: &Path,
    layout: &Layout,
    exec_name: &str,
) -> Result<ExecFileData> {
    let path = project.join(&layout.exec_dir).join(exec_name);
    engine
        .load(&path)
        .with_context(|| format!("failed to load execution data: {}", path.display()))
}
