use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "exec-report")]
#[command(about = "Batch-generate XML coverage reports from recorded execution data files")]
pub struct Cli {
    /// Project directory to batch over its exec-data subdirectory, or a
    /// directory containing such project directories.
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,
}
