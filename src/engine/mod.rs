//! Contract with the coverage engine: execution-data loading, structural
//! analysis and the report-visitor protocol. The pipeline only talks to these
//! traits; `ProbeEngine` is the bundled implementation.

pub mod exec;
pub mod probe;
pub mod xml;

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One recording session found in an execution-data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    /// Session start, epoch milliseconds.
    pub start: i64,
    /// Dump time, epoch milliseconds.
    pub dump: i64,
}

/// Recorded probe data for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub id: i64,
    /// Class name in VM form, e.g. `org/example/Foo`.
    pub name: String,
    pub probes: Vec<bool>,
}

/// In-memory model of one execution-data file.
#[derive(Debug, Clone, Default)]
pub struct ExecFileData {
    pub sessions: Vec<SessionInfo>,
    pub records: Vec<ExecutionRecord>,
}

/// Coverage counters for one analyzed class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCoverage {
    /// Class name in VM form, e.g. `org/example/Foo`.
    pub name: String,
    /// Source file the class is attributed to, e.g. `Foo.java`.
    pub source_file: Option<String>,
    pub covered: usize,
    pub missed: usize,
}

impl ClassCoverage {
    /// Package prefix in VM form, empty for the default package.
    pub fn package(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }
}

/// Structural coverage model for one execution-data file.
#[derive(Debug, Clone, Default)]
pub struct CoverageBundle {
    pub title: String,
    pub classes: Vec<ClassCoverage>,
}

impl CoverageBundle {
    pub fn covered_total(&self) -> usize {
        self.classes.iter().map(|c| c.covered).sum()
    }

    pub fn missed_total(&self) -> usize {
        self.classes.iter().map(|c| c.missed).sum()
    }
}

/// Coverage engine seam. `load` parses one execution-data file, `analyzer`
/// binds the loaded data to a structural analyzer, `visitor` opens the report
/// protocol on an output stream.
pub trait Engine {
    type Analyzer: Analyzer;
    type Visitor: ReportVisitor;

    fn load(&self, exec_file: &Path) -> Result<ExecFileData>;

    fn analyzer(&self, data: &ExecFileData) -> Self::Analyzer;

    fn visitor(&self, out: Box<dyn Write>) -> Result<Self::Visitor>;
}

/// Accumulates structural coverage from binary locations.
pub trait Analyzer {
    /// Analyze one classpath location (a class directory or an archive) and
    /// return the number of classes it contributed. Classes already seen by
    /// this analyzer are not counted again.
    fn analyze_all(&mut self, location: &Path) -> Result<usize>;

    /// Finish analysis and key the accumulated bundle with the given title.
    fn into_bundle(self, title: &str) -> CoverageBundle;
}

/// Report output protocol. Calls arrive in a fixed order: `visit_info`, then
/// `visit_bundle` exactly once, then `visit_end`. The report is complete only
/// after `visit_end` returns.
pub trait ReportVisitor {
    fn visit_info(&mut self, sessions: &[SessionInfo], records: &[ExecutionRecord]) -> Result<()>;

    fn visit_bundle(&mut self, bundle: &CoverageBundle, sources: &SourceLocator) -> Result<()>;

    fn visit_end(&mut self) -> Result<()>;
}

/// Maps analyzed classes back to source files under a project's sources
/// directory. Sources are read as UTF-8 with tabs expanded to width 4; a file
/// that is missing or not valid UTF-8 simply yields no link.
#[derive(Debug, Clone)]
pub struct SourceLocator {
    root: PathBuf,
    tab_width: usize,
}

impl SourceLocator {
    pub fn new(root: PathBuf) -> Self {
        Self { root, tab_width: 4 }
    }

    pub fn lookup(&self, package: &str, file_name: &str) -> Option<String> {
        let path = if package.is_empty() {
            self.root.join(file_name)
        } else {
            self.root.join(package).join(file_name)
        };
        let content = fs::read_to_string(path).ok()?;
        Some(content.replace('\t', &" ".repeat(self.tab_width)))
    }
}

/// The bundled engine: block-framed execution-data files, probe-count
/// structural analysis, XML report output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeEngine;

impl Engine for ProbeEngine {
    type Analyzer = probe::ProbeAnalyzer;
    type Visitor = xml::XmlVisitor;

    fn load(&self, exec_file: &Path) -> Result<ExecFileData> {
        exec::read_exec_file(exec_file)
    }

    fn analyzer(&self, data: &ExecFileData) -> Self::Analyzer {
        probe::ProbeAnalyzer::new(data)
    }

    fn visitor(&self, out: Box<dyn Write>) -> Result<Self::Visitor> {
        xml::XmlVisitor::open(out)
    }
}
