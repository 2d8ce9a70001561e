//! Batch driver.
//!
//! Enumerates every project's execution-data files and runs the per-file
//! pipeline (load, analyze, emit) once per file. Each file passes through a
//! failure-isolating boundary: a bad file is recorded and its siblings still
//! get their reports. Only a missing classpath declaration aborts the run.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

use crate::analysis;
use crate::classpath;
use crate::emit;
use crate::engine::{Engine, SourceLocator};
use crate::layout::{self, Layout};
use crate::loader;

/// Pipeline stage a file failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Analyze,
    Emit,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub project: String,
    pub exec_file: String,
    pub stage: Stage,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub root: String,
    pub projects: usize,
    pub exec_files: usize,
    pub reports_written: usize,
    pub skipped_entries: usize,
    pub failures: Vec<FileFailure>,
}

pub struct Batch<E: Engine> {
    engine: E,
    layout: Layout,
}

impl<E: Engine> Batch<E> {
    pub fn new(engine: E, layout: Layout) -> Self {
        Self { engine, layout }
    }

    pub fn run(&self, root: &Path) -> Result<BatchSummary> {
        let projects = layout::discover_projects(root, &self.layout)?;
        info!(root = %root.display(), projects = projects.len(), "starting batch");

        let mut summary = BatchSummary {
            root: root.to_string_lossy().to_string(),
            projects: projects.len(),
            exec_files: 0,
            reports_written: 0,
            skipped_entries: 0,
            failures: Vec::new(),
        };
        for project in &projects {
            self.run_project(project, &mut summary)?;
        }
        info!(
            reports = summary.reports_written,
            failures = summary.failures.len(),
            "batch finished"
        );
        Ok(summary)
    }

    fn run_project(&self, project: &Path, summary: &mut BatchSummary) -> Result<()> {
        let exec_files = layout::list_exec_files(project, &self.layout)?;
        if exec_files.is_empty() {
            debug!(project = %project.display(), "no execution data, nothing to do");
            return Ok(());
        }

        // Missing declaration is fatal for the whole run, so resolve before
        // touching any of this project's files.
        let entries = classpath::resolve(project, &self.layout)?;
        let title = layout::project_title(project);

        for exec_name in exec_files {
            summary.exec_files += 1;
            match self.generate_one(project, &title, &exec_name, &entries) {
                Ok(skipped) => {
                    summary.reports_written += 1;
                    summary.skipped_entries += skipped;
                }
                Err((stage, err)) => {
                    error!(
                        project = %title,
                        exec_file = %exec_name,
                        stage = ?stage,
                        error = %format!("{err:#}"),
                        "report generation failed"
                    );
                    summary.failures.push(FileFailure {
                        project: title.clone(),
                        exec_file: exec_name,
                        stage,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// One execution-data file through load, analyze, emit. Returns the count
    /// of skipped classpath entries on success, the failing stage otherwise.
    fn generate_one(
        &self,
        project: &Path,
        title: &str,
        exec_name: &str,
        entries: &[String],
    ) -> std::result::Result<usize, (Stage, anyhow::Error)> {
        let data = loader::load(&self.engine, project, &self.layout, exec_name)
            .map_err(|err| (Stage::Load, err))?;

        let classes_dir = project.join(&self.layout.classes_dir);
        let analysis = analysis::run(&self.engine, &data, &classes_dir, entries, title)
            .map_err(|err| (Stage::Analyze, err))?;

        let report_file = project
            .join(&self.layout.report_dir)
            .join(format!("{exec_name}.xml"));
        let sources = SourceLocator::new(project.join(&self.layout.sources_dir));
        emit::write_report(&self.engine, &analysis.bundle, &data, &report_file, &sources)
            .map_err(|err| (Stage::Emit, err))?;

        Ok(analysis.skipped.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        Analyzer, ClassCoverage, CoverageBundle, ExecFileData, ReportVisitor, SessionInfo,
    };
    use crate::error::MissingClasspath;
    use anyhow::bail;
    use std::fs;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "exec_report_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    /// Minimal engine standing in for the real one: execution data is valid
    /// unless the file starts with `corrupt`, analysis accepts any existing
    /// location, and reports are one line of text per protocol call.
    struct FakeEngine;

    struct FakeAnalyzer {
        classes: Vec<ClassCoverage>,
    }

    struct FakeVisitor {
        out: Box<dyn Write>,
    }

    impl Engine for FakeEngine {
        type Analyzer = FakeAnalyzer;
        type Visitor = FakeVisitor;

        fn load(&self, exec_file: &Path) -> Result<ExecFileData> {
            let bytes = fs::read(exec_file)?;
            if bytes.starts_with(b"corrupt") {
                bail!("unreadable execution data: {}", exec_file.display());
            }
            Ok(ExecFileData {
                sessions: vec![SessionInfo {
                    id: "fake".to_string(),
                    start: 0,
                    dump: 0,
                }],
                records: Vec::new(),
            })
        }

        fn analyzer(&self, _data: &ExecFileData) -> Self::Analyzer {
            FakeAnalyzer {
                classes: Vec::new(),
            }
        }

        fn visitor(&self, out: Box<dyn Write>) -> Result<Self::Visitor> {
            Ok(FakeVisitor { out })
        }
    }

    impl Analyzer for FakeAnalyzer {
        fn analyze_all(&mut self, location: &Path) -> Result<usize> {
            if !location.exists() {
                bail!("no such location: {}", location.display());
            }
            self.classes.push(ClassCoverage {
                name: location
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                source_file: None,
                covered: 1,
                missed: 0,
            });
            Ok(1)
        }

        fn into_bundle(self, title: &str) -> CoverageBundle {
            CoverageBundle {
                title: title.to_string(),
                classes: self.classes,
            }
        }
    }

    impl ReportVisitor for FakeVisitor {
        fn visit_info(
            &mut self,
            sessions: &[SessionInfo],
            _records: &[crate::engine::ExecutionRecord],
        ) -> Result<()> {
            writeln!(self.out, "info {}", sessions.len())?;
            Ok(())
        }

        fn visit_bundle(
            &mut self,
            bundle: &CoverageBundle,
            _sources: &SourceLocator,
        ) -> Result<()> {
            writeln!(self.out, "bundle {} {}", bundle.title, bundle.classes.len())?;
            Ok(())
        }

        fn visit_end(&mut self) -> Result<()> {
            writeln!(self.out, "end")?;
            self.out.flush()?;
            Ok(())
        }
    }

    fn write_project(root: &Path, exec_files: &[(&str, &[u8])]) -> Result<()> {
        fs::create_dir_all(root.join("exec"))?;
        fs::create_dir_all(root.join("target"))?;
        fs::write(root.join("classpath.cp"), "")?;
        for (name, content) in exec_files {
            fs::write(root.join("exec").join(name), content)?;
        }
        Ok(())
    }

    #[test]
    fn one_report_per_exec_file() -> Result<()> {
        let project = temp_dir("batch_two_files");
        write_project(&project, &[("a.exec", b"ok"), ("b.exec", b"ok")])?;

        let batch = Batch::new(FakeEngine, Layout::default());
        let summary = batch.run(&project)?;

        assert_eq!(summary.projects, 1);
        assert_eq!(summary.exec_files, 2);
        assert_eq!(summary.reports_written, 2);
        assert!(summary.failures.is_empty());
        assert!(project.join("reports/a.exec.xml").is_file());
        assert!(project.join("reports/b.exec.xml").is_file());

        let content = fs::read_to_string(project.join("reports/a.exec.xml"))?;
        let title = layout::project_title(&project);
        assert_eq!(content, format!("info 1\nbundle {title} 1\nend\n"));

        let _ = fs::remove_dir_all(project);
        Ok(())
    }

    #[test]
    fn corrupt_file_does_not_block_siblings() -> Result<()> {
        let project = temp_dir("batch_isolation");
        write_project(&project, &[("bad.exec", b"corrupt"), ("good.exec", b"ok")])?;

        let batch = Batch::new(FakeEngine, Layout::default());
        let summary = batch.run(&project)?;

        assert_eq!(summary.exec_files, 2);
        assert_eq!(summary.reports_written, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].exec_file, "bad.exec");
        assert_eq!(summary.failures[0].stage, Stage::Load);
        assert!(summary.failures[0].error.contains("unreadable"));
        assert!(project.join("reports/good.exec.xml").is_file());
        assert!(!project.join("reports/bad.exec.xml").exists());

        let _ = fs::remove_dir_all(project);
        Ok(())
    }

    #[test]
    fn missing_classes_dir_fails_at_analyze_stage_only_for_that_project() -> Result<()> {
        let root = temp_dir("batch_analyze_fail");
        let broken = root.join("broken");
        let healthy = root.join("healthy");
        write_project(&broken, &[("a.exec", b"ok")])?;
        fs::remove_dir_all(broken.join("target"))?;
        write_project(&healthy, &[("a.exec", b"ok")])?;

        let batch = Batch::new(FakeEngine, Layout::default());
        let summary = batch.run(&root)?;

        assert_eq!(summary.projects, 2);
        assert_eq!(summary.reports_written, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].project, "broken");
        assert_eq!(summary.failures[0].stage, Stage::Analyze);
        assert!(healthy.join("reports/a.exec.xml").is_file());

        let _ = fs::remove_dir_all(root);
        Ok(())
    }

    #[test]
    fn missing_classpath_entry_is_counted_not_fatal() -> Result<()> {
        let project = temp_dir("batch_skip_entry");
        write_project(&project, &[("a.exec", b"ok")])?;
        let good_entry = project.join("lib");
        fs::create_dir_all(&good_entry)?;
        fs::write(
            project.join("classpath.cp"),
            format!(
                "{}{}{}",
                good_entry.display(),
                crate::classpath::PATH_SEPARATOR,
                project.join("gone.jar").display()
            ),
        )?;

        let batch = Batch::new(FakeEngine, Layout::default());
        let summary = batch.run(&project)?;

        assert_eq!(summary.reports_written, 1);
        assert_eq!(summary.skipped_entries, 1);
        assert!(summary.failures.is_empty());

        // The good entry and the classes dir both reached the analyzer.
        let content = fs::read_to_string(project.join("reports/a.exec.xml"))?;
        assert!(content.contains("bundle"));
        assert!(content.contains(" 2\n"));

        let _ = fs::remove_dir_all(project);
        Ok(())
    }

    #[test]
    fn missing_classpath_declaration_aborts_the_run() -> Result<()> {
        let root = temp_dir("batch_fatal_classpath");
        let first = root.join("a-ok");
        let second = root.join("b-undeclared");
        write_project(&first, &[("a.exec", b"ok")])?;
        write_project(&second, &[("b.exec", b"ok")])?;
        fs::remove_file(second.join("classpath.cp"))?;

        let batch = Batch::new(FakeEngine, Layout::default());
        let err = batch.run(&root).unwrap_err();
        assert!(err.downcast_ref::<MissingClasspath>().is_some());

        let _ = fs::remove_dir_all(root);
        Ok(())
    }

    #[test]
    fn empty_or_absent_exec_dir_completes_with_no_work() -> Result<()> {
        let project = temp_dir("batch_empty");
        fs::create_dir_all(project.join("exec"))?;
        // No classpath file either: with nothing to do that must not matter.

        let batch = Batch::new(FakeEngine, Layout::default());
        let summary = batch.run(&project)?;
        assert_eq!(summary.exec_files, 0);
        assert_eq!(summary.reports_written, 0);
        assert!(summary.failures.is_empty());
        assert!(!project.join("reports").exists());

        let bare_root = temp_dir("batch_no_projects");
        fs::create_dir_all(&bare_root)?;
        let summary = batch.run(&bare_root)?;
        assert_eq!(summary.projects, 0);
        assert_eq!(summary.reports_written, 0);

        let _ = fs::remove_dir_all(project);
        let _ = fs::remove_dir_all(bare_root);
        Ok(())
    }

    #[test]
    fn rerun_overwrites_reports_without_accumulation() -> Result<()> {
        let project = temp_dir("batch_idempotent");
        write_project(&project, &[("a.exec", b"ok")])?;

        let batch = Batch::new(FakeEngine, Layout::default());
        batch.run(&project)?;
        let first = fs::read_to_string(project.join("reports/a.exec.xml"))?;
        batch.run(&project)?;
        let second = fs::read_to_string(project.join("reports/a.exec.xml"))?;
        assert_eq!(first, second);

        let _ = fs::remove_dir_all(project);
        Ok(())
    }
}
