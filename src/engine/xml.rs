//! XML report output.
//!
//! Implements the report-visitor protocol: session metadata arrives first,
//! then the single coverage bundle, then finalization. The document is
//! assembled when the bundle arrives (the report element is named after the
//! bundle title) and flushed on `visit_end`, so the output file is complete
//! only once the protocol has run to the end. Package ordering is sorted to
//! keep the output byte-stable across runs.

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::io::Write;

use super::{CoverageBundle, ExecutionRecord, ReportVisitor, SessionInfo, SourceLocator};

pub struct XmlVisitor {
    out: Box<dyn Write>,
    sessions: Option<Vec<SessionInfo>>,
    report_open: bool,
    finished: bool,
}

impl XmlVisitor {
    pub fn open(out: Box<dyn Write>) -> Result<Self> {
        Ok(Self {
            out,
            sessions: None,
            report_open: false,
            finished: false,
        })
    }

    fn write_counter(&mut self, indent: &str, kind: &str, missed: usize, covered: usize) -> Result<()> {
        writeln!(
            self.out,
            r#"{indent}<counter type="{kind}" missed="{missed}" covered="{covered}"/>"#
        )?;
        Ok(())
    }
}

impl ReportVisitor for XmlVisitor {
    fn visit_info(&mut self, sessions: &[SessionInfo], _records: &[ExecutionRecord]) -> Result<()> {
        if self.sessions.is_some() {
            bail!("visit_info called twice");
        }
        self.sessions = Some(sessions.to_vec());
        Ok(())
    }

    fn visit_bundle(&mut self, bundle: &CoverageBundle, sources: &SourceLocator) -> Result<()> {
        let Some(sessions) = self.sessions.take() else {
            bail!("visit_info must be called before visit_bundle");
        };
        if self.report_open {
            bail!("reports hold a single bundle, visit_bundle called twice");
        }
        self.report_open = true;

        writeln!(self.out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(self.out, r#"<report name="{}">"#, escape(&bundle.title))?;
        for session in &sessions {
            writeln!(
                self.out,
                r#"  <sessioninfo id="{}" start="{}" dump="{}"/>"#,
                escape(&session.id),
                session.start,
                session.dump
            )?;
        }

        let mut packages: BTreeMap<&str, Vec<&super::ClassCoverage>> = BTreeMap::new();
        for class in &bundle.classes {
            packages.entry(class.package()).or_default().push(class);
        }

        for (package, classes) in &packages {
            writeln!(self.out, r#"  <package name="{}">"#, escape(package))?;

            let mut source_files: BTreeMap<&str, usize> = BTreeMap::new();
            let mut covered = 0usize;
            let mut missed = 0usize;
            let mut classes_covered = 0usize;
            let mut classes_missed = 0usize;

            for class in classes {
                writeln!(
                    self.out,
                    r#"    <class name="{}"{}>"#,
                    escape(&class.name),
                    match &class.source_file {
                        Some(file) => format!(r#" sourcefilename="{}""#, escape(file)),
                        None => String::new(),
                    }
                )?;
                self.write_counter("      ", "PROBE", class.missed, class.covered)?;
                writeln!(self.out, "    </class>")?;

                covered += class.covered;
                missed += class.missed;
                if class.covered > 0 {
                    classes_covered += 1;
                } else {
                    classes_missed += 1;
                }
                if let Some(file) = &class.source_file
                    && !source_files.contains_key(file.as_str())
                    && let Some(content) = sources.lookup(package, file)
                {
                    source_files.insert(file, content.lines().count());
                }
            }

            for (file, lines) in &source_files {
                writeln!(
                    self.out,
                    r#"    <sourcefile name="{}" lines="{}"/>"#,
                    escape(file),
                    lines
                )?;
            }
            self.write_counter("    ", "PROBE", missed, covered)?;
            self.write_counter("    ", "CLASS", classes_missed, classes_covered)?;
            writeln!(self.out, "  </package>")?;
        }

        let classes_covered = bundle.classes.iter().filter(|c| c.covered > 0).count();
        self.write_counter("  ", "PROBE", bundle.missed_total(), bundle.covered_total())?;
        self.write_counter(
            "  ",
            "CLASS",
            bundle.classes.len() - classes_covered,
            classes_covered,
        )?;
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        if !self.report_open {
            bail!("visit_bundle must be called before visit_end");
        }
        if self.finished {
            bail!("visit_end called twice");
        }
        self.finished = true;
        writeln!(self.out, "</report>")?;
        self.out.flush()?;
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
