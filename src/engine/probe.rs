//! Structural analysis of class directories and archives.
//!
//! Classes are enumerated from the filesystem and scored against the probe
//! arrays recorded in the execution data: a class with a record contributes
//! its hit and unhit probe counts, a class the agent never saw contributes
//! zero counters. Coverage needing class-file internals (instruction, branch
//! and line counters) is out of this engine's scope.

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use memmap2::Mmap;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

use super::{Analyzer, ClassCoverage, CoverageBundle, ExecFileData};

pub struct ProbeAnalyzer {
    /// Hit/unhit probe counts per VM class name.
    probes: HashMap<String, (usize, usize)>,
    seen: HashSet<String>,
    classes: Vec<ClassCoverage>,
}

impl ProbeAnalyzer {
    pub fn new(data: &ExecFileData) -> Self {
        let mut probes = HashMap::new();
        for record in &data.records {
            let covered = record.probes.iter().filter(|p| **p).count();
            probes.insert(record.name.clone(), (covered, record.probes.len() - covered));
        }
        Self {
            probes,
            seen: HashSet::new(),
            classes: Vec::new(),
        }
    }

    fn add_class(&mut self, name: String) {
        if !self.seen.insert(name.clone()) {
            return;
        }
        let (covered, missed) = self.probes.get(&name).copied().unwrap_or((0, 0));
        let source_file = source_file_for(&name);
        self.classes.push(ClassCoverage {
            name,
            source_file,
            covered,
            missed,
        });
    }

    fn analyze_directory(&mut self, dir: &Path) -> Result<usize> {
        let mut added = 0usize;
        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build();

        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk: {}", dir.display()))?;
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "class") {
                continue;
            }
            let relative = path.strip_prefix(dir).unwrap_or(path);
            let name = relative.to_string_lossy().replace('\\', "/");
            if let Some(class_name) = class_name_of(&name) {
                let before = self.seen.len();
                self.add_class(class_name);
                added += self.seen.len() - before;
            }
        }
        Ok(added)
    }

    fn analyze_archive(&mut self, archive_path: &Path) -> Result<usize> {
        let file = File::open(archive_path)
            .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
        // SAFETY: The file is opened read-only and remains valid for the lifetime of the mmap.
        // The mmap is dropped before the file, ensuring memory safety.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to mmap archive: {}", archive_path.display()))?;
        let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
            .with_context(|| format!("failed to read zip structure: {}", archive_path.display()))?;

        let mut added = 0usize;
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if let Some(class_name) = class_name_of(entry.name()) {
                let before = self.seen.len();
                self.add_class(class_name);
                added += self.seen.len() - before;
            }
        }
        Ok(added)
    }
}

impl Analyzer for ProbeAnalyzer {
    fn analyze_all(&mut self, location: &Path) -> Result<usize> {
        if location.is_dir() {
            return self.analyze_directory(location);
        }
        if !location.is_file() {
            bail!("classpath entry does not exist: {}", location.display());
        }
        let is_archive = location
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"));
        if !is_archive {
            bail!(
                "classpath entry is neither a directory nor an archive: {}",
                location.display()
            );
        }
        self.analyze_archive(location)
    }

    fn into_bundle(mut self, title: &str) -> CoverageBundle {
        self.classes.sort_by(|a, b| a.name.cmp(&b.name));
        CoverageBundle {
            title: title.to_string(),
            classes: self.classes,
        }
    }
}

/// VM class name for a `.class` entry path, or `None` for entries that carry
/// no coverage: `module-info` and `META-INF` multi-release copies.
fn class_name_of(entry_name: &str) -> Option<String> {
    let name = entry_name.strip_suffix(".class")?;
    if name.starts_with("META-INF/") {
        return None;
    }
    let simple = name.rsplit('/').next().unwrap_or(name);
    if simple == "module-info" {
        return None;
    }
    Some(name.to_string())
}

/// Source file a class is attributed to: nested classes belong to the file of
/// their outermost class.
fn source_file_for(class_name: &str) -> Option<String> {
    let simple = class_name.rsplit('/').next().unwrap_or(class_name);
    let outer = simple.split('$').next().unwrap_or(simple);
    if outer.is_empty() {
        return None;
    }
    Some(format!("{outer}.java"))
}
