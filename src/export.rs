//! Copy the redistributable files of a source tree into a package folder.

use anyhow::{Context, Result, bail};
use glob::{MatchOptions, Pattern};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, resolve_path};

/// Directories never descended into while collecting sources.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// One `copy` instruction: files under the source root matching `pattern`
/// land in `<destination>/<dst>/<relative path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRule {
    pub pattern: String,
    pub dst: String,
}

impl ExportRule {
    pub fn new(pattern: &str, dst: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            dst: dst.to_string(),
        }
    }

    fn compile(&self) -> Result<Pattern> {
        Pattern::new(&self.pattern)
            .with_context(|| format!("Invalid export pattern '{}'", self.pattern))
    }
}

/// Files written by an export, relative to the destination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportReport {
    pub files: Vec<PathBuf>,
    pub bytes: u64,
}

/// `*` crosses directory boundaries so `include/*.hpp` also picks up nested headers.
fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

/// Copy every file of `source` matched by `rules` into `destination`.
///
/// Running it twice against the same destination leaves identical contents.
/// Fails when the destination is the source tree itself, when it is not
/// writable, or when no rule matched any file. A destination nested inside the
/// source tree is never collected as a source.
#[tracing::instrument(skip(runtime, rules))]
pub fn export_package<R: Runtime>(
    runtime: &R,
    source: &Path,
    rules: &[ExportRule],
    destination: &Path,
) -> Result<ExportReport> {
    let patterns = rules
        .iter()
        .map(|rule| -> Result<_> { Ok((rule, rule.compile()?)) })
        .collect::<Result<Vec<_>>>()?;

    if !runtime.is_dir(source) {
        bail!("Source directory {} does not exist", source.display());
    }
    let source_root = runtime.canonicalize(source)?;
    let dest_root = resolve_path(runtime, destination)?;
    if dest_root == source_root {
        bail!(
            "Destination {} is the source tree; exporting would overwrite the sources",
            destination.display()
        );
    }

    let sources = collect_files(runtime, &source_root, &dest_root)?;
    debug!("Found {} files under {}", sources.len(), source.display());

    // destination-relative path -> source file
    let mut plan: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    for (rule, pattern) in &patterns {
        let mut matched = 0;
        for entry in &sources {
            if pattern.matches_with(&entry.key, match_options()) {
                let target = Path::new(&rule.dst).join(&entry.relative);
                plan.insert(target, entry.path.clone());
                matched += 1;
            }
        }
        if matched == 0 {
            warn!("Export pattern '{}' matched no files", rule.pattern);
        }
    }

    if plan.is_empty() {
        bail!(
            "No files under {} match the export patterns; is the source tree complete?",
            source.display()
        );
    }

    runtime
        .create_dir_all(destination)
        .with_context(|| format!("Destination {} is not writable", destination.display()))?;

    let mut report = ExportReport::default();
    for (target, file) in plan {
        let dest_path = destination.join(&target);
        if let Some(parent) = dest_path.parent() {
            runtime.create_dir_all(parent)?;
        }
        report.bytes += runtime.copy(&file, &dest_path)?;
        debug!("Exported {} -> {}", file.display(), dest_path.display());
        report.files.push(target);
    }

    info!(
        "Exported {} files ({} bytes) to {}",
        report.files.len(),
        report.bytes,
        destination.display()
    );
    Ok(report)
}

/// A file found under the source root.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SourceFile {
    /// Relative path with '/' separators, used only for pattern matching.
    key: String,
    relative: PathBuf,
    path: PathBuf,
}

/// Recursively list files under `root`, skipping `exclude` and symlinked directories.
fn collect_files<R: Runtime>(runtime: &R, root: &Path, exclude: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in runtime.read_dir(&dir)? {
            if runtime.is_dir(&entry) {
                let vcs_dir = entry
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| SKIPPED_DIRS.contains(&n));
                if runtime.is_symlink(&entry) {
                    debug!("Not following directory symlink {}", entry.display());
                } else if entry == exclude {
                    debug!("Skipping export destination {}", entry.display());
                } else if !vcs_dir {
                    pending.push(entry);
                }
                continue;
            }

            let relative = pathdiff::diff_paths(&entry, root)
                .with_context(|| format!("{} is not under {}", entry.display(), root.display()))?;
            files.push(SourceFile {
                key: to_slash(&relative),
                relative,
                path: entry,
            });
        }
    }

    files.sort();
    Ok(files)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
