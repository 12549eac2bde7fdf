//! Best-effort git queries.
//!
//! Everything here is optional metadata: a missing `git` binary, a source tree
//! that is not a repository, or a repository without tags must never abort
//! packaging. Failures are logged at debug level and surface as `None`.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

const GIT: &str = "git";

/// How strictly `git describe` should match a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    /// Nearest reachable tag (`--abbrev=0`).
    #[default]
    Nearest,
    /// Only a tag pointing at HEAD (`--exact-match`).
    Exact,
}

impl TagMatch {
    fn describe_args(self) -> Vec<String> {
        let mut args = vec![
            "describe".to_string(),
            "--tags".to_string(),
            "--abbrev=0".to_string(),
        ];
        if self == TagMatch::Exact {
            args.push("--exact-match".to_string());
        }
        args
    }
}

/// Source control coordinates of the packaged tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScmInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Option<String>,
    pub revision: Option<String>,
}

/// Resolve the package version from the tag history of `repo`.
///
/// Returns the tag text verbatim (a `v` prefix is kept).
#[tracing::instrument(skip(runtime))]
pub fn resolve_version<R: Runtime>(runtime: &R, repo: &Path, mode: TagMatch) -> Option<String> {
    match git_query(runtime, repo, &mode.describe_args()) {
        Ok(tag) => Some(tag),
        Err(e) => {
            debug!("No version tag found in {}: {:#}", repo.display(), e);
            None
        }
    }
}

/// Resolve origin URL and HEAD revision of `repo`.
#[tracing::instrument(skip(runtime))]
pub fn resolve_scm<R: Runtime>(runtime: &R, repo: &Path) -> ScmInfo {
    let url = git_query(runtime, repo, &args(&["remote", "get-url", "origin"]))
        .map_err(|e| debug!("Could not resolve scm url: {:#}", e))
        .ok();
    let revision = git_query(runtime, repo, &args(&["rev-parse", "HEAD"]))
        .map_err(|e| debug!("Could not resolve scm revision: {:#}", e))
        .ok();

    ScmInfo {
        kind: GIT.to_string(),
        url,
        revision,
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Run a git query and return its trimmed, non-empty stdout.
fn git_query<R: Runtime>(runtime: &R, repo: &Path, args: &[String]) -> Result<String> {
    let output = runtime.run_command(GIT, args, repo)?;
    if !output.success {
        bail!("git {} failed: {}", args.join(" "), output.stderr.trim());
    }

    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("git {} returned non-UTF-8 output", args.join(" ")))?;
    let value = stdout.trim();
    if value.is_empty() {
        bail!("git {} returned no output", args.join(" "));
    }
    Ok(value.to_string())
}
