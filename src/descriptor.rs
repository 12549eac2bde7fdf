//! The package descriptor of the continuable header-only library.

use anyhow::{Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::export::{ExportReport, ExportRule, export_package};
use crate::identity::{BinaryCompatibility, BuildSettings, PackageIdentity, compute_identity};
use crate::reference::DependencyReference;
use crate::runtime::Runtime;
use crate::vcs::{ScmInfo, TagMatch, resolve_scm, resolve_version};

pub const NAME: &str = "continuable";
pub const LICENSE: &str = "MIT";
pub const URL: &str = "https://github.com/Naios/continuable";
pub const AUTHOR: &str = "Denis Blank (denis.blank@outlook.com)";
pub const DESCRIPTION: &str = "C++14 asynchronous allocation aware futures";
pub const HOMEPAGE: &str = "https://naios.github.io/continuable/";

pub const LICENSE_FILE: &str = "LICENSE.txt";
const LICENSE_DIR: &str = "licenses";
const INCLUDE_DIR: &str = "include/";
const REQUIRES: &[&str] = &["function2/4.0.0@naios/stable"];

/// Declarative packaging record, built once per invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Option<String>,
    pub license: String,
    pub author: String,
    pub description: String,
    pub url: String,
    pub homepage: String,
    pub exports: Vec<ExportRule>,
    pub requires: Vec<DependencyReference>,
    pub binary_compatibility: BinaryCompatibility,
    pub scm: Option<ScmInfo>,
    pub no_copy_source: bool,
    #[serde(skip)]
    pub source: PathBuf,
}

impl PackageDescriptor {
    /// Descriptor for the sources in `source` with an explicit version.
    pub fn new(source: &Path, version: Option<String>) -> Result<Self> {
        let requires = REQUIRES
            .iter()
            .map(|r| DependencyReference::parse(r))
            .collect::<Result<Vec<_>>>()?;

        let descriptor = Self {
            name: NAME.to_string(),
            version,
            license: LICENSE.to_string(),
            author: AUTHOR.to_string(),
            description: DESCRIPTION.to_string(),
            url: URL.to_string(),
            homepage: HOMEPAGE.to_string(),
            exports: vec![
                ExportRule::new(LICENSE_FILE, LICENSE_DIR),
                ExportRule::new("include/*.hpp", ""),
                ExportRule::new("include/*.inl", ""),
            ],
            requires,
            binary_compatibility: BinaryCompatibility::HeaderOnly,
            scm: None,
            no_copy_source: true,
            source: source.to_path_buf(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Descriptor for `source`, with version and scm resolved from git.
    ///
    /// A tree without tags (or without git at all) yields `version == None`.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, source: &Path, tag_match: TagMatch) -> Result<Self> {
        let version = resolve_version(runtime, source, tag_match);
        let mut descriptor = Self::new(source, version)?;
        descriptor.scm = Some(resolve_scm(runtime, source));
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Package name must not be empty");
        }
        if self.license.trim().is_empty() {
            bail!("Package license must not be empty");
        }
        for rule in &self.exports {
            let in_include = rule.pattern.starts_with(INCLUDE_DIR) && rule.dst.is_empty();
            let is_license = rule.pattern == LICENSE_FILE && rule.dst == LICENSE_DIR;
            if !in_include && !is_license {
                bail!(
                    "Export rule '{}' -> '{}' reaches outside include/ and the license folder",
                    rule.pattern,
                    rule.dst
                );
            }
        }
        Ok(())
    }

    /// Copy license and headers into `destination`.
    pub fn export_package<R: Runtime>(&self, runtime: &R, destination: &Path) -> Result<ExportReport> {
        export_package(runtime, &self.source, &self.exports, destination)
    }

    /// Identity of this package under `settings`.
    pub fn compute_package_identity(&self, settings: &BuildSettings) -> PackageIdentity {
        compute_identity(
            &self.name,
            self.version.as_deref(),
            &self.requires,
            self.binary_compatibility,
            settings,
        )
    }

    pub fn declare_dependencies(&self) -> &[DependencyReference] {
        &self.requires
    }
}
