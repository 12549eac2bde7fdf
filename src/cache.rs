//! Local package cache.
//!
//! Layout: `<root>/<name>/<version>/<package_id>/package/` holds the exported
//! files and `<root>/<name>/<version>/<package_id>/info.json` describes them.
//! Packages without a resolved version live under the `~untagged` version
//! folder; `~` is not allowed in git ref names, so no tag can collide with it.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::descriptor::PackageDescriptor;
use crate::identity::{BuildSettings, PackageIdentity};
use crate::reference::DependencyReference;
use crate::runtime::Runtime;

const UNVERSIONED: &str = "~untagged";
const PACKAGE_DIR: &str = "package";
const INFO_FILE: &str = "info.json";

/// Contents of `info.json` next to a cached package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: Option<String>,
    pub package_id: PackageIdentity,
    pub requires: Vec<DependencyReference>,
    pub files: Vec<PathBuf>,
}

pub struct PackageCache<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> PackageCache<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    fn version_dir(&self, name: &str, version: Option<&str>) -> PathBuf {
        self.root.join(name).join(version.unwrap_or(UNVERSIONED))
    }

    /// Export `descriptor` into the cache under its identity for `settings`.
    ///
    /// An existing package with the same identity is replaced.
    #[tracing::instrument(skip(self, descriptor, settings))]
    pub fn create(
        &self,
        descriptor: &PackageDescriptor,
        settings: &BuildSettings,
    ) -> Result<PackageInfo> {
        let package_id = descriptor.compute_package_identity(settings);
        let id_dir = self
            .version_dir(&descriptor.name, descriptor.version.as_deref())
            .join(package_id.as_str());
        let package_dir = id_dir.join(PACKAGE_DIR);

        if self.runtime.exists(&package_dir) {
            debug!("Replacing cached package {}", package_dir.display());
            self.runtime.remove_dir_all(&package_dir)?;
        }

        let report = descriptor.export_package(self.runtime, &package_dir)?;

        let info = PackageInfo {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            package_id,
            requires: descriptor.requires.clone(),
            files: report.files,
        };
        let json = serde_json::to_string_pretty(&info)?;
        self.runtime.write(&id_dir.join(INFO_FILE), json.as_bytes())?;

        info!("Created package {} in {}", info.package_id, package_dir.display());
        Ok(info)
    }

    /// Folder holding the files of a cached package.
    pub fn package_dir(&self, name: &str, version: Option<&str>, id: &PackageIdentity) -> PathBuf {
        self.version_dir(name, version)
            .join(id.as_str())
            .join(PACKAGE_DIR)
    }

    /// Info of every cached package of `name`/`version`, sorted by identity.
    #[tracing::instrument(skip(self))]
    pub fn list(&self, name: &str, version: Option<&str>) -> Result<Vec<PackageInfo>> {
        let dir = self.version_dir(name, version);
        if !self.runtime.exists(&dir) {
            return Ok(Vec::new());
        }

        let mut infos = Vec::new();
        for id_dir in self.runtime.read_dir(&dir)? {
            let info_path = id_dir.join(INFO_FILE);
            if !self.runtime.exists(&info_path) {
                continue;
            }
            let content = self.runtime.read_to_string(&info_path)?;
            let info: PackageInfo = serde_json::from_str(&content)
                .with_context(|| format!("Corrupt package info {}", info_path.display()))?;
            infos.push(info);
        }
        infos.sort_by(|a, b| a.package_id.as_str().cmp(b.package_id.as_str()));
        Ok(infos)
    }
}

/// Default cache root: `~/.hdrpack/data`.
pub fn default_cache_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home.join(".hdrpack").join("data"))
}
