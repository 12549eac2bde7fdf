//! Package identity: the key a package cache uses to deduplicate builds.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::reference::DependencyReference;

/// How the build configuration participates in the package identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryCompatibility {
    /// Source-only package: every configuration shares one identity.
    #[default]
    HeaderOnly,
    /// Compiled package: each configuration gets its own identity.
    PerConfiguration,
}

/// Build configuration supplied by the caller (compiler, os, arch, build_type, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildSettings {
    values: BTreeMap<String, String>,
}

impl BuildSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Parse `key=value` assignments, e.g. `compiler=gcc`.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut settings = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, value) = assignment
                .split_once('=')
                .with_context(|| format!("Invalid setting '{}': expected key=value", assignment))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                bail!("Invalid setting '{}': expected key=value", assignment);
            }
            settings.values.insert(key.to_string(), value.to_string());
        }
        Ok(settings)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Hex-encoded SHA-256 identity of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIdentity(String);

impl PackageIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical text the identity is hashed from.
///
/// Sections are always emitted in the same order and settings are sorted by
/// key, so equal inputs always produce equal text.
pub fn identity_text(
    name: &str,
    version: Option<&str>,
    requires: &[DependencyReference],
    mode: BinaryCompatibility,
    settings: &BuildSettings,
) -> String {
    let mut text = String::new();
    text.push_str("[package]\n");
    text.push_str(&format!("name={}\n", name));
    text.push_str(&format!("version={}\n", version.unwrap_or("")));

    text.push_str("[settings]\n");
    if mode == BinaryCompatibility::PerConfiguration {
        for (key, value) in settings.iter() {
            text.push_str(&format!("{}={}\n", key, value));
        }
    }

    text.push_str("[requires]\n");
    let mut refs: Vec<String> = requires.iter().map(ToString::to_string).collect();
    refs.sort();
    for r in refs {
        text.push_str(&r);
        text.push('\n');
    }
    text
}

#[tracing::instrument(skip(requires, settings))]
pub fn compute_identity(
    name: &str,
    version: Option<&str>,
    requires: &[DependencyReference],
    mode: BinaryCompatibility,
    settings: &BuildSettings,
) -> PackageIdentity {
    let text = identity_text(name, version, requires, mode, settings);
    PackageIdentity(hex::encode(Sha256::digest(text.as_bytes())))
}
