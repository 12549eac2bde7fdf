//! Fully-qualified package references (`name/version@user/channel`).

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pinned reference to an upstream package.
///
/// Every part is required so that resolution is deterministic: there are no
/// version ranges and no implicit default channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyReference {
    pub name: String,
    pub version: String,
    pub user: String,
    pub channel: String,
}

impl DependencyReference {
    pub fn new(name: &str, version: &str, user: &str, channel: &str) -> Result<Self> {
        validate_part("name", name)?;
        validate_part("version", version)?;
        validate_part("user", user)?;
        validate_part("channel", channel)?;
        validate_version(version)?;

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            user: user.to_string(),
            channel: channel.to_string(),
        })
    }

    /// Parse a reference in the `name/version@user/channel` form.
    pub fn parse(s: &str) -> Result<Self> {
        let Some((package, namespace)) = s.split_once('@') else {
            bail!("Invalid reference '{}': expected name/version@user/channel", s);
        };
        let (Some((name, version)), Some((user, channel))) =
            (package.split_once('/'), namespace.split_once('/'))
        else {
            bail!("Invalid reference '{}': expected name/version@user/channel", s);
        };

        Self::new(name, version, user, channel)
            .map_err(|e| anyhow::anyhow!("Invalid reference '{}': {}", s, e))
    }
}

fn validate_part(label: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{} must not be empty", label);
    }
    if value.contains(['/', '@']) || value.chars().any(char::is_whitespace) {
        bail!("{} '{}' contains a reserved character", label, value);
    }
    Ok(())
}

fn validate_version(version: &str) -> Result<()> {
    let floating = version == "*"
        || version.eq_ignore_ascii_case("latest")
        || version.starts_with(['^', '~', '<', '>', '='])
        || version.contains(['*', ',', '[', ']']);
    if floating {
        bail!("version '{}' is not an exact version", version);
    }
    Ok(())
}

impl fmt::Display for DependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}/{}",
            self.name, self.version, self.user, self.channel
        )
    }
}

impl FromStr for DependencyReference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
