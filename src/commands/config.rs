use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::cache::default_cache_root;
use crate::descriptor::PackageDescriptor;
use crate::runtime::Runtime;
use crate::vcs::TagMatch;

/// Settings shared by every command.
pub struct Config<R: Runtime> {
    pub runtime: R,
    /// Root of the library checkout (contains `include/` and `LICENSE.txt`).
    pub source: PathBuf,
    pub tag_match: TagMatch,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, source: Option<PathBuf>, exact_tag: bool) -> Result<Self> {
        let source = match source {
            Some(path) => path,
            None => std::env::current_dir().context("Could not determine current directory")?,
        };
        let tag_match = if exact_tag {
            TagMatch::Exact
        } else {
            TagMatch::Nearest
        };
        debug!("Using source {} ({:?} tag match)", source.display(), tag_match);

        Ok(Self {
            runtime,
            source,
            tag_match,
        })
    }

    pub fn descriptor(&self) -> Result<PackageDescriptor> {
        PackageDescriptor::load(&self.runtime, &self.source, self.tag_match)
    }

    pub fn cache_root(&self, cache: Option<PathBuf>) -> Result<PathBuf> {
        match cache {
            Some(path) => Ok(path),
            None => default_cache_root(&self.runtime),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_explicit_source_and_exact_tag() {
        let config = Config::new(MockRuntime::new(), Some(PathBuf::from("/src")), true).unwrap();
        assert_eq!(config.source, PathBuf::from("/src"));
        assert_eq!(config.tag_match, TagMatch::Exact);
    }

    #[test]
    fn test_defaults_to_current_dir() {
        let config = Config::new(MockRuntime::new(), None, false).unwrap();
        assert_eq!(config.source, std::env::current_dir().unwrap());
        assert_eq!(config.tag_match, TagMatch::Nearest);
    }

    #[test]
    fn test_cache_root_override() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().never();
        let config = Config::new(runtime, Some(PathBuf::from("/src")), false).unwrap();

        assert_eq!(
            config.cache_root(Some(PathBuf::from("/cache"))).unwrap(),
            PathBuf::from("/cache")
        );
    }
}
