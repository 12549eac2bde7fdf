use anyhow::Result;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{
    archive::pack_directory, cache::PackageCache, descriptor::PackageDescriptor,
    identity::BuildSettings, runtime::Runtime,
};

pub mod config;

use config::Config;

/// Print descriptor metadata, as text or JSON.
#[tracing::instrument(skip(config, out))]
pub fn info<R: Runtime, W: Write>(config: &Config<R>, json: bool, out: &mut W) -> Result<()> {
    let descriptor = config.descriptor()?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &descriptor)?;
        writeln!(out)?;
        return Ok(());
    }

    print_descriptor(&descriptor, out)
}

fn print_descriptor<W: Write>(d: &PackageDescriptor, out: &mut W) -> Result<()> {
    writeln!(out, "name:        {}", d.name)?;
    writeln!(out, "version:     {}", d.version.as_deref().unwrap_or("(none)"))?;
    writeln!(out, "license:     {}", d.license)?;
    writeln!(out, "author:      {}", d.author)?;
    writeln!(out, "description: {}", d.description)?;
    writeln!(out, "url:         {}", d.url)?;
    writeln!(out, "homepage:    {}", d.homepage)?;
    if let Some(scm) = &d.scm {
        writeln!(
            out,
            "scm:         {} {} @ {}",
            scm.kind,
            scm.url.as_deref().unwrap_or("(no remote)"),
            scm.revision.as_deref().unwrap_or("(no revision)")
        )?;
    }
    writeln!(out, "exports:")?;
    for rule in &d.exports {
        if rule.dst.is_empty() {
            writeln!(out, "  {}", rule.pattern)?;
        } else {
            writeln!(out, "  {} -> {}/", rule.pattern, rule.dst)?;
        }
    }
    writeln!(out, "requires:")?;
    for r in d.declare_dependencies() {
        writeln!(out, "  {}", r)?;
    }
    Ok(())
}

/// Print the resolved version, or an empty line when the tree has no tag.
#[tracing::instrument(skip(config, out))]
pub fn version<R: Runtime, W: Write>(config: &Config<R>, out: &mut W) -> Result<()> {
    let descriptor = config.descriptor()?;
    writeln!(out, "{}", descriptor.version.as_deref().unwrap_or(""))?;
    Ok(())
}

/// Print one dependency reference per line.
#[tracing::instrument(skip(config, out))]
pub fn requires<R: Runtime, W: Write>(config: &Config<R>, out: &mut W) -> Result<()> {
    let descriptor = config.descriptor()?;
    for r in descriptor.declare_dependencies() {
        writeln!(out, "{}", r)?;
    }
    Ok(())
}

/// Print the package identity for the given `key=value` settings.
#[tracing::instrument(skip(config, out))]
pub fn package_id<R: Runtime, W: Write>(
    config: &Config<R>,
    settings: &[String],
    out: &mut W,
) -> Result<()> {
    let settings = BuildSettings::from_assignments(settings)?;
    let descriptor = config.descriptor()?;
    writeln!(out, "{}", descriptor.compute_package_identity(&settings))?;
    Ok(())
}

/// Export the package into `destination`, optionally packing it as a `.tgz`.
#[tracing::instrument(skip(config, out))]
pub fn export<R: Runtime, W: Write>(
    config: &Config<R>,
    destination: &Path,
    archive: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    let descriptor = config.descriptor()?;
    let report = descriptor.export_package(&config.runtime, destination)?;
    for file in &report.files {
        writeln!(out, "{}", file.display())?;
    }

    if let Some(archive) = archive {
        pack_directory(&config.runtime, destination, archive)?;
        info!("Wrote archive {}", archive.display());
    }
    Ok(())
}

/// Export the package into the local cache.
#[tracing::instrument(skip(config, out))]
pub fn create<R: Runtime, W: Write>(
    config: &Config<R>,
    settings: &[String],
    cache: Option<PathBuf>,
    out: &mut W,
) -> Result<()> {
    let settings = BuildSettings::from_assignments(settings)?;
    let descriptor = config.descriptor()?;
    let cache = PackageCache::new(&config.runtime, config.cache_root(cache)?);

    let package = cache.create(&descriptor, &settings)?;
    let package_dir = cache.package_dir(
        &package.name,
        package.version.as_deref(),
        &package.package_id,
    );
    writeln!(out, "{}", package.package_id)?;
    writeln!(out, "{}", package_dir.display())?;
    Ok(())
}

/// List the cached packages of the current name and version.
#[tracing::instrument(skip(config, out))]
pub fn list<R: Runtime, W: Write>(
    config: &Config<R>,
    cache: Option<PathBuf>,
    out: &mut W,
) -> Result<()> {
    let descriptor = config.descriptor()?;
    let cache = PackageCache::new(&config.runtime, config.cache_root(cache)?);

    let packages = cache.list(&descriptor.name, descriptor.version.as_deref())?;
    if packages.is_empty() {
        info!(
            "No cached packages for {} {}",
            descriptor.name,
            descriptor.version.as_deref().unwrap_or("(untagged)")
        );
    }
    for package in &packages {
        writeln!(out, "{}  {} files", package.package_id, package.files.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{CommandOutput, MockRuntime, RealRuntime};
    use std::fs;
    use tempfile::tempdir;

    fn tagged_runtime(tag: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_run_command().returning(move |_, args, _| {
            Ok(match (args[0].as_str(), tag) {
                ("describe", Some(tag)) => CommandOutput::ok(tag),
                ("describe", None) => CommandOutput::failed("fatal: No names found"),
                ("remote", _) => CommandOutput::failed("error: No such remote 'origin'"),
                _ => CommandOutput::ok("cafebabe"),
            })
        });
        runtime
    }

    fn config(runtime: MockRuntime) -> Config<MockRuntime> {
        Config::new(runtime, Some(PathBuf::from("/src")), false).unwrap()
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_version_prints_tag() {
        let mut buf = Vec::new();
        version(&config(tagged_runtime(Some("v4.0.0\n"))), &mut buf).unwrap();
        assert_eq!(output(buf), "v4.0.0\n");
    }

    #[test]
    fn test_version_prints_empty_line_without_tag() {
        let mut buf = Vec::new();
        version(&config(tagged_runtime(None)), &mut buf).unwrap();
        assert_eq!(output(buf), "\n");
    }

    #[test]
    fn test_requires() {
        let mut buf = Vec::new();
        requires(&config(tagged_runtime(None)), &mut buf).unwrap();
        assert_eq!(output(buf), "function2/4.0.0@naios/stable\n");
    }

    #[test]
    fn test_info_text() {
        let mut buf = Vec::new();
        info(&config(tagged_runtime(Some("v4.0.0"))), false, &mut buf).unwrap();
        let text = output(buf);
        assert!(text.contains("name:        continuable"));
        assert!(text.contains("version:     v4.0.0"));
        assert!(text.contains("LICENSE.txt -> licenses/"));
        assert!(text.contains("scm:         git (no remote) @ cafebabe"));
        assert!(text.contains("  function2/4.0.0@naios/stable"));
    }

    #[test]
    fn test_info_json() {
        let mut buf = Vec::new();
        info(&config(tagged_runtime(None)), true, &mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["name"], "continuable");
        assert!(json["version"].is_null());
        assert_eq!(json["scm"]["type"], "git");
    }

    #[test]
    fn test_package_id_is_configuration_independent() {
        let cfg = config(tagged_runtime(Some("v4.0.0")));
        let mut gcc = Vec::new();
        let mut msvc = Vec::new();
        package_id(&cfg, &["compiler=gcc".to_string(), "build_type=Release".to_string()], &mut gcc).unwrap();
        package_id(&cfg, &["compiler=msvc".to_string(), "build_type=Debug".to_string()], &mut msvc).unwrap();
        assert_eq!(gcc, msvc);
        assert_eq!(output(gcc).trim().len(), 64);
    }

    #[test]
    fn test_package_id_rejects_bad_setting() {
        let mut buf = Vec::new();
        let cfg = config(MockRuntime::new());
        assert!(package_id(&cfg, &["compiler".to_string()], &mut buf).is_err());
    }

    #[test]
    fn test_export_and_archive_with_real_fs() {
        let source = tempdir().unwrap();
        fs::create_dir_all(source.path().join("include/continuable")).unwrap();
        fs::write(source.path().join("LICENSE.txt"), "MIT").unwrap();
        fs::write(source.path().join("include/continuable/continuable.hpp"), "#pragma once").unwrap();
        let out_dir = tempdir().unwrap();
        let dest = out_dir.path().join("package");
        let archive = out_dir.path().join("package.tgz");

        // git runs against a plain directory and fails, which only drops the version
        let cfg = Config::new(RealRuntime, Some(source.path().to_path_buf()), false).unwrap();
        let mut buf = Vec::new();
        export(&cfg, &dest, Some(&archive), &mut buf).unwrap();

        let listed = output(buf);
        assert!(listed.contains("licenses"));
        assert!(listed.contains("continuable.hpp"));
        assert!(dest.join("licenses/LICENSE.txt").exists());
        assert!(archive.exists());
    }

    #[test]
    fn test_list_shows_created_package() {
        let source = tempdir().unwrap();
        fs::create_dir_all(source.path().join("include/continuable")).unwrap();
        fs::write(source.path().join("LICENSE.txt"), "MIT").unwrap();
        fs::write(source.path().join("include/continuable/continuable.hpp"), "#pragma once").unwrap();
        let cache_root = tempdir().unwrap();
        let cfg = Config::new(RealRuntime, Some(source.path().to_path_buf()), false).unwrap();

        let mut empty = Vec::new();
        list(&cfg, Some(cache_root.path().to_path_buf()), &mut empty).unwrap();
        assert!(empty.is_empty());

        let mut created = Vec::new();
        create(&cfg, &[], Some(cache_root.path().to_path_buf()), &mut created).unwrap();
        let id = output(created).lines().next().unwrap().to_string();

        let mut listed = Vec::new();
        list(&cfg, Some(cache_root.path().to_path_buf()), &mut listed).unwrap();
        assert_eq!(output(listed), format!("{}  2 files\n", id));
    }
}
