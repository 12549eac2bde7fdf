//! Reproducible `.tgz` archives of exported packages.

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::info;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, is_path_under, resolve_path};

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

/// Pack the contents of `dir` into a gzip tarball at `output`.
///
/// Entries are sorted and carry fixed metadata (mode, mtime 0, uid/gid 0),
/// so packing the same tree twice produces the same bytes.
#[tracing::instrument(skip(runtime))]
pub fn pack_directory<R: Runtime>(runtime: &R, dir: &Path, output: &Path) -> Result<usize> {
    if !runtime.is_dir(dir) {
        bail!("Cannot archive {}: not a directory", dir.display());
    }
    let dir_root = runtime.canonicalize(dir)?;
    if is_path_under(&resolve_path(runtime, output)?, &dir_root) {
        bail!(
            "Archive {} must not be written inside {}",
            output.display(),
            dir.display()
        );
    }

    let mut entries = Vec::new();
    walk(runtime, dir, dir, &mut entries)?;
    entries.sort();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        runtime.create_dir_all(parent)?;
    }
    let writer = runtime.create_file(output)?;
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut count = 0;
    for (relative, path, is_dir) in &entries {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        if *is_dir {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(DIR_MODE);
            header.set_size(0);
            builder
                .append_data(&mut header, format!("{}/", relative), std::io::empty())
                .with_context(|| format!("Failed to add {} to archive", relative))?;
        } else {
            let mut data = Vec::new();
            runtime.open(path)?.read_to_end(&mut data)?;
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(FILE_MODE);
            header.set_size(data.len() as u64);
            builder
                .append_data(&mut header, relative, data.as_slice())
                .with_context(|| format!("Failed to add {} to archive", relative))?;
            count += 1;
        }
    }

    builder
        .into_inner()
        .context("Failed to finish tar stream")?
        .finish()
        .context("Failed to finish gzip stream")?;

    info!("Packed {} files into {}", count, output.display());
    Ok(count)
}

/// Collect `(relative path, absolute path, is_dir)` for everything under `dir`.
/// Directory symlinks are not followed.
fn walk<R: Runtime>(
    runtime: &R,
    root: &Path,
    dir: &Path,
    out: &mut Vec<(String, PathBuf, bool)>,
) -> Result<()> {
    for entry in runtime.read_dir(dir)? {
        let relative = pathdiff::diff_paths(&entry, root)
            .with_context(|| format!("{} is not under {}", entry.display(), root.display()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if runtime.is_dir(&entry) {
            if runtime.is_symlink(&entry) {
                continue;
            }
            out.push((relative, entry.clone(), true));
            walk(runtime, root, &entry, out)?;
        } else {
            out.push((relative, entry, false));
        }
    }
    Ok(())
}
