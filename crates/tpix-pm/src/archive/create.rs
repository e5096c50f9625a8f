//! Bundle creation.

use std::fs::File;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use super::ExcludeRules;
use crate::{Result, TpixError};

/// Write a gzip-compressed tarball of `source_dir` to `output`.
///
/// The walk is sorted by file name. Excluded directories are pruned without
/// descending into them, and archive paths are relative to `source_dir` with
/// forward slashes. Symlinks are not archived. If `output` lies inside
/// `source_dir` it is left out of the archive.
///
/// Returns the number of entries written.
pub fn create_tar_gz(source_dir: &Path, rules: &ExcludeRules, output: &Path) -> Result<usize> {
    let outfile = File::create(output)?;
    let output_canonical = output.canonicalize().ok();

    let mut builder = tar::Builder::new(GzEncoder::new(outfile, Compression::default()));
    builder.follow_symlinks(false);

    let walker = WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let relative = archive_path(source_dir, entry.path());
            match rules.first_match(&relative) {
                Some(pattern) => {
                    log::debug!("Excluding {} (matched {})", relative, pattern);
                    false
                }
                None => true,
            }
        });

    let mut written = 0;

    for entry in walker {
        let entry = entry.map_err(|e| {
            TpixError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected")
            }))
        })?;

        if entry.depth() == 0 {
            continue;
        }

        let relative = archive_path(source_dir, entry.path());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            builder.append_dir(&relative, entry.path())?;
        } else if file_type.is_file() {
            if let (Some(out), Ok(current)) = (&output_canonical, entry.path().canonicalize()) {
                if *out == current {
                    continue;
                }
            }
            builder.append_path_with_name(entry.path(), &relative)?;
        } else {
            log::trace!("Skipping non-regular file {}", relative);
            continue;
        }

        log::trace!("Added {}", relative);
        written += 1;
    }

    builder.into_inner()?.finish()?;

    Ok(written)
}

/// Relative path of `path` below `root`, joined with `/`
fn archive_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
