//! Archive extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use super::ArchiveFormat;
use crate::{Result, TpixError};

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Extract `source` into `dest_dir`.
///
/// Directory entries are created with all of their parents, regular files are
/// written at their relative path below `dest_dir` (creating missing parents
/// first, so entry order does not matter), and every other entry type
/// (symlinks, devices, fifos) is skipped.
pub fn extract(format: ArchiveFormat, source: &Path, dest_dir: &Path) -> Result<()> {
    match format {
        ArchiveFormat::TarGz => {
            fs::create_dir_all(dest_dir)?;
            let file = File::open(source)?;
            extract_tar(GzDecoder::new(BufReader::new(file)), dest_dir)
        }
        ArchiveFormat::Zip => {
            fs::create_dir_all(dest_dir)?;
            extract_zip(source, dest_dir)
        }
        ArchiveFormat::Unknown => Err(TpixError::UnknownArchiveFormat(
            source.display().to_string(),
        )),
    }
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    let entries = archive
        .entries()
        .map_err(|e| TpixError::InvalidArchive(format!("Failed to read tar: {}", e)))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| TpixError::InvalidArchive(format!("Failed to read tar entry: {}", e)))?;

        let raw_path = entry
            .path()
            .map_err(|e| TpixError::InvalidArchive(format!("Invalid path in tar: {}", e)))?
            .into_owned();

        let relative = match safe_relative_path(&raw_path)? {
            Some(relative) => relative,
            None => continue,
        };
        let outpath = dest_dir.join(&relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else if entry_type.is_file() {
            log::trace!("Extracting {}", relative.display());
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            if let Ok(mode) = entry.header().mode() {
                set_mode(&outpath, mode)?;
            }
        } else {
            log::trace!("Skipping {:?} entry {}", entry_type, relative.display());
        }
    }

    Ok(())
}

fn extract_zip(source: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(source)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| TpixError::InvalidArchive(format!("Failed to open zip: {}", e)))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| TpixError::InvalidArchive(format!("Failed to read zip entry: {}", e)))?;

        let relative = match safe_relative_path(Path::new(file.name()))? {
            Some(relative) => relative,
            None => continue,
        };
        let outpath = dest_dir.join(&relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        let mode = file.unix_mode();
        if mode.map(|m| m & S_IFMT == S_IFLNK).unwrap_or(false) {
            log::trace!("Skipping symlink entry {}", relative.display());
            continue;
        }

        log::trace!("Extracting {}", relative.display());
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            set_mode(&outpath, mode)?;
        }
    }

    Ok(())
}

/// Normalize an entry path to a relative path below the destination.
///
/// Returns `None` for entries that name the destination itself (`./`), and
/// an error for absolute paths or `..` components.
fn safe_relative_path(path: &Path) -> Result<Option<PathBuf>> {
    let mut relative = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TpixError::InvalidArchive(format!(
                    "Path traversal detected in archive: {}",
                    path.display()
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = mode & 0o777;
    if mode != 0 {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}
