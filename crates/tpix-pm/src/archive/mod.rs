//! Archive codec (tar.gz and zip).
//!
//! Packages and release builds are consumed as `.tar.gz` or `.zip`, chosen by
//! file name suffix. Bundles are always produced as `.tar.gz`.

mod create;
mod exclude;
mod extract;

use std::path::Path;

pub use create::create_tar_gz;
pub use exclude::ExcludeRules;
pub use extract::extract;

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
    Unknown,
}

impl ArchiveFormat {
    /// Detect the format from a file name suffix
    pub fn detect(name: &str) -> Self {
        let name = name.to_lowercase();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else if name.ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::Unknown
        }
    }

    /// Detect the format from the file name component of a path
    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .map(|name| Self::detect(&name.to_string_lossy()))
            .unwrap_or(ArchiveFormat::Unknown)
    }
}
