//! Package bundling.
//!
//! Turns a package source directory with a valid `typst.toml` into a
//! `.tar.gz` ready for upload.

mod manifest;

use std::path::{Path, PathBuf};

use crate::archive::{create_tar_gz, ExcludeRules};
use crate::Result;

pub use manifest::{Manifest, PackageSection, TemplateSection, MANIFEST_FILENAME};

/// Rules every bundle gets regardless of the manifest
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".DS_Store"];

/// Outcome of a bundling run
#[derive(Debug, Clone)]
pub struct Bundle {
    pub manifest: Manifest,
    pub output: PathBuf,
    pub entries: usize,
}

/// Builds package bundles
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    exclude: ExcludeRules,
}

impl PackageBuilder {
    /// Create a builder with caller-supplied exclusion patterns.
    ///
    /// These take precedence over the patterns the manifest declares.
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: ExcludeRules::new(exclude),
        }
    }

    /// Same as [`new`](Self::new) with [`DEFAULT_EXCLUDES`] appended
    pub fn with_default_excludes<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::new(exclude);
        builder.exclude.extend(DEFAULT_EXCLUDES.iter().copied());
        builder
    }

    /// Validate the manifest in `src_dir` and write the bundle to `output`
    pub fn create_package(&self, src_dir: &Path, output: &Path) -> Result<Bundle> {
        let manifest = Manifest::load(src_dir)?;
        manifest.validate()?;

        let mut rules = self.exclude.clone();
        rules.extend(manifest.exclude().iter().cloned());
        log::debug!("Bundling {} with excludes {:?}", src_dir.display(), rules.patterns());

        let entries = create_tar_gz(src_dir, &rules, output)?;
        log::info!("Wrote {} entries to {}", entries, output.display());

        Ok(Bundle {
            manifest,
            output: output.to_path_buf(),
            entries,
        })
    }
}

/// `<dir name>.tar.gz`, used when no output path is given
pub fn default_output_name(src_dir: &Path) -> PathBuf {
    let base = src_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            std::path::absolute(src_dir)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "package".to_string());

    PathBuf::from(format!("{}.tar.gz", base))
}
