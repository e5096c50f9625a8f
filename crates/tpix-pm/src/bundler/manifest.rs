//! `typst.toml` package manifest.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PackageRef, Result, TpixError};

pub const MANIFEST_FILENAME: &str = "typst.toml";

/// Parsed `typst.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub package: Option<PackageSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateSection>,
}

/// The `[package]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    pub entrypoint: String,

    pub authors: Vec<String>,
    pub license: String,
    pub description: String,

    pub homepage: String,
    pub repository: String,
    pub keywords: Vec<String>,

    pub categories: Vec<String>,
    pub disciplines: Vec<String>,

    /// Minimum compiler version
    pub compiler: String,
    /// Extra exclusion patterns applied when bundling
    pub exclude: Vec<String>,
}

/// The `[template]` table of template packages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSection {
    pub entrypoint: String,
    pub path: String,
    pub thumbnail: String,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read `typst.toml` from a package directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILENAME);
        let content = fs::read_to_string(&path).map_err(|e| {
            TpixError::manifest(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Check the fields every publishable package needs and return the
    /// `[package]` table
    pub fn validate(&self) -> Result<&PackageSection> {
        let package = self
            .package
            .as_ref()
            .ok_or_else(|| TpixError::manifest("missing [package] section in typst.toml"))?;

        if package.name.trim().is_empty() {
            return Err(TpixError::manifest("package name is required in typst.toml"));
        }
        if package.version.trim().is_empty() {
            return Err(TpixError::manifest("package version is required in typst.toml"));
        }
        if package.entrypoint.trim().is_empty() {
            return Err(TpixError::manifest(
                "package entrypoint is required in typst.toml",
            ));
        }

        Ok(package)
    }

    /// Exclusion patterns declared by the manifest
    pub fn exclude(&self) -> &[String] {
        self.package
            .as_ref()
            .map(|p| p.exclude.as_slice())
            .unwrap_or(&[])
    }

    /// The package this manifest describes, within `namespace`
    pub fn package_ref(&self, namespace: &str) -> Result<PackageRef> {
        let package = self.validate()?;
        PackageRef::parse_parts(namespace, &package.name, &package.version)
            .map_err(|e| TpixError::manifest(e.to_string()))
    }
}
