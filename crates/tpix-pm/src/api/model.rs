//! Registry API response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PackageRef;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Package details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage_url: String,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub license: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub latest_version: Option<PackageVersionInfo>,
    #[serde(default)]
    pub versions: Vec<PackageVersionInfo>,
}

impl PackageResponse {
    /// The most recently published version (last in the list)
    pub fn newest_version(&self) -> Option<&str> {
        self.versions
            .last()
            .or(self.latest_version.as_ref())
            .map(|v| v.version.as_str())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageVersionInfo {
    pub version: String,
    #[serde(default)]
    pub typst_version: String,
    /// Published archive digest; not verified against cached content
    #[serde(default)]
    pub sha256: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PackageVersionsResponse {
    #[serde(default)]
    pub versions: Vec<PackageVersionInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependenciesResponse {
    #[serde(default)]
    pub dependencies: Vec<PackageRef>,
}

/// Upload outcome.
///
/// When validation fails only `report` is filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, rename = "report")]
    pub validate_report: Vec<String>,
}

impl UploadResponse {
    pub fn is_accepted(&self) -> bool {
        !self.sha256.is_empty()
    }
}
