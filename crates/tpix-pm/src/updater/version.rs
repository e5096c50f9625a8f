//! Release version parsing and comparison.

use semver::{BuildMetadata, Version};

use crate::{Result, TpixError};

/// Parse a release tag or build version such as `v1.2.0`, `1.2.0` or `v1.2`.
///
/// The leading `v` is optional and missing minor or patch components
/// default to zero.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TpixError::Version("version cannot be empty".to_string()));
    }

    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

    // Shorthand forms only apply without pre-release or build suffixes
    let padded = if bare.contains(['-', '+']) {
        bare.to_string()
    } else {
        match bare.split('.').count() {
            1 => format!("{}.0.0", bare),
            2 => format!("{}.0", bare),
            _ => bare.to_string(),
        }
    };

    Version::parse(&padded)
        .map_err(|e| TpixError::Version(format!("invalid semantic version {}: {}", raw, e)))
}

/// Canonical `v`-prefixed form of a version string
pub fn normalize_version(raw: &str) -> Result<String> {
    Ok(format!("v{}", parse_version(raw)?))
}

/// Whether `latest` is strictly newer than `current`.
///
/// Build metadata does not take part in the ordering.
pub fn compare_version(latest: &str, current: &str) -> Result<bool> {
    let mut latest = parse_version(latest)?;
    let mut current = parse_version(current)?;
    latest.build = BuildMetadata::EMPTY;
    current.build = BuildMetadata::EMPTY;

    Ok(latest > current)
}
