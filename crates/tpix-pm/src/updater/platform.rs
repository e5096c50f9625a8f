//! Host platform identification and release asset selection.

use regex::Regex;

use super::install::InstallStrategy;
use crate::downloader::ReleaseAsset;
use crate::{Result, TpixError};

/// Prefix shared by all release archives of the CLI
pub const ASSET_PREFIX: &str = "tpix-cli";

/// Operating system and architecture, named the way release assets are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for
    pub fn current() -> Self {
        Self::new(
            asset_os(std::env::consts::OS),
            asset_arch(std::env::consts::ARCH),
        )
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Whether a running executable's file may be unlinked and replaced
    pub fn can_replace_running_executable(&self) -> bool {
        self.os != "windows"
    }

    pub fn install_strategy(&self) -> InstallStrategy {
        if self.can_replace_running_executable() {
            InstallStrategy::Overwrite
        } else {
            InstallStrategy::RenameAside
        }
    }

    fn asset_pattern(&self) -> Result<Regex> {
        let pattern = format!(
            r"^{}-{}-{}(-\w+)?\.(tar\.gz|zip)$",
            regex::escape(ASSET_PREFIX),
            regex::escape(&self.os),
            regex::escape(&self.arch)
        );
        Regex::new(&pattern).map_err(|e| TpixError::Precondition(e.to_string()))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

fn asset_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn asset_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// Pick the one asset built for `platform`.
///
/// Names look like `tpix-cli-linux-amd64.tar.gz`, optionally with a variant
/// suffix (`tpix-cli-windows-amd64-v2.zip`). Zero or several matches is an
/// error.
pub fn select_asset(assets: &[ReleaseAsset], platform: &Platform) -> Result<ReleaseAsset> {
    let pattern = platform.asset_pattern()?;
    let matching: Vec<&ReleaseAsset> = assets
        .iter()
        .filter(|asset| pattern.is_match(&asset.name))
        .collect();

    match matching.as_slice() {
        [asset] => Ok((*asset).clone()),
        _ => Err(TpixError::PlatformAssetNotFound {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
            matches: matching.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<ReleaseAsset> {
        names
            .iter()
            .map(|name| ReleaseAsset::new(*name, format!("https://example.com/{}", name), 1024))
            .collect()
    }

    #[test]
    fn test_select_single_match() {
        let assets = assets(&[
            "tpix-cli-darwin-arm64.tar.gz",
            "tpix-cli-linux-amd64.tar.gz",
            "tpix-cli-windows-amd64.zip",
            "checksums.txt",
        ]);

        let linux = select_asset(&assets, &Platform::new("linux", "amd64")).unwrap();
        assert_eq!(linux.name, "tpix-cli-linux-amd64.tar.gz");

        let windows = select_asset(&assets, &Platform::new("windows", "amd64")).unwrap();
        assert_eq!(windows.name, "tpix-cli-windows-amd64.zip");
    }

    #[test]
    fn test_variant_suffix() {
        let assets = assets(&["tpix-cli-linux-arm64-musl.tar.gz"]);
        assert!(select_asset(&assets, &Platform::new("linux", "arm64")).is_ok());
    }

    #[test]
    fn test_no_match() {
        let assets = assets(&["tpix-cli-linux-amd64.tar.gz", "tpix-cli-linux-amd64.deb"]);
        match select_asset(&assets, &Platform::new("freebsd", "amd64")) {
            Err(TpixError::PlatformAssetNotFound { os, matches, .. }) => {
                assert_eq!(os, "freebsd");
                assert_eq!(matches, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_match() {
        let assets = assets(&["tpix-cli-linux-amd64.tar.gz", "tpix-cli-linux-amd64.zip"]);
        assert!(matches!(
            select_asset(&assets, &Platform::new("linux", "amd64")),
            Err(TpixError::PlatformAssetNotFound { matches: 2, .. })
        ));
    }

    #[test]
    fn test_arch_is_not_a_prefix_match() {
        let assets = assets(&["tpix-cli-linux-amd64.tar.gz"]);
        assert!(select_asset(&assets, &Platform::new("linux", "amd")).is_err());
    }

    #[test]
    fn test_capability_selects_strategy() {
        let windows = Platform::new("windows", "amd64");
        assert!(!windows.can_replace_running_executable());
        assert_eq!(windows.install_strategy(), InstallStrategy::RenameAside);

        let linux = Platform::new("linux", "amd64");
        assert!(linux.can_replace_running_executable());
        assert_eq!(linux.install_strategy(), InstallStrategy::Overwrite);
    }

    #[test]
    fn test_current_uses_release_names() {
        let current = Platform::current();
        assert_ne!(current.os(), "macos");
        assert_ne!(current.arch(), "x86_64");
        assert_ne!(current.arch(), "aarch64");
    }
}
