//! Filesystem-backed package cache.
//!
//! Extracted packages live at `<root>/<namespace>/<name>/<version>/`, the
//! layout the Typst compiler reads. The presence of that directory is the
//! only cache indicator; there is no index file.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::Config;
use crate::{PackageRef, Result, TpixError};

const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone)]
pub struct PackageCache {
    /// Root directory of the cache
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build the cache from the configured cache path
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.cache_path() {
            Some(path) if !path.as_os_str().is_empty() => Ok(Self::new(path)),
            _ => Err(TpixError::Config(
                "typst cache directory not configured".to_string(),
            )),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the extracted files of `pkg`
    pub fn package_dir(&self, pkg: &PackageRef) -> PathBuf {
        self.root
            .join(pkg.namespace())
            .join(pkg.name())
            .join(pkg.version())
    }

    pub fn contains(&self, pkg: &PackageRef) -> bool {
        self.package_dir(pkg).is_dir()
    }

    /// List every cached package, sorted by key.
    ///
    /// Non-directory entries and unreadable subdirectories are skipped.
    pub fn list(&self) -> Result<Vec<PackageRef>> {
        let mut packages = Vec::new();

        for namespace in read_subdirs(&self.root)
            .map_err(|e| TpixError::cache(&self.root, e))?
        {
            if namespace.starts_with(STAGING_PREFIX) {
                continue;
            }
            let namespace_dir = self.root.join(&namespace);
            let Ok(names) = read_subdirs(&namespace_dir) else {
                continue;
            };

            for name in names {
                let Ok(versions) = read_subdirs(&namespace_dir.join(&name)) else {
                    continue;
                };
                for version in versions {
                    match PackageRef::parse_parts(namespace.clone(), name.clone(), version) {
                        Ok(pkg) => packages.push(pkg),
                        Err(e) => log::debug!("Skipping cache entry: {}", e),
                    }
                }
            }
        }

        packages.sort();
        Ok(packages)
    }

    /// Remove a cached package and return the directory that was deleted
    pub fn remove(&self, pkg: &PackageRef) -> Result<PathBuf> {
        let dir = self.package_dir(pkg);

        let metadata = fs::metadata(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TpixError::PackageNotFound(format!("{} is not in the cache", pkg))
            } else {
                TpixError::cache(&dir, e)
            }
        })?;

        if !metadata.is_dir() {
            return Err(TpixError::cache(
                &dir,
                std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            ));
        }

        fs::remove_dir_all(&dir).map_err(|e| TpixError::cache(&dir, e))?;
        log::debug!("Removed {} from {}", pkg, dir.display());

        Ok(dir)
    }

    /// Create a fresh staging directory inside the cache root.
    ///
    /// Staging on the same filesystem keeps the final rename atomic. The
    /// directory is deleted when the returned guard is dropped.
    pub fn staging_dir(&self) -> Result<TempDir> {
        fs::create_dir_all(&self.root).map_err(|e| TpixError::cache(&self.root, e))?;

        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| TpixError::cache(&self.root, e))
    }

    /// Move an extracted package from `staged` into its cache location.
    ///
    /// If the destination already exists another run got there first and
    /// its copy is kept.
    pub fn install(&self, staged: &Path, pkg: &PackageRef) -> Result<PathBuf> {
        let dest = self.package_dir(pkg);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TpixError::cache(parent, e))?;
        }

        match fs::rename(staged, &dest) {
            Ok(()) => Ok(dest),
            Err(_) if dest.is_dir() => {
                log::debug!("{} was cached concurrently, keeping existing copy", pkg);
                Ok(dest)
            }
            Err(e) => Err(TpixError::cache(&dest, e)),
        }
    }
}

/// Names of the direct subdirectories of `dir`
fn read_subdirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cached(cache: &PackageCache, pkg: &PackageRef) {
        let dir = cache.package_dir(pkg);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("typst.toml"), "[package]").unwrap();
    }

    #[test]
    fn test_package_dir_layout() {
        let cache = PackageCache::new("/cache");
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        assert_eq!(
            cache.package_dir(&pkg),
            PathBuf::from("/cache").join("preview").join("cetz").join("0.2.2")
        );
    }

    #[test]
    fn test_contains() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");

        assert!(!cache.contains(&pkg));
        cached(&cache, &pkg);
        assert!(cache.contains(&pkg));
        assert!(!cache.contains(&PackageRef::new("preview", "cetz", "0.2.1")));
    }

    #[test]
    fn test_file_at_package_path_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");

        fs::create_dir_all(temp.path().join("preview/cetz")).unwrap();
        fs::write(cache.package_dir(&pkg), "stray").unwrap();
        assert!(!cache.contains(&pkg));
    }

    #[test]
    fn test_list_walks_three_levels() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());

        let a = PackageRef::new("preview", "tablex", "0.0.8");
        let b = PackageRef::new("preview", "cetz", "0.2.2");
        let c = PackageRef::new("local", "notes", "1.0.0");
        for pkg in [&a, &b, &c] {
            cached(&cache, pkg);
        }
        fs::write(temp.path().join("README"), "ignored").unwrap();
        fs::write(temp.path().join("preview/cetz/notes.txt"), "ignored").unwrap();
        let _staging = cache.staging_dir().unwrap();

        assert_eq!(cache.list().unwrap(), vec![c, b, a]);
    }

    #[test]
    fn test_list_skips_unusable_directory_names() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());

        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        cached(&cache, &pkg);
        fs::create_dir_all(temp.path().join("preview/cetz/not:a-version")).unwrap();

        assert_eq!(cache.list().unwrap(), vec![pkg]);
    }

    #[test]
    fn test_list_missing_root_is_cache_error() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path().join("missing"));
        assert!(matches!(cache.list(), Err(TpixError::Cache { .. })));
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path());
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");
        cached(&cache, &pkg);

        let removed = cache.remove(&pkg).unwrap();
        assert_eq!(removed, cache.package_dir(&pkg));
        assert!(!cache.contains(&pkg));

        assert!(matches!(cache.remove(&pkg), Err(TpixError::PackageNotFound(_))));
    }

    #[test]
    fn test_install_from_staging() {
        let temp = TempDir::new().unwrap();
        let cache = PackageCache::new(temp.path().join("cache"));
        let pkg = PackageRef::new("preview", "cetz", "0.2.2");

        let staging = cache.staging_dir().unwrap();
        let payload = staging.path().join("payload");
        fs::create_dir_all(&payload).unwrap();
        fs::write(payload.join("lib.typ"), "#let x = 1").unwrap();

        let dest = cache.install(&payload, &pkg).unwrap();
        assert_eq!(fs::read_to_string(dest.join("lib.typ")).unwrap(), "#let x = 1");
        assert!(cache.contains(&pkg));

        // A second install of the same ref keeps the first copy
        let other = staging.path().join("other");
        fs::create_dir_all(&other).unwrap();
        fs::write(other.join("lib.typ"), "#let x = 2").unwrap();
        cache.install(&other, &pkg).unwrap();
        assert_eq!(fs::read_to_string(dest.join("lib.typ")).unwrap(), "#let x = 1");
    }

    #[test]
    fn test_from_config_requires_cache_path() {
        let config = Config::default();
        assert!(matches!(PackageCache::from_config(&config), Err(TpixError::Config(_))));

        let config = Config::default().with_cache_path("/tmp/typst/packages");
        let cache = PackageCache::from_config(&config).unwrap();
        assert_eq!(cache.root(), Path::new("/tmp/typst/packages"));
    }
}
