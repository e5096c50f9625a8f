//! Dependency resolution.
//!
//! Walks the direct-dependency graph of a requested package, fetching every
//! package that is not cached yet. There is no constraint solving: a
//! dependency is exactly the version the registry names.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::Registry;
use crate::downloader::{Downloader, OnFinished, ProgressUpdate};
use crate::{PackageCache, PackageRef, Result};

/// Packages already handled during one resolution
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
    order: Vec<PackageRef>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `pkg` visited. Returns `false` if it already was.
    pub fn insert(&mut self, pkg: &PackageRef) -> bool {
        if !self.keys.insert(pkg.key()) {
            return false;
        }
        self.order.push(pkg.clone());
        true
    }

    pub fn contains(&self, pkg: &PackageRef) -> bool {
        self.keys.contains(&pkg.key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Visited packages in the order they were reached
    pub fn refs(&self) -> &[PackageRef] {
        &self.order
    }
}

/// Puts one package into the cache
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    async fn fetch(&self, pkg: &PackageRef, cache: &PackageCache) -> Result<()>;
}

/// Receives progress of the downloads a [`RegistryFetcher`] runs
pub trait DownloadObserver: Send + Sync {
    fn started(&self, _pkg: &PackageRef) {}

    fn progress(&self, _pkg: &PackageRef, _update: ProgressUpdate) {}

    fn finished(&self, _pkg: &PackageRef, _success: bool) {}
}

/// Fetches packages from a registry through the [`Downloader`].
///
/// Each package is extracted into a staging directory inside the cache root
/// and renamed into place by the download's completion callback, so a
/// partially extracted package never shows up as cached.
pub struct RegistryFetcher {
    registry: Arc<dyn Registry>,
    downloader: Downloader,
    observer: Option<Arc<dyn DownloadObserver>>,
}

impl RegistryFetcher {
    pub fn new(registry: Arc<dyn Registry>, downloader: Downloader) -> Self {
        Self {
            registry,
            downloader,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

#[async_trait]
impl PackageFetcher for RegistryFetcher {
    async fn fetch(&self, pkg: &PackageRef, cache: &PackageCache) -> Result<()> {
        let asset = self.registry.package_asset(pkg).await?;
        let staging = cache.staging_dir()?;
        let payload = staging.path().join("payload");

        let install_cache = cache.clone();
        let install_pkg = pkg.clone();
        // The staging guard lives in the callback; it is dropped, and the
        // directory removed, whether or not the callback ever runs.
        let on_finished: OnFinished = Box::new(move |extracted: &Path| {
            let installed = install_cache.install(extracted, &install_pkg).map(|_| ());
            drop(staging);
            installed
        });

        let mut handle = self.downloader.download(asset, payload, Some(on_finished));
        if let Some(observer) = &self.observer {
            observer.started(pkg);
        }

        while let Some(update) = handle.next().await {
            if let Some(observer) = &self.observer {
                observer.progress(pkg, update);
            }
        }

        let result = handle.finish().await;
        if let Some(observer) = &self.observer {
            observer.finished(pkg, result.is_ok());
        }

        let bytes = result?;
        log::debug!("Fetched {} ({} bytes)", pkg, bytes);
        Ok(())
    }
}

/// Walks and fetches the dependency graph of a package
pub struct DependencyResolver<'a> {
    registry: &'a dyn Registry,
    fetcher: &'a dyn PackageFetcher,
    cache: &'a PackageCache,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        fetcher: &'a dyn PackageFetcher,
        cache: &'a PackageCache,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
        }
    }

    /// Fetch `pkg` and, unless `skip_deps`, everything it depends on.
    ///
    /// Packages are handled depth-first in dependency order and each one at
    /// most once per `visited`. A cached package is not downloaded again but
    /// its dependencies are still walked. `skip_deps` applies only to `pkg`
    /// itself. The first fetch failure aborts the walk; packages fetched
    /// before it stay in the cache.
    pub async fn resolve(
        &self,
        pkg: &PackageRef,
        visited: &mut VisitedSet,
        skip_deps: bool,
    ) -> Result<()> {
        let mut pending = vec![(pkg.clone(), skip_deps)];

        while let Some((current, skip)) = pending.pop() {
            if !visited.insert(&current) {
                continue;
            }

            if self.cache.contains(&current) {
                log::debug!("{} is cached", current);
            } else {
                log::info!("Fetching {}", current);
                self.fetcher.fetch(&current, self.cache).await?;
            }

            if skip {
                continue;
            }

            let dependencies = match self.registry.fetch_dependencies(&current).await {
                Ok(dependencies) => dependencies,
                Err(e) => {
                    log::warn!("No dependency information for {}: {}", current, e);
                    Vec::new()
                }
            };

            // Reversed so the first dependency is handled first
            for dependency in dependencies.into_iter().rev() {
                if !visited.contains(&dependency) {
                    log::debug!("{} depends on {}", current, dependency);
                    pending.push((dependency, false));
                }
            }
        }

        Ok(())
    }
}
