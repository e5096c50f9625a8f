//! Get command - download packages and their dependencies into the cache.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::sync::Arc;

use tpix_pm::{
    DependencyResolver, Downloader, PackageCache, PackageRef, PackageSpec, Registry,
    RegistryFetcher, TpixClient, VisitedSet,
};

use crate::progress::{PackageProgress, ProgressManager};

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Package as @namespace/name[:version]; the latest version is used
    /// when none is given
    pub package: String,

    /// Only fetch the package itself, not its dependencies
    #[arg(long)]
    pub skip_deps: bool,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: GetArgs) -> Result<i32> {
    let spec: PackageSpec = args.package.parse()?;

    let config = crate::config::load()?;
    let cache = crate::config::package_cache(&config)?;
    let client = Arc::new(TpixClient::new(&config)?);

    let pkg = client
        .resolve_spec(&spec)
        .await
        .with_context(|| format!("Failed to resolve {}", args.package))?;
    log::debug!("Resolved {} to {}", args.package, pkg);

    let mut visited = VisitedSet::new();
    fetch_packages(&client, &cache, &[pkg], args.skip_deps, args.quiet, &mut visited).await?;

    println!(
        "{} {} package(s) available in {}",
        style("✓").green(),
        visited.len(),
        cache.root().display()
    );
    Ok(0)
}

/// Resolve every package in `roots` into `cache`, sharing one visited set so
/// common dependencies are handled once
pub async fn fetch_packages(
    client: &Arc<TpixClient>,
    cache: &PackageCache,
    roots: &[PackageRef],
    skip_deps: bool,
    quiet: bool,
    visited: &mut VisitedSet,
) -> Result<()> {
    let registry: Arc<dyn Registry> = client.clone();
    let observer = Arc::new(PackageProgress::new(ProgressManager::new(!quiet)));
    let fetcher = RegistryFetcher::new(Arc::clone(&registry), Downloader::new(client.http_client()))
        .with_observer(observer);
    let resolver = DependencyResolver::new(registry.as_ref(), &fetcher, cache);

    for pkg in roots {
        resolver
            .resolve(pkg, visited, skip_deps)
            .await
            .with_context(|| format!("Failed to fetch {}", pkg))?;
    }

    Ok(())
}
