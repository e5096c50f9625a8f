//! List and remove commands for the local package cache.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use tpix_pm::{PackageRef, PackageSpec};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list packages in this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Cached package as @namespace/name:version, or @namespace/name to
    /// remove every cached version
    pub package: String,
}

pub fn list(args: ListArgs) -> Result<i32> {
    let config = crate::config::load()?;
    let cache = crate::config::package_cache(&config)?;

    let packages: Vec<PackageRef> = cache
        .list()
        .context("Failed to read the package cache")?
        .into_iter()
        .filter(|p| args.namespace.as_deref().map_or(true, |ns| p.namespace() == ns))
        .collect();

    if packages.is_empty() {
        eprintln!("No packages cached in {}", cache.root().display());
        return Ok(0);
    }

    for pkg in &packages {
        println!("{}", pkg);
    }
    Ok(0)
}

pub fn remove(args: RemoveArgs) -> Result<i32> {
    let spec: PackageSpec = args.package.parse()?;

    let config = crate::config::load()?;
    let cache = crate::config::package_cache(&config)?;

    let targets = match &spec.version {
        Some(version) => vec![spec.with_version(version.clone())?],
        None => matching_versions(&cache.list()?, &spec),
    };

    if targets.is_empty() {
        eprintln!("{} {} is not in the cache", style("Error:").red().bold(), args.package);
        return Ok(1);
    }

    for pkg in &targets {
        let dir = cache
            .remove(pkg)
            .with_context(|| format!("Failed to remove {}", pkg))?;
        println!("{} removed {} ({})", style("✓").green(), pkg, dir.display());
    }
    Ok(0)
}

fn matching_versions(cached: &[PackageRef], spec: &PackageSpec) -> Vec<PackageRef> {
    cached
        .iter()
        .filter(|p| p.namespace() == spec.namespace && p.name() == spec.name)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_versions() {
        let cached = vec![
            PackageRef::new("preview", "cetz", "0.2.1"),
            PackageRef::new("preview", "cetz", "0.2.2"),
            PackageRef::new("preview", "cetz-plot", "0.1.0"),
            PackageRef::new("local", "cetz", "0.2.2"),
        ];
        let spec: PackageSpec = "@preview/cetz".parse().unwrap();

        let matched = matching_versions(&cached, &spec);
        assert_eq!(matched, cached[..2].to_vec());
    }
}
