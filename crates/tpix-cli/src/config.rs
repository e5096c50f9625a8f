//! Config command and settings loading shared by the other commands.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use tpix_pm::config::CACHE_PATH_ENV;
use tpix_pm::{Config, ConfigLoader, PackageCache};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Set the Typst package cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<PathBuf>,
}

/// Load settings from the settings file and environment
pub fn load() -> Result<Config> {
    let config = ConfigLoader::default()
        .load()
        .context("Failed to load settings")?;
    log::debug!("Using server {} and cache {:?}", config.server_url(), config.cache_path());
    Ok(config)
}

/// Package cache at the configured location
pub fn package_cache(config: &Config) -> Result<PackageCache> {
    PackageCache::from_config(config).context("Failed to locate the package cache")
}

pub fn execute(args: ConfigArgs) -> Result<i32> {
    // The file on disk is updated without the environment override applied
    let loader = ConfigLoader::new(false);

    if let Some(path) = args.cache_path {
        let path = std::path::absolute(&path)
            .with_context(|| format!("Invalid path {}", path.display()))?;
        if path.exists() && !path.is_dir() {
            eprintln!("{} {} is not a directory", style("Error:").red().bold(), path.display());
            return Ok(1);
        }

        let config = loader
            .load()
            .context("Failed to load settings")?
            .with_cache_path(&path);
        loader.save(&config).context("Failed to save settings")?;

        println!("{} cache path set to {}", style("✓").green(), path.display());
        return Ok(0);
    }

    let config = load()?;
    print_settings(&loader, &config);
    Ok(0)
}

fn print_settings(loader: &ConfigLoader, config: &Config) {
    let settings = loader
        .settings_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    let cache = config
        .cache_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("{}  {}", style("settings file").bold(), settings);
    println!("{}     {}", style("server url").bold(), config.server_url());
    println!("{}     {}", style("cache path").bold(), cache);
    if std::env::var_os(CACHE_PATH_ENV).is_some() {
        println!("               {}", style(format!("(from {})", CACHE_PATH_ENV)).dim());
    }
    println!(
        "{}      {}",
        style("logged in").bold(),
        if config.access_token().is_some() { "yes" } else { "no" }
    );
}
