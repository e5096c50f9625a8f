//! Push command - upload a bundled package to the registry.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use tpix_pm::{Registry, TpixClient};

use crate::progress::ProgressManager;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Package archive created with `tpix bundle`
    pub archive: PathBuf,

    /// Namespace to publish into
    pub namespace: String,
}

pub async fn execute(args: PushArgs) -> Result<i32> {
    let metadata = std::fs::metadata(&args.archive)
        .with_context(|| format!("Failed to access {}", args.archive.display()))?;
    if metadata.is_dir() {
        eprintln!(
            "{} {} is a directory, run `tpix bundle` first",
            style("Error:").red().bold(),
            args.archive.display()
        );
        return Ok(1);
    }

    let config = crate::config::load()?;
    if config.access_token().is_none() {
        eprintln!("{} not logged in, no access token configured", style("Error:").red().bold());
        return Ok(1);
    }

    let client = TpixClient::new(&config)?;
    let spinner = ProgressManager::default().create_spinner(&format!(
        "Uploading {} to {}",
        args.archive.display(),
        args.namespace
    ));
    let result = client.upload_package(&args.archive, &args.namespace).await;
    spinner.finish_and_clear();

    let response = result.context("Upload failed")?;
    if response.is_accepted() {
        println!(
            "{} published @{}/{}:{} ({})",
            style("✓").green(),
            args.namespace,
            response.package,
            response.version,
            response.sha256
        );
        return Ok(0);
    }

    eprintln!("{} package was rejected:", style("Error:").red().bold());
    for line in &response.validate_report {
        eprintln!("    {}", line);
    }
    Ok(1)
}
