//! Self-update command - replace the running binary with the latest release.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::ProgressBar;
use std::sync::Arc;

use tpix_pm::http::HttpClient;
use tpix_pm::updater::backup_path;
use tpix_pm::{DownloadHandle, Downloader, GithubReleases, Release, SelfUpdater};

use crate::progress::ProgressManager;

#[derive(Args, Debug)]
pub struct SelfUpdateArgs {
    /// Only report whether a newer release exists
    #[arg(long)]
    pub check: bool,
}

pub async fn execute(args: SelfUpdateArgs) -> Result<i32> {
    let http = Arc::new(HttpClient::new()?);
    let mut updater = SelfUpdater::new(
        Arc::new(GithubReleases::new(Arc::clone(&http))),
        Downloader::new(http),
        env!("CARGO_PKG_VERSION"),
    );
    let progress = ProgressManager::default();

    let spinner = progress.create_spinner("Checking for updates");
    let newer = updater.check().await;
    spinner.finish_and_clear();
    let newer = newer.context("Failed to check for updates")?;

    if !newer {
        println!(
            "{} tpix {} is up to date",
            style("✓").green(),
            updater.current_version()
        );
        return Ok(0);
    }

    if let Some(release) = updater.cached() {
        print_release(updater.current_version(), release);
    }
    if args.check {
        println!("Run `tpix self-update` to install it.");
        return Ok(0);
    }

    let handle = updater.update().context("Failed to start the update")?;
    log::debug!("Installing for {}", updater.platform());
    follow_download(handle, &progress)
        .await
        .context("Update failed")?;

    println!("{} tpix updated successfully", style("✓").green());
    if !updater.platform().can_replace_running_executable() {
        if let Ok(exe) = std::env::current_exe() {
            println!(
                "The previous binary was kept at {}",
                backup_path(&exe).display()
            );
        }
    }
    Ok(0)
}

fn print_release(current: &str, release: &Release) {
    println!(
        "New version available: {} (current {})",
        style(&release.version).green().bold(),
        current
    );
    if let Some(published) = release.published_at {
        println!("Published {}", published.format("%Y-%m-%d"));
    }
    if !release.changelog.trim().is_empty() {
        println!();
        println!("{}", style("Changelog").bold());
        println!("{}", release.changelog.trim());
        println!();
    }
}

/// Show progress until the download ends and return its outcome
async fn follow_download(mut handle: DownloadHandle, progress: &ProgressManager) -> Result<u64> {
    let mut bar: Option<ProgressBar> = None;

    while let Some(update) = handle.next().await {
        bar.get_or_insert_with(|| progress.bar_for("downloading", &update))
            .set_position(update.received);
    }

    let result = handle.finish().await;
    if let Some(bar) = bar {
        match &result {
            Ok(_) => bar.finish_with_message("downloaded"),
            Err(_) => bar.abandon_with_message("failed"),
        }
    }

    Ok(result?)
}
