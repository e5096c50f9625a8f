//! Bundle command - pack a package directory into a tar.gz archive.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use tpix_pm::bundler::default_output_name;
use tpix_pm::PackageBuilder;

use crate::progress::format_bytes;

#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Package directory containing typst.toml
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Output archive, defaults to <dir name>.tar.gz
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exclude files matching this pattern (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,
}

pub fn execute(args: BundleArgs) -> Result<i32> {
    let output = args
        .output
        .unwrap_or_else(|| default_output_name(&args.dir));

    let builder = PackageBuilder::with_default_excludes(args.exclude);
    let bundle = builder
        .create_package(&args.dir, &output)
        .with_context(|| format!("Failed to bundle {}", args.dir.display()))?;

    let size = std::fs::metadata(&bundle.output)
        .map(|m| m.len())
        .unwrap_or(0);
    let pkg = bundle.manifest.package.as_ref();

    println!(
        "{} bundled {} {} ({} entries, {}) into {}",
        style("✓").green(),
        pkg.map(|p| p.name.as_str()).unwrap_or("package"),
        pkg.map(|p| p.version.as_str()).unwrap_or(""),
        bundle.entries,
        format_bytes(size),
        bundle.output.display()
    );
    Ok(0)
}
