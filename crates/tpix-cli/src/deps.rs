//! Deps command - list the registry packages a Typst project imports.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use tpix_pm::deps::extract_from_directory;
use tpix_pm::{TpixClient, VisitedSet};

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Project directory to scan for .typ files
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Download every imported package and its dependencies
    #[arg(long)]
    pub fetch: bool,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: DepsArgs) -> Result<i32> {
    let imports = extract_from_directory(&args.dir)
        .with_context(|| format!("Failed to scan {}", args.dir.display()))?;

    if imports.is_empty() {
        eprintln!("No package imports found in {}", args.dir.display());
        return Ok(0);
    }

    for pkg in &imports {
        println!("{}", pkg);
    }

    if !args.fetch {
        return Ok(0);
    }

    let config = crate::config::load()?;
    let cache = crate::config::package_cache(&config)?;
    let client = Arc::new(TpixClient::new(&config)?);

    let mut visited = VisitedSet::new();
    crate::get::fetch_packages(&client, &cache, &imports, false, args.quiet, &mut visited).await?;

    println!(
        "{} {} package(s) available in {}",
        style("✓").green(),
        visited.len(),
        cache.root().display()
    );
    Ok(0)
}
