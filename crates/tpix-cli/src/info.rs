//! Info command - show a package and its published versions.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use tpix_pm::api::PackageResponse;
use tpix_pm::{PackageSpec, Registry, TpixClient};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Package as @namespace/name
    pub package: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: InfoArgs) -> Result<i32> {
    let spec: PackageSpec = args.package.parse()?;

    let config = crate::config::load()?;
    let client = TpixClient::new(&config)?;
    let package = client
        .fetch_package(&spec.namespace, &spec.name)
        .await
        .with_context(|| format!("Failed to fetch @{}/{}", spec.namespace, spec.name))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&package)?);
    } else {
        print_package(&package);
    }

    Ok(0)
}

fn print_package(package: &PackageResponse) {
    println!(
        "{} {}",
        style(format!("@{}/{}", package.namespace, package.name)).green().bold(),
        package.newest_version().unwrap_or("-")
    );
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    println!();

    for (label, value) in [
        ("license", &package.license),
        ("homepage", &package.homepage_url),
        ("repository", &package.repository_url),
    ] {
        if !value.is_empty() {
            println!("{:<12}{}", style(label).bold(), value);
        }
    }
    if let Some(updated) = package.updated_at {
        println!("{:<12}{}", style("updated").bold(), updated.format("%Y-%m-%d"));
    }

    if package.versions.is_empty() {
        return;
    }

    println!();
    println!("{}", style("versions").bold());
    for version in package.versions.iter().rev() {
        let published = version
            .published_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let typst = if version.typst_version.is_empty() {
            String::new()
        } else {
            format!("typst {}", version.typst_version)
        };
        println!("  {:<12}{:<12}{}", version.version, published, style(typst).dim());
    }
}
