//! Search command - search for packages on the registry.

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use tpix_pm::api::SearchResult;
use tpix_pm::{Registry, TpixClient};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search terms
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Only search within this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Maximum number of results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output format: text or json
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

fn is_valid_format(format: &str) -> bool {
    format == "text" || format == "json"
}

fn truncate_description(description: &str, max_chars: usize) -> String {
    if description.chars().count() > max_chars {
        let kept: String = description.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        description.to_string()
    }
}

fn display_name(result: &SearchResult) -> String {
    format!("@{}/{}", result.namespace, result.name)
}

pub async fn execute(args: SearchArgs) -> Result<i32> {
    if !is_valid_format(&args.format) {
        eprintln!("Unsupported format \"{}\". See help for supported formats.", args.format);
        return Ok(1);
    }

    let config = crate::config::load()?;
    let client = TpixClient::new(&config)?;
    let query = args.query.join(" ");

    let response = client
        .search_packages(&query, args.namespace.as_deref(), args.limit)
        .await
        .with_context(|| format!("Search for \"{}\" failed", query))?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&response.results)?);
        return Ok(0);
    }

    if response.results.is_empty() {
        eprintln!("No packages found for \"{}\"", query);
        return Ok(0);
    }

    let name_length = response
        .results
        .iter()
        .map(|r| display_name(r).len())
        .max()
        .unwrap_or(0)
        + 1;

    for result in &response.results {
        let name = display_name(result);
        let padding = " ".repeat(name_length.saturating_sub(name.len()));
        println!(
            "{}{}{}",
            style(&name).green(),
            padding,
            truncate_description(&result.description, 60)
        );
    }

    Ok(0)
}
