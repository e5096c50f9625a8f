mod bundle;
mod cache;
mod config;
mod deps;
mod get;
mod info;
mod progress;
mod push;
mod search;
mod self_update;
mod version;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "tpix")]
#[command(about = "Client for the tpix Typst package registry")]
#[command(disable_version_flag = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search packages on the registry
    Search(search::SearchArgs),

    /// Show details and published versions of a package
    Info(info::InfoArgs),

    /// Download a package and its dependencies into the Typst cache
    Get(get::GetArgs),

    /// List cached packages
    List(cache::ListArgs),

    /// Remove a package from the cache
    Remove(cache::RemoveArgs),

    /// Bundle a package directory into a tar.gz archive
    Bundle(bundle::BundleArgs),

    /// Upload a bundled package to the registry
    Push(push::PushArgs),

    /// List the packages a Typst project imports
    Deps(deps::DepsArgs),

    /// Update tpix to the latest release
    SelfUpdate(self_update::SelfUpdateArgs),

    /// Show or change client settings
    Config(config::ConfigArgs),

    /// Print version and platform information
    Version,
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logger(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Run an async command on a fresh runtime
fn block_on<F>(command: F) -> Result<i32>
where
    F: std::future::Future<Output = Result<i32>>,
{
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;
    rt.block_on(command)
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Search(args) => block_on(search::execute(args)),
        Commands::Info(args) => block_on(info::execute(args)),
        Commands::Get(args) => block_on(get::execute(args)),
        Commands::List(args) => cache::list(args),
        Commands::Remove(args) => cache::remove(args),
        Commands::Bundle(args) => bundle::execute(args),
        Commands::Push(args) => block_on(push::execute(args)),
        Commands::Deps(args) => block_on(deps::execute(args)),
        Commands::SelfUpdate(args) => block_on(self_update::execute(args)),
        Commands::Config(args) => config::execute(args),
        Commands::Version => {
            version::print_version();
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
