//! CLI entry point for trackgrab.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod cli;

use app::config::load_default_file_config;
use app::{RunSettings, collect_links};
use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_default_file_config()?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config.verbosity.map_or("info", |v| v.filter()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    // Read input: from positional args or stdin
    let links = if !args.links.is_empty() {
        collect_links(args.links.iter().map(String::as_str))
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        collect_links(buffer.lines())
    } else {
        info!("No input provided. Pass track links as arguments or pipe them via stdin.");
        info!("Example: trackgrab https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        return Ok(ExitCode::SUCCESS);
    };

    if links.is_empty() {
        info!("No links found in input");
        return Ok(ExitCode::SUCCESS);
    }

    let settings = RunSettings::merge(&args, &file_config);
    let all_ok = app::run(&args, &settings, links).await?;

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
