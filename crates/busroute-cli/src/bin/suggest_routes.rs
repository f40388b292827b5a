//! Run the route suggestion engine offline on a JSON request file.

use anyhow::{Context, Result};
use busroute_cli::{run_offline, summarize, OfflineRequest};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Suggest stops and routes for a student list without a server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Request file (students, origin, destination, optional corridor and config)
    #[arg(long)]
    input: PathBuf,

    /// Write the suggestion JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also generate mirrored return routes
    #[arg(long)]
    return_routes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut request: OfflineRequest = serde_json::from_str(&raw).context("parsing request")?;
    if args.return_routes {
        request.config.create_return_routes = true;
    }

    let outcome = run_offline(request)?;
    eprint!("{}", summarize(&outcome));

    let json = serde_json::to_string_pretty(&outcome)?;
    match args.output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
