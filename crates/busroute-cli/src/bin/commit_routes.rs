//! Send reviewed routes to a busroute server for commit.

use anyhow::{Context, Result};
use busroute_cli::client::routes_from_json;
use busroute_cli::BusrouteClient;
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    BestEffort,
    AllOrNothing,
}

impl Mode {
    fn as_wire(self) -> &'static str {
        match self {
            Mode::BestEffort => "best_effort",
            Mode::AllOrNothing => "all_or_nothing",
        }
    }
}

/// Commit reviewed routes to the busroute server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// busroute server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Suggestion output or route list to commit
    #[arg(long)]
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::BestEffort)]
    mode: Mode,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let routes = routes_from_json(serde_json::from_str(&raw)?)?;
    println!("Committing {} routes ({})...", routes.len(), args.mode.as_wire());

    let client = BusrouteClient::new(args.url);
    let response = client.commit_routes(&routes, args.mode.as_wire())?;

    for outcome in &response.outcomes {
        match (outcome.route_id.as_deref(), outcome.reason.as_deref()) {
            (Some(id), _) => println!("  {} {}: {}", outcome.status, outcome.route_name, id),
            (None, Some(reason)) => println!("  {} {}: {}", outcome.status, outcome.route_name, reason),
            (None, None) => println!("  {} {}", outcome.status, outcome.route_name),
        }
    }
    if !response.success {
        if let Some(failure) = &response.first_failure {
            eprintln!("First failure: {failure}");
        }
        std::process::exit(1);
    }
    Ok(())
}
