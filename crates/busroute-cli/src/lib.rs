//! busroute CLI - command line tools for the route suggestion engine.
//!
//! Binaries:
//! - suggest_routes: run the engine offline on a JSON request file
//! - commit_routes: send reviewed routes to a busroute server

pub mod client;
pub mod offline;

pub use client::BusrouteClient;
pub use offline::{run_offline, summarize, OfflineRequest};
