//! pipesync: the pipelines of a CI server as a versioned resource.
//!
//! # Usage
//!
//! ```text
//! pipesync check            < request.json
//! pipesync in  <dest-dir>   < request.json
//! pipesync out <source-dir> < request.json
//! ```
//!
//! Installed as `/opt/resource/{check,in,out}` links, the name the binary
//! is invoked under selects the subcommand.

mod commands;
mod logging;

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{in_::InArgs, out::OutArgs, GlobalOpts};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pipesync",
    version,
    about = "Check, fetch and publish the pipelines of a CI server",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report the current pipelines version if it changed.
    Check,

    /// Write every pipeline config into a directory.
    In(InArgs),

    /// Publish pipeline configs from a directory.
    Out(OutArgs),
}

const MULTI_CALL_NAMES: [&str; 3] = ["check", "in", "out"];

/// When invoked as `check`, `in` or `out`, splice that name in as the
/// subcommand.
fn multi_call_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    let invoked = args
        .first()
        .and_then(|a| Path::new(a).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| MULTI_CALL_NAMES.contains(n))
        .map(str::to_owned);
    if let Some(name) = invoked {
        args[0] = OsString::from("pipesync");
        args.insert(1, OsString::from(name));
    }
    args
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse_from(multi_call_args(std::env::args_os()));
    let result = match cli.command {
        Commands::Check => commands::check::run(&cli.global),
        Commands::In(args) => args.run(&cli.global),
        Commands::Out(args) => args.run(&cli.global),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
