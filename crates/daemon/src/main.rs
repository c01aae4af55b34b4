// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! opsipxeconfd — opsi PXE boot configuration daemon.
//!
//! A single binary combining the daemon process and the control-channel
//! client, per `spec.md` §6.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pxe_backend::{OpsiRpcBackend, TracedBackend};
use pxe_core::SystemClock;
use pxe_daemon::config::Config;
use pxe_daemon::supervisor::{Supervisor, SupervisorError};
use pxe_daemon::{client, daemonize};

const DEFAULT_CONFFILE: &str = "/etc/opsi/opsipxeconfd.conf";

#[derive(Parser)]
#[command(name = "opsipxeconfd", version, about = "opsi PXE boot configuration daemon")]
struct Cli {
    /// Don't daemonise; run in the foreground.
    #[arg(short = 'F', long = "no-fork", global = true)]
    no_fork: bool,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "conffile", global = true, default_value = DEFAULT_CONFFILE)]
    conffile: PathBuf,

    /// Log level, 0 (silent) through 9 (most verbose). Overrides the
    /// `log level` config key for this run.
    #[arg(short = 'l', long = "loglevel", global = true)]
    loglevel: Option<u8>,

    /// Internal: the child side of `start`'s re-exec; runs the
    /// supervisor directly instead of detaching again.
    #[arg(long = "internal-foreground", hide = true)]
    internal_foreground: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version and exit.
    Version,
    /// Start the daemon (the default command).
    Start,
    /// Ask the running daemon to stop.
    Stop,
    /// Ask the running daemon for a status report.
    Status,
    /// Ask the running daemon to update one client's boot configuration.
    Update {
        client_id: String,
        cache_path: Option<PathBuf>,
    },
}

fn main() {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let cli = Cli::parse();

    let exit_code = match cli.command.unwrap_or(Command::Start) {
        Command::Version => {
            println!("opsipxeconfd {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Command::Start => run_start(&cli, &raw_args),
        Command::Stop => run_client_command(&cli.conffile, "stop"),
        Command::Status => run_client_command(&cli.conffile, "status"),
        Command::Update { client_id, cache_path } => {
            let mut line = format!("update {client_id}");
            if let Some(path) = &cache_path {
                line.push(' ');
                line.push_str(&path.display().to_string());
            }
            run_client_command(&cli.conffile, &line)
        }
    };

    std::process::exit(exit_code);
}

/// `start`: daemonise (unless `-F`/`--no-fork`) then run the supervisor
/// to completion. Exit codes per `spec.md` §6.
fn run_start(cli: &Cli, raw_args: &[String]) -> i32 {
    if !cli.no_fork && !cli.internal_foreground {
        return match daemonize::spawn_background(raw_args) {
            Ok(_child) => 0,
            Err(err) => {
                eprintln!("opsipxeconfd: failed to start: {err}");
                1
            }
        };
    }

    let conffile = cli.conffile.clone();
    let log_level_override = cli.loglevel;

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("opsipxeconfd: failed to start tokio runtime: {err}");
            return 1;
        }
    };

    runtime.block_on(async move {
        let supervisor = Arc::new(Supervisor::new(conffile, SystemClock, build_backend));
        match supervisor.start(log_level_override).await {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("opsipxeconfd: failed to start: {err}");
                1
            }
        }
    })
}

fn build_backend(config: &Config) -> Result<TracedBackend<OpsiRpcBackend>, SupervisorError> {
    let backend =
        OpsiRpcBackend::new(config.opsi_service_url.clone(), config.opsi_service_username.clone(), config.opsi_service_password.clone())
            .map_err(|err| SupervisorError::Backend(err.to_string()))?;
    Ok(TracedBackend::new(backend))
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// `stop`/`status`/`update`: connect to the control socket named in the
/// config file, send one command line, print the reply, and exit 1 if it
/// is `(ERROR)`-prefixed or the connection itself failed (`spec.md` §6).
fn run_client_command(conffile: &std::path::Path, command: &str) -> i32 {
    let config = match Config::load(conffile) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("opsipxeconfd: {err}");
            return 1;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("opsipxeconfd: failed to start tokio runtime: {err}");
            return 1;
        }
    };

    runtime.block_on(async move {
        match client::send(&config.control_socket, command).await {
            Ok(reply) => {
                println!("{reply}");
                0
            }
            Err(err) => {
                eprintln!("opsipxeconfd: {err}");
                1
            }
        }
    })
}
