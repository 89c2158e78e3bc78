//! Worker Launcher
//!
//! The command-line front end shared by both agents. It is responsible for:
//! 1. Parsing the command line.
//! 2. Loading configuration from the environment.
//! 3. Initializing logging.
//! 4. Running the prewarm step once for the process.
//! 5. Dispatching the job to the entry point and keeping it alive until the
//!    room closes or the process is interrupted.

use crate::{config::Config, console::ConsoleTransport, job::JobContext};
use anyhow::Context;
use clap::{Parser, Subcommand};
use sdr_core::room::Room;
use std::{future::Future, sync::Arc};
use tracing::{Instrument, error, info};

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Talk to the agent from the terminal.
    Console {
        /// Name of the room the job runs in.
        #[arg(long, default_value = "console")]
        room: String,
    },
}

/// The two callbacks an agent binary supplies.
pub struct WorkerOptions<P, W, E> {
    /// Runs once per process before any job is accepted.
    pub prewarm: W,
    /// Runs once per job.
    pub entrypoint: E,
    _proc: std::marker::PhantomData<fn() -> P>,
}

impl<P, W, E, Fut> WorkerOptions<P, W, E>
where
    W: FnOnce(&Config) -> anyhow::Result<P>,
    E: Fn(JobContext<P>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    pub fn new(prewarm: W, entrypoint: E) -> Self {
        Self {
            prewarm,
            entrypoint,
            _proc: std::marker::PhantomData,
        }
    }
}

/// Listens for the `Ctrl+C` signal to shut the worker down.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down...");
}

/// Parses the command line and runs the worker.
pub async fn run_app<P, W, E, Fut>(options: WorkerOptions<P, W, E>) -> anyhow::Result<()>
where
    W: FnOnce(&Config) -> anyhow::Result<P>,
    E: Fn(JobContext<P>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Prewarming worker process...");

    let proc = Arc::new((options.prewarm)(&config).context("Prewarm failed")?);
    let config = Arc::new(config);

    match cli.command {
        Command::Console { room } => {
            let room = Arc::new(Room::new(room, Arc::new(ConsoleTransport::new())));
            let ctx = JobContext::new(room.clone(), proc, config);
            let job_span = tracing::info_span!("job", room = %room.name());

            (options.entrypoint)(ctx)
                .instrument(job_span)
                .await
                .context("Entry point failed")?;

            tokio::select! {
                _ = room.closed() => info!("Job finished."),
                _ = shutdown_signal() => room.close(),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_room_defaults() {
        let cli = Cli::try_parse_from(["sdr_agent", "console"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Console {
                room: "console".to_string()
            }
        );
    }

    #[test]
    fn test_console_room_override() {
        let cli = Cli::try_parse_from(["sdr_agent", "console", "--room", "demo"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Console {
                room: "demo".to_string()
            }
        );
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["sdr_agent"]).is_err());
    }
}
