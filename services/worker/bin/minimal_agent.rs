//! Minimal voice pipeline worker that greets the room once.

use sdr_worker::{
    cli::{WorkerOptions, run_app},
    entrypoints::minimal::{entrypoint, prewarm},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_app(WorkerOptions::new(prewarm, entrypoint)).await
}
