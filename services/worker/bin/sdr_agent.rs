//! Lead-qualification SDR agent worker.

use sdr_worker::{
    cli::{WorkerOptions, run_app},
    entrypoints::sdr::{entrypoint, prewarm},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_app(WorkerOptions::new(prewarm, entrypoint)).await
}
