//! Console Transport
//!
//! Runs a room in the terminal: each line typed on stdin is treated as a
//! final user transcript and agent speech is written to stdout.

use anyhow::Result;
use async_trait::async_trait;
use sdr_core::room::{RoomTransport, Utterance};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout},
    sync::Mutex,
};

/// Delay between words when an utterance asks for text pacing.
const WORD_PACING: Duration = Duration::from_millis(120);

pub struct ConsoleTransport {
    input: Mutex<Lines<BufReader<Stdin>>>,
    output: Mutex<Stdout>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            output: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomTransport for ConsoleTransport {
    async fn next_transcript(&self) -> Option<String> {
        match self.input.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read from stdin");
                None
            }
        }
    }

    async fn play(&self, utterance: &Utterance) -> Result<()> {
        let mut out = self.output.lock().await;
        render(&mut *out, utterance, WORD_PACING).await
    }
}

async fn render<W: AsyncWrite + Unpin>(
    out: &mut W,
    utterance: &Utterance,
    pacing: Duration,
) -> Result<()> {
    out.write_all(b"agent> ").await?;
    if utterance.text_pacing {
        for (i, word) in utterance.text.split_whitespace().enumerate() {
            if i > 0 {
                out.write_all(b" ").await?;
            }
            out.write_all(word.as_bytes()).await?;
            out.flush().await?;
            tokio::time::sleep(pacing).await;
        }
    } else {
        out.write_all(utterance.text.as_bytes()).await?;
    }
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
