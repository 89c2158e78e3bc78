use crate::{config::Config, job::JobContext};
use anyhow::Result;
use sdr_core::{
    agent::BasicAgent,
    pipeline::{
        LlmOptions, PipelineConfig, RoomInputOptions, SttOptions, TtsOptions, TurnDetection,
        VadModel, VadOptions,
    },
    session::{AgentSession, SayOptions, SessionEvent},
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Instrument, Span, info};

pub const GREETING: &str = "Hello. This is a test.";

/// Process data for the minimal worker.
pub struct MinimalProcess {
    pub vad: Arc<VadModel>,
}

pub fn prewarm(_config: &Config) -> Result<MinimalProcess> {
    Ok(MinimalProcess {
        vad: Arc::new(VadModel::load(VadOptions::default())?),
    })
}

pub fn pipeline(vad: Arc<VadModel>) -> PipelineConfig {
    PipelineConfig {
        stt: SttOptions::deepgram(),
        llm: LlmOptions::google("gemini-1.5-flash"),
        tts: TtsOptions::google("en-US-Standard-C"),
        vad,
        turn_detection: TurnDetection::VadOnly,
    }
}

pub async fn entrypoint(ctx: JobContext<MinimalProcess>) -> Result<()> {
    info!(room = %ctx.room.name(), "Connecting to room");
    ctx.connect().await?;
    info!("Connected to room");

    let pipeline = pipeline(ctx.proc.vad.clone());
    let llm = ctx.llm_client(&pipeline.llm)?;
    let session = AgentSession::new(pipeline, llm);

    let mut events = session.subscribe();
    tokio::spawn(
        async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::AgentStartedSpeaking) => info!("Agent started speaking"),
                    Ok(SessionEvent::Closed) | Err(RecvError::Closed) => break,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                }
            }
        }
        .instrument(Span::current()),
    );

    session
        .start(BasicAgent::default(), ctx.room.clone(), RoomInputOptions::default())
        .await?;

    info!("Session started. Attempting to say hello...");
    session.say(GREETING, SayOptions { text_pacing: true }).await?;
    info!("Say command issued.");
    Ok(())
}
