use crate::{config::Config, job::JobContext};
use anyhow::Result;
use sdr_core::{
    pipeline::{
        LlmOptions, NoiseCancellation, PipelineConfig, RoomInputOptions, SttOptions, TtsOptions,
        TurnDetection, VadModel, VadOptions,
    },
    persistence::JsonFileLeadSink,
    reference::ReferenceData,
    sdr::SdrAgent,
    session::AgentSession,
};
use std::sync::Arc;
use tracing::info;

/// Process data for the SDR worker.
pub struct SdrProcess {
    pub vad: Arc<VadModel>,
    pub reference: ReferenceData,
}

pub fn prewarm(config: &Config) -> Result<SdrProcess> {
    let reference = ReferenceData::load(&config.reference_data_path)?;
    let vad = Arc::new(VadModel::load(VadOptions::default())?);
    Ok(SdrProcess { vad, reference })
}

pub fn pipeline(vad: Arc<VadModel>) -> PipelineConfig {
    PipelineConfig {
        stt: SttOptions::deepgram().with_model("nova-3"),
        llm: LlmOptions::google("gemini-1.5-flash"),
        tts: TtsOptions::murf("en-US-matthew").with_style("Conversation"),
        vad,
        turn_detection: TurnDetection::Multilingual,
    }
}

pub async fn entrypoint(ctx: JobContext<SdrProcess>) -> Result<()> {
    info!(room = %ctx.room.name(), "Starting SDR agent");

    let pipeline = pipeline(ctx.proc.vad.clone());
    let llm = ctx.llm_client(&pipeline.llm)?;
    let session = AgentSession::new(pipeline, llm);

    let sink = JsonFileLeadSink::new(&ctx.config.leads_dir);
    info!(leads_dir = %sink.dir().display(), "Leads will be saved on finalize");
    let agent = SdrAgent::new(&ctx.proc.reference, Arc::new(sink));

    session
        .start(
            agent,
            ctx.room.clone(),
            RoomInputOptions {
                noise_cancellation: Some(NoiseCancellation::Bvc),
            },
        )
        .await?;

    ctx.connect().await?;
    info!("SDR agent connected and ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tracing::Level;

    fn config(reference_data_path: PathBuf) -> Config {
        Config {
            google_api_key: None,
            openai_api_key: None,
            log_level: Level::INFO,
            reference_data_path,
            leads_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_prewarm_tolerates_missing_reference_data() {
        let dir = tempfile::tempdir().unwrap();
        let proc = prewarm(&config(dir.path().join("razorpay_data.json"))).unwrap();
        assert!(proc.reference.is_empty());
    }

    #[test]
    fn test_prewarm_rejects_malformed_reference_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("razorpay_data.json");
        std::fs::write(&path, "{ oops").unwrap();
        assert!(prewarm(&config(path)).is_err());
    }

    #[test]
    fn test_pipeline_providers() {
        let vad = Arc::new(VadModel::load(VadOptions::default()).unwrap());
        let pipeline = pipeline(vad.clone());
        assert_eq!(pipeline.stt.model.as_deref(), Some("nova-3"));
        assert_eq!(pipeline.llm, LlmOptions::google("gemini-1.5-flash"));
        assert_eq!(pipeline.tts.voice, "en-US-matthew");
        assert_eq!(pipeline.turn_detection, TurnDetection::Multilingual);
        assert!(Arc::ptr_eq(&pipeline.vad, &vad));
    }
}
