//! Voice Pipeline Configuration
//!
//! Descriptors for the five capability providers a session is assembled
//! from. Recognition, synthesis, voice-activity detection and turn detection
//! run inside the host media framework; this crate only names and configures
//! them.

use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PipelineError {
    #[error("invalid VAD option {0}: {1}")]
    InvalidVadOption(&'static str, String),
}

/// Speech-to-text provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SttOptions {
    pub vendor: String,
    pub model: Option<String>,
    pub language: Option<String>,
}

impl SttOptions {
    /// Deepgram streaming recognition with the vendor's default model.
    pub fn deepgram() -> Self {
        Self {
            vendor: "deepgram".to_string(),
            model: None,
            language: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Backends reachable through an OpenAI-compatible chat completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Google,
    OpenAI,
}

impl LlmProvider {
    pub fn api_base(&self) -> &'static str {
        match self {
            LlmProvider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            LlmProvider::OpenAI => "https://api.openai.com/v1/",
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmOptions {
    pub provider: LlmProvider,
    pub model: String,
}

impl LlmOptions {
    pub fn google(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Google,
            model: model.into(),
        }
    }

    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: model.into(),
        }
    }
}

/// Text-to-speech provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsOptions {
    pub vendor: String,
    pub voice: String,
    pub style: Option<String>,
}

impl TtsOptions {
    pub fn murf(voice: impl Into<String>) -> Self {
        Self {
            vendor: "murf".to_string(),
            voice: voice.into(),
            style: None,
        }
    }

    pub fn google(voice: impl Into<String>) -> Self {
        Self {
            vendor: "google".to_string(),
            voice: voice.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// How the end of a user turn is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnDetection {
    /// End of speech as reported by the VAD.
    #[default]
    VadOnly,
    /// The multilingual end-of-utterance model on top of the VAD.
    Multilingual,
}

/// Noise cancellation applied to inbound room audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseCancellation {
    /// Background voice cancellation.
    Bvc,
}

/// Options for the room's inbound audio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomInputOptions {
    pub noise_cancellation: Option<NoiseCancellation>,
}

/// Silero VAD tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct VadOptions {
    pub min_speech_duration: f32,
    pub min_silence_duration: f32,
    pub prefix_padding_duration: f32,
    pub activation_threshold: f32,
    pub sample_rate: u32,
}

impl Default for VadOptions {
    fn default() -> Self {
        Self {
            min_speech_duration: 0.05,
            min_silence_duration: 0.55,
            prefix_padding_duration: 0.5,
            activation_threshold: 0.5,
            sample_rate: 16_000,
        }
    }
}

/// A loaded voice-activity detector, shared by every job in the process.
#[derive(Debug, PartialEq)]
pub struct VadModel {
    options: VadOptions,
}

impl VadModel {
    /// Validates the options and loads the detector.
    pub fn load(options: VadOptions) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&options.activation_threshold) {
            return Err(PipelineError::InvalidVadOption(
                "activation_threshold",
                format!("{} is outside [0, 1]", options.activation_threshold),
            ));
        }
        for (name, value) in [
            ("min_speech_duration", options.min_speech_duration),
            ("min_silence_duration", options.min_silence_duration),
            ("prefix_padding_duration", options.prefix_padding_duration),
        ] {
            if value < 0.0 {
                return Err(PipelineError::InvalidVadOption(
                    name,
                    format!("{} is negative", value),
                ));
            }
        }
        if !matches!(options.sample_rate, 8_000 | 16_000) {
            return Err(PipelineError::InvalidVadOption(
                "sample_rate",
                format!("{} Hz is not supported (8000 or 16000)", options.sample_rate),
            ));
        }
        info!(?options, "Loaded VAD model");
        Ok(Self { options })
    }

    pub fn options(&self) -> &VadOptions {
        &self.options
    }
}

/// The full set of providers a session is started with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stt: SttOptions,
    pub llm: LlmOptions,
    pub tts: TtsOptions,
    pub vad: Arc<VadModel>,
    pub turn_detection: TurnDetection,
}
