//! Job Context
//!
//! Everything an entry point receives for one room: the room itself, the
//! data prepared once by the prewarm step, and the worker configuration.

use crate::config::Config;
use anyhow::Result;
use async_openai::config::OpenAIConfig;
use sdr_core::{
    error::SessionError,
    llm_client::{LLMClient, OpenAICompatibleClient},
    pipeline::LlmOptions,
    room::Room,
};
use std::sync::Arc;
use tracing::info;

pub struct JobContext<P> {
    pub room: Arc<Room>,
    /// Process data produced by prewarm. Written once before any job starts,
    /// read-only afterwards.
    pub proc: Arc<P>,
    pub config: Arc<Config>,
}

impl<P> JobContext<P> {
    pub fn new(room: Arc<Room>, proc: Arc<P>, config: Arc<Config>) -> Self {
        Self { room, proc, config }
    }

    /// Joins the room.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.room.connect()
    }

    /// Builds the chat completions client for the given model settings.
    pub fn llm_client(&self, options: &LlmOptions) -> Result<Arc<dyn LLMClient>> {
        let api_key = self.config.api_key_for(options.provider)?;
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(options.provider.api_base());
        info!(provider = ?options.provider, model = %options.model, "Using LLM provider");
        Ok(Arc::new(OpenAICompatibleClient::new(
            openai_config,
            options.model.clone(),
        )))
    }
}
