//! SDR Agent
//!
//! A sales development representative that answers questions from the
//! reference document and qualifies the caller as a lead. The model decides
//! when to record details and when the call is over; the agent only offers
//! the two tools and keeps the captured record.

use crate::{
    agent::Agent,
    lead::{LeadRecord, UpdateLeadInfoArgs},
    persistence::LeadSink,
    reference::ReferenceData,
};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

const INSTRUCTIONS_TEMPLATE: &str = include_str!("../prompts/sdr_instructions.md");

pub const LEAD_UPDATED: &str = "Lead information updated successfully.";
pub const CALL_FINALIZED: &str = "Call finalized and lead data saved.";

/// Renders the SDR instructions with the reference document embedded.
pub fn render_instructions(reference: &ReferenceData) -> String {
    INSTRUCTIONS_TEMPLATE.replace("{company_information}", &reference.to_pretty_json())
}

/// The lead-qualification agent for one conversation.
pub struct SdrAgent {
    instructions: String,
    lead: Arc<Mutex<LeadRecord>>,
    sink: Arc<dyn LeadSink>,
    tool_router: ToolRouter<Self>,
}

impl Agent for SdrAgent {
    fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[tool_handler]
impl ServerHandler for SdrAgent {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(self.instructions.clone()),
            ..Default::default()
        }
    }
}

#[tool_router]
impl SdrAgent {
    /// Creates an agent with an empty lead record.
    pub fn new(reference: &ReferenceData, sink: Arc<dyn LeadSink>) -> Self {
        Self {
            instructions: render_instructions(reference),
            lead: Arc::new(Mutex::new(LeadRecord::default())),
            sink,
            tool_router: Self::tool_router(),
        }
    }

    /// A handle on the record this agent is filling in.
    pub fn lead(&self) -> Arc<Mutex<LeadRecord>> {
        self.lead.clone()
    }

    #[tool(description = "Updates the lead information with new details provided by the user.")]
    pub async fn update_lead_info(
        &self,
        args: Parameters<UpdateLeadInfoArgs>,
    ) -> Result<String, String> {
        let mut lead = self.lead.lock().await;
        lead.apply(args.0);
        info!(lead = ?*lead, "Updated lead data");
        Ok(LEAD_UPDATED.to_string())
    }

    #[tool(
        description = "Call this when the user indicates they are done or wants to end the conversation."
    )]
    pub async fn finalize_call(&self) -> Result<String, String> {
        info!("Executing tool 'finalize_call'");
        let lead = self.lead.lock().await.clone();
        let outcome = self.sink.save(&lead).await;
        info!(?outcome, "Call finalized");
        Ok(CALL_FINALIZED.to_string())
    }
}
