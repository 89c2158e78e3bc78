//! Conversational Agents
//!
//! An agent is the policy object a session runs: its system instructions plus
//! the tools the model may call. Tools are exposed through the Model Context
//! Protocol, so every agent is an MCP [`ServerHandler`].

use rmcp::ServerHandler;

/// A prompt together with the tool registry served to the model.
pub trait Agent: ServerHandler {
    /// The system instructions for the conversation.
    fn instructions(&self) -> &str;
}

/// An agent without tools.
#[derive(Debug, Clone, Default)]
pub struct BasicAgent {
    instructions: String,
}

impl BasicAgent {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }
}

impl ServerHandler for BasicAgent {}

impl Agent for BasicAgent {
    fn instructions(&self) -> &str {
        &self.instructions
    }
}
