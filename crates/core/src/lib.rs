//! Core of the SDR voice agent: agents and their tools, lead capture and
//! persistence, reference data, and the session that binds an agent to a room.

pub mod agent;
pub mod error;
pub mod lead;
pub mod llm_client;
pub mod persistence;
pub mod pipeline;
pub mod reference;
pub mod room;
pub mod sdr;
pub mod session;

pub use agent::{Agent, BasicAgent};
pub use error::SessionError;
pub use lead::{LeadRecord, UpdateLeadInfoArgs};
pub use persistence::{JsonFileLeadSink, LeadSink, SaveOutcome};
pub use reference::ReferenceData;
pub use room::{Room, RoomTransport, Utterance};
pub use sdr::SdrAgent;
pub use session::{AgentSession, SayOptions, SessionEvent};
