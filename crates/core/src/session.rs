//! Agent Sessions
//!
//! An [`AgentSession`] binds an agent to a room for one conversation. The
//! agent's tools are served over an in-process MCP transport; each final
//! user transcript drives one reason-and-act turn against the language model,
//! and the resulting text is spoken back into the room.

use crate::{
    agent::Agent,
    error::SessionError,
    llm_client::{LLMAction, LLMClient, LLMStreamEvent, ToolCall},
    pipeline::{PipelineConfig, RoomInputOptions},
    room::{Room, Utterance},
};
use anyhow::{Context, Result};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolArgs,
    FunctionObjectArgs,
};
use futures::StreamExt;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, JsonObject, RawContent},
    service::{RoleClient, RunningService},
};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{Instrument, Span, error, info, warn};

/// Upper bound on consecutive tool rounds within one user turn.
pub const MAX_TOOL_ROUNDS: usize = 4;

const EVENT_CAPACITY: usize = 64;

/// Events observable through [`AgentSession::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    UserInputTranscribed { text: String },
    AgentStartedSpeaking,
    AgentStoppedSpeaking,
    FunctionToolsExecuted { names: Vec<String> },
    Closed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SayOptions {
    pub text_pacing: bool,
}

type History = Arc<Mutex<Vec<ChatCompletionRequestMessage>>>;

pub struct AgentSession {
    pipeline: PipelineConfig,
    llm: Arc<dyn LLMClient>,
    events: broadcast::Sender<SessionEvent>,
    active: Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    speaker: Speaker,
    history: History,
}

#[derive(Clone)]
struct Speaker {
    room: Arc<Room>,
    events: broadcast::Sender<SessionEvent>,
}

impl Speaker {
    async fn speak(&self, utterance: Utterance) -> Result<(), SessionError> {
        let _ = self.events.send(SessionEvent::AgentStartedSpeaking);
        let result = self
            .room
            .transport()
            .play(&utterance)
            .await
            .map_err(|e| SessionError::Playback(e.to_string()));
        let _ = self.events.send(SessionEvent::AgentStoppedSpeaking);
        result
    }
}

impl AgentSession {
    pub fn new(pipeline: PipelineConfig, llm: Arc<dyn LLMClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pipeline,
            llm,
            events,
            active: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Binds `agent` to `room` and starts the conversation task.
    ///
    /// The task idles until the room is connected. The spawned tasks inherit
    /// the caller's tracing span.
    pub async fn start<A: Agent>(
        &self,
        agent: A,
        room: Arc<Room>,
        options: RoomInputOptions,
    ) -> Result<(), SessionError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let mut history: Vec<ChatCompletionRequestMessage> = Vec::new();
        if !agent.instructions().is_empty() {
            history.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(agent.instructions())
                    .build()?
                    .into(),
            );
        }

        let (server_transport, client_transport) = tokio::io::duplex(4096);
        tokio::spawn(
            async move {
                match agent.serve(server_transport).await {
                    Ok(service) => {
                        let _ = service.waiting().await;
                    }
                    Err(e) => error!(error = %e, "Agent tool service failed to start"),
                }
            }
            .instrument(Span::current()),
        );
        let tools_client = ()
            .serve(client_transport)
            .await
            .map_err(|e| SessionError::ToolService(e.to_string()))?;
        let tools = tool_definitions(&tools_client)
            .await
            .map_err(|e| SessionError::ToolService(e.to_string()))?;

        info!(
            room = %room.name(),
            stt = ?self.pipeline.stt,
            llm = ?self.pipeline.llm,
            tts = ?self.pipeline.tts,
            vad = ?self.pipeline.vad.options(),
            turn_detection = ?self.pipeline.turn_detection,
            noise_cancellation = ?options.noise_cancellation,
            tools = tools.len(),
            "Agent session started"
        );

        let history = Arc::new(Mutex::new(history));
        let speaker = Speaker {
            room,
            events: self.events.clone(),
        };
        let conversation = Conversation {
            llm: self.llm.clone(),
            tools_client,
            tools,
            history: history.clone(),
            speaker: speaker.clone(),
        };
        tokio::spawn(conversation.run().instrument(Span::current()));

        *active = Some(ActiveSession { speaker, history });
        Ok(())
    }

    /// Speaks `text` directly, bypassing the model. The text is recorded as an
    /// assistant turn.
    pub async fn say(&self, text: impl Into<String>, options: SayOptions) -> Result<(), SessionError> {
        let (speaker, history) = {
            let active = self.active.lock().await;
            let active = active.as_ref().ok_or(SessionError::NotStarted)?;
            (active.speaker.clone(), active.history.clone())
        };
        let text = text.into();
        history.lock().await.push(assistant_text(&text)?);
        speaker
            .speak(Utterance {
                text,
                text_pacing: options.text_pacing,
            })
            .await
    }
}

struct Conversation {
    llm: Arc<dyn LLMClient>,
    tools_client: RunningService<RoleClient, ()>,
    tools: Vec<ChatCompletionTool>,
    history: History,
    speaker: Speaker,
}

impl Conversation {
    async fn run(self) {
        let room = self.speaker.room.clone();
        if room.wait_connected().await {
            while let Some(transcript) = room.transport().next_transcript().await {
                let text = transcript.trim();
                if text.is_empty() {
                    continue;
                }
                let _ = self.speaker.events.send(SessionEvent::UserInputTranscribed {
                    text: text.to_string(),
                });
                if let Err(e) = self.handle_turn(text).await {
                    error!(error = ?e, "Failed to handle user turn");
                }
            }
            info!("Participant left the room");
        }

        room.close();
        let _ = self.speaker.events.send(SessionEvent::Closed);
        if let Err(e) = self.tools_client.cancel().await {
            warn!(error = %e, "Tool client did not shut down cleanly");
        }
    }

    /// Runs one reason-and-act turn for a user utterance.
    async fn handle_turn(&self, user_text: &str) -> Result<()> {
        let mut messages = self.history.lock().await.clone();
        let turn_start = messages.len();
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()?
                .into(),
        );

        let mut reply = None;
        for _ in 0..MAX_TOOL_ROUNDS {
            match self
                .llm
                .decide_action(messages.clone(), self.tools.clone())
                .await?
            {
                LLMAction::TextResponse(text) => {
                    reply = Some(text);
                    break;
                }
                LLMAction::ToolCall(tool_calls) => {
                    self.run_tools(&mut messages, tool_calls).await?;
                }
            }
        }

        let reply = match reply {
            Some(text) => text,
            None => {
                warn!(rounds = MAX_TOOL_ROUNDS, "Tool round limit reached, asking for a final answer");
                let mut stream = self.llm.stream_after_tools(messages.clone()).await?;
                let mut full = String::new();
                while let Some(event) = stream.next().await {
                    match event {
                        Ok(LLMStreamEvent::TextChunk(chunk)) => full.push_str(&chunk),
                        Err(e) => warn!(error = %e, "LLM stream error"),
                    }
                }
                full
            }
        };

        if !reply.is_empty() {
            messages.push(assistant_text(&reply)?);
        }
        self.history
            .lock()
            .await
            .extend(messages.drain(turn_start..));

        if !reply.is_empty() {
            self.speaker
                .speak(Utterance {
                    text: reply,
                    text_pacing: false,
                })
                .await?;
        }
        Ok(())
    }

    async fn run_tools(
        &self,
        messages: &mut Vec<ChatCompletionRequestMessage>,
        tool_calls: Vec<ToolCall>,
    ) -> Result<()> {
        messages.push(
            ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(tool_calls.clone())
                .build()?
                .into(),
        );

        let mut names = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            info!(tool = %call.function.name, "Executing tool call");
            let result = self.call_tool(&call).await;
            messages.push(
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call.id.clone())
                    .content(result)
                    .build()?
                    .into(),
            );
            names.push(call.function.name);
        }
        let _ = self
            .speaker
            .events
            .send(SessionEvent::FunctionToolsExecuted { names });
        Ok(())
    }

    /// Calls a tool and returns its text output. Failures become an error
    /// payload for the model rather than ending the turn.
    async fn call_tool(&self, call: &ToolCall) -> String {
        let raw_arguments = call.function.arguments.trim();
        let arguments = if raw_arguments.is_empty() {
            None
        } else {
            match serde_json::from_str::<JsonObject>(raw_arguments) {
                Ok(arguments) => Some(arguments),
                Err(e) => {
                    warn!(tool = %call.function.name, error = %e, "Invalid tool arguments");
                    return error_payload(&format!("Invalid tool arguments: {}", e));
                }
            }
        };

        let result = self
            .tools_client
            .peer()
            .call_tool(CallToolRequestParam {
                name: call.function.name.clone().into(),
                arguments,
            })
            .await;

        match result {
            Ok(result) => match result.content.and_then(|mut content| content.pop()) {
                Some(annotated) => match annotated.raw {
                    RawContent::Text(text_content) => text_content.text,
                    _ => error_payload("Unexpected content type from tool"),
                },
                None => error_payload("Tool call returned no content"),
            },
            Err(e) => {
                error!(tool = %call.function.name, error = %e, "Tool call failed");
                error_payload(&e.to_string())
            }
        }
    }
}

/// Lists the agent's tools in the shape the chat completions API expects.
async fn tool_definitions(client: &RunningService<RoleClient, ()>) -> Result<Vec<ChatCompletionTool>> {
    client
        .list_all_tools()
        .await
        .context("Failed to list agent tools")?
        .into_iter()
        .map(|t| -> Result<ChatCompletionTool> {
            Ok(ChatCompletionToolArgs::default()
                .function(
                    FunctionObjectArgs::default()
                        .name(t.name)
                        .description(t.description.unwrap_or_default())
                        .parameters(serde_json::to_value(&*t.input_schema)?)
                        .build()?,
                )
                .build()?)
        })
        .collect()
}

fn assistant_text(text: &str) -> Result<ChatCompletionRequestMessage, async_openai::error::OpenAIError> {
    Ok(ChatCompletionRequestAssistantMessageArgs::default()
        .content(text)
        .build()?
        .into())
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::BasicAgent,
        lead::LeadRecord,
        llm_client::MockLLMClient,
        persistence::JsonFileLeadSink,
        pipeline::{LlmOptions, SttOptions, TtsOptions, TurnDetection, VadModel, VadOptions},
        reference::ReferenceData,
        room::RoomTransport,
        sdr::SdrAgent,
    };
    use async_openai::{
        error::OpenAIError,
        types::{ChatCompletionToolType, FunctionCall},
    };
    use async_trait::async_trait;
    use std::{sync::Mutex as StdMutex, time::Duration};
    use tokio::sync::mpsc;

    struct ScriptedTransport {
        transcripts: Mutex<mpsc::UnboundedReceiver<String>>,
        spoken: mpsc::UnboundedSender<Utterance>,
    }

    #[async_trait]
    impl RoomTransport for ScriptedTransport {
        async fn next_transcript(&self) -> Option<String> {
            self.transcripts.lock().await.recv().await
        }

        async fn play(&self, utterance: &Utterance) -> anyhow::Result<()> {
            self.spoken.send(utterance.clone())?;
            Ok(())
        }
    }

    struct Harness {
        room: Arc<Room>,
        say: mpsc::UnboundedSender<String>,
        heard: mpsc::UnboundedReceiver<Utterance>,
    }

    impl Harness {
        fn new() -> Self {
            let (say, transcripts) = mpsc::unbounded_channel();
            let (spoken, heard) = mpsc::unbounded_channel();
            let transport = ScriptedTransport {
                transcripts: Mutex::new(transcripts),
                spoken,
            };
            Self {
                room: Arc::new(Room::new("test-room", Arc::new(transport))),
                say,
                heard,
            }
        }

        async fn next_spoken(&mut self) -> Utterance {
            tokio::time::timeout(Duration::from_secs(5), self.heard.recv())
                .await
                .expect("timed out waiting for agent speech")
                .expect("transport dropped")
        }
    }

    fn pipeline() -> PipelineConfig {
        PipelineConfig {
            stt: SttOptions::deepgram().with_model("nova-3"),
            llm: LlmOptions::google("gemini-1.5-flash"),
            tts: TtsOptions::murf("en-US-matthew").with_style("Conversation"),
            vad: Arc::new(VadModel::load(VadOptions::default()).unwrap()),
            turn_detection: TurnDetection::Multilingual,
        }
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_model_driven_lead_capture_and_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let offered_tools = Arc::new(StdMutex::new(Vec::<String>::new()));

        let mut llm = MockLLMClient::new();
        let seen = offered_tools.clone();
        let mut call = 0usize;
        llm.expect_decide_action()
            .times(4)
            .returning(move |_history, tools| {
                call += 1;
                if call == 1 {
                    *seen.lock().unwrap() =
                        tools.iter().map(|t| t.function.name.clone()).collect();
                }
                Ok(match call {
                    1 => LLMAction::ToolCall(vec![tool_call(
                        "call-1",
                        "update_lead_info",
                        r#"{"name": "Jane Doe", "company": "Acme"}"#,
                    )]),
                    2 => LLMAction::TextResponse("Nice to meet you, Jane.".into()),
                    3 => LLMAction::ToolCall(vec![tool_call("call-2", "finalize_call", "{}")]),
                    _ => LLMAction::TextResponse("Thanks, talk soon!".into()),
                })
            });

        let session = AgentSession::new(pipeline(), Arc::new(llm));
        let agent = SdrAgent::new(
            &ReferenceData::default(),
            Arc::new(JsonFileLeadSink::new(dir.path())),
        );
        let lead = agent.lead();
        let mut events = session.subscribe();
        let mut harness = Harness::new();

        session
            .start(agent, harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap();
        harness.room.connect().unwrap();

        harness.say.send("I'm Jane Doe from Acme".into()).unwrap();
        assert_eq!(harness.next_spoken().await.text, "Nice to meet you, Jane.");
        assert_eq!(
            *lead.lock().await,
            LeadRecord {
                name: Some("Jane Doe".into()),
                company: Some("Acme".into()),
                ..Default::default()
            }
        );

        harness.say.send("That's all".into()).unwrap();
        assert_eq!(harness.next_spoken().await.text, "Thanks, talk soon!");
        let body = std::fs::read_to_string(dir.path().join("lead_Jane_Doe.json")).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            serde_json::json!({"name": "Jane Doe", "company": "Acme"})
        );

        let mut offered = offered_tools.lock().unwrap().clone();
        offered.sort();
        assert_eq!(offered, vec!["finalize_call", "update_lead_info"]);

        drop(harness.say);
        tokio::time::timeout(Duration::from_secs(5), harness.room.closed())
            .await
            .unwrap();

        let mut executed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::FunctionToolsExecuted { names } = event {
                executed.extend(names);
            }
        }
        assert_eq!(executed, vec!["update_lead_info", "finalize_call"]);
    }

    #[tokio::test]
    async fn test_say_requires_started_session() {
        let session = AgentSession::new(pipeline(), Arc::new(MockLLMClient::new()));
        let err = session
            .say("Hello", SayOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotStarted));
    }

    #[tokio::test]
    async fn test_session_cannot_start_twice() {
        let session = AgentSession::new(pipeline(), Arc::new(MockLLMClient::new()));
        let harness = Harness::new();
        session
            .start(BasicAgent::default(), harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap();

        let err = session
            .start(BasicAgent::default(), harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_say_emits_speaking_events() {
        let session = AgentSession::new(pipeline(), Arc::new(MockLLMClient::new()));
        let mut harness = Harness::new();
        let mut events = session.subscribe();
        session
            .start(BasicAgent::default(), harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap();
        harness.room.connect().unwrap();

        session
            .say("Hello. This is a test.", SayOptions { text_pacing: true })
            .await
            .unwrap();

        assert_eq!(
            harness.next_spoken().await,
            Utterance {
                text: "Hello. This is a test.".into(),
                text_pacing: true,
            }
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::AgentStartedSpeaking);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::AgentStoppedSpeaking);
    }

    #[tokio::test]
    async fn test_agent_without_tools_and_failed_turns() {
        let mut llm = MockLLMClient::new();
        let mut call = 0usize;
        llm.expect_decide_action()
            .withf(|_history, tools| tools.is_empty())
            .times(2)
            .returning(move |_, _| {
                call += 1;
                if call == 1 {
                    Err(anyhow::anyhow!("model unavailable"))
                } else {
                    Ok(LLMAction::TextResponse("Hi there.".into()))
                }
            });

        let session = AgentSession::new(pipeline(), Arc::new(llm));
        let mut harness = Harness::new();
        session
            .start(BasicAgent::default(), harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap();
        harness.room.connect().unwrap();

        harness.say.send("hello?".into()).unwrap();
        harness.say.send("hello again".into()).unwrap();

        assert_eq!(harness.next_spoken().await.text, "Hi there.");
    }

    #[tokio::test]
    async fn test_tool_round_limit_falls_back_to_stream() {
        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(MAX_TOOL_ROUNDS)
            .returning(|_, _| {
                Ok(LLMAction::ToolCall(vec![tool_call(
                    "loop",
                    "update_lead_info",
                    r#"{"timeline": "soon"}"#,
                )]))
            });
        llm.expect_stream_after_tools().times(1).returning(|_| {
            Ok(Box::pin(futures::stream::iter(vec![
                Ok::<_, OpenAIError>(LLMStreamEvent::TextChunk("Got it, ".into())),
                Ok(LLMStreamEvent::TextChunk("thanks.".into())),
            ])))
        });

        let session = AgentSession::new(pipeline(), Arc::new(llm));
        let agent = SdrAgent::new(
            &ReferenceData::default(),
            Arc::new(JsonFileLeadSink::new(".")),
        );
        let lead = agent.lead();
        let mut harness = Harness::new();
        session
            .start(agent, harness.room.clone(), RoomInputOptions::default())
            .await
            .unwrap();
        harness.room.connect().unwrap();

        harness.say.send("We start soon".into()).unwrap();

        assert_eq!(harness.next_spoken().await.text, "Got it, thanks.");
        assert_eq!(lead.lock().await.timeline.as_deref(), Some("soon"));
    }
}
