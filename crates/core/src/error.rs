#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has not been started")]
    NotStarted,
    #[error("session is already running")]
    AlreadyStarted,
    #[error("room '{0}' is closed")]
    RoomClosed(String),
    #[error("failed to start the agent's tool service: {0}")]
    ToolService(String),
    #[error("failed to build chat message: {0}")]
    Message(#[from] async_openai::error::OpenAIError),
    #[error("failed to play agent speech: {0}")]
    Playback(String),
}
