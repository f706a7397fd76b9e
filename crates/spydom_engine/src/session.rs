use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
    #[error("browser protocol error: {0}")]
    Protocol(String),
    #[error("session closed")]
    Closed,
}

/// How a script passed to [`BrowserSession::evaluate`] is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Plain page context.
    Page,
    /// Page context with the DevTools command-line API (`getEventListeners`, ...).
    DevTools,
}

/// One isolated browser session. A worker owns exactly one for its whole lifetime.
#[async_trait::async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and wait for the load event. Deadlines are applied by the caller.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// URL of the currently loaded document.
    async fn current_url(&self) -> Result<String, SessionError>;

    async fn title(&self) -> Result<String, SessionError>;

    /// Serialized outer HTML of the rendered document.
    async fn content(&self) -> Result<String, SessionError>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    async fn evaluate(
        &self,
        script: &str,
        mode: EvalMode,
    ) -> Result<serde_json::Value, SessionError>;

    async fn close(&self) -> Result<(), SessionError>;
}

/// Long-lived resource that hands out isolated sessions.
#[async_trait::async_trait]
pub trait SessionAllocator: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>, SessionError>;

    /// Release the allocator after every session it produced has been closed.
    async fn shutdown(&self) -> Result<(), SessionError>;
}
