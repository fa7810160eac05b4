//! Conversation sessions.
//!
//! A session owns an append-only transcript. It starts with one welcome
//! message from the assistant, then alternates user and assistant turns:
//!
//! ```text
//! AwaitingInput --submit_user--> Processing --record_reply--> AwaitingInput
//!                                 Processing --abandon_pending--> AwaitingInput
//! ```
//!
//! The user turn is appended before any network call, so it is part of the
//! transcript the model sees. There is no terminal state; a session lives
//! as long as its owner keeps it. The transcript is never trimmed.

use crate::core_types::{Message, MessageRole};
use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_warn};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Seed message every session starts with
pub const WELCOME_MESSAGE: &str = "Hello! I am your telesales data assistant. I have ingested \
the 4-week Excel model, the 12-week dashboard figures and the call datasets. \
What would you like to know?";

/// Assistant turn recorded when a reply was abandoned mid-flight
pub const INTERRUPTED_REPLY: &str = "The previous question was interrupted before an answer \
arrived. Please ask it again.";

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle with history; ready for the next question
    AwaitingInput,
    /// A user turn was appended and its reply is pending
    Processing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::AwaitingInput => write!(f, "awaiting_input"),
            SessionState::Processing => write!(f, "processing"),
        }
    }
}

/// One user's transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    messages: Vec<Message>,
    state: SessionState,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::with_welcome(WELCOME_MESSAGE)
    }

    pub fn with_welcome(welcome: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(welcome)],
            state: SessionState::AwaitingInput,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the welcome message is present from the start.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of user turns submitted so far
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    /// Append a user turn and move to `Processing`.
    ///
    /// # Errors
    ///
    /// [`InsightsError::EmptyPrompt`] for blank input;
    /// [`InsightsError::InvalidSessionState`] while a reply is pending.
    pub fn submit_user(&mut self, text: impl Into<String>) -> InsightsResult<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InsightsError::EmptyPrompt);
        }
        self.expect_state(SessionState::AwaitingInput)?;

        self.messages.push(Message::user(text));
        self.state = SessionState::Processing;

        log_debug!(
            transcript_len = self.messages.len(),
            "User turn appended"
        );
        Ok(())
    }

    /// Append the assistant reply (answer or error text alike) and return
    /// to `AwaitingInput`.
    ///
    /// # Errors
    ///
    /// [`InsightsError::InvalidSessionState`] unless a user turn is pending.
    pub fn record_reply(&mut self, text: impl Into<String>) -> InsightsResult<&Message> {
        self.expect_state(SessionState::Processing)?;

        self.messages.push(Message::assistant(text));
        self.state = SessionState::AwaitingInput;

        log_debug!(
            transcript_len = self.messages.len(),
            "Assistant turn appended"
        );
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Close a pending turn whose reply will never arrive, recording `text`
    /// as its assistant turn. Returns whether a turn was pending.
    pub fn abandon_pending(&mut self, text: impl Into<String>) -> bool {
        if self.state != SessionState::Processing {
            return false;
        }

        self.messages.push(Message::assistant(text));
        self.state = SessionState::AwaitingInput;

        log_warn!(
            transcript_len = self.messages.len(),
            "Pending turn abandoned"
        );
        true
    }

    /// Transcript as `role: content` lines, oldest first
    pub fn render_transcript(&self) -> String {
        self.messages
            .iter()
            .map(Message::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expect_state(&self, expected: SessionState) -> InsightsResult<()> {
        if self.state != expected {
            return Err(InsightsError::invalid_session_state(
                expected.to_string(),
                self.state.to_string(),
            ));
        }
        Ok(())
    }
}

/// Identifier handed to the hosting runtime for a session
pub type SessionId = Uuid;

/// A session guarded for use by its owning connection
pub type SharedSession = Arc<Mutex<ConversationSession>>;

/// Independent sessions keyed by id.
///
/// Sessions share nothing; each has its own lock so one user's pending
/// request never blocks another's.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new seeded session
    pub async fn create(&self) -> (SessionId, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ConversationSession::new()));
        self.sessions.write().await.insert(id, Arc::clone(&session));

        log_debug!(session_id = %id, "Session created");
        (id, session)
    }

    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session, dropping its transcript. Returns whether it existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        log_debug!(session_id = %id, removed = removed, "Session ended");
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
