//! The active conversation: an append-only message log plus the
//! composing indicator.
//!
//! The timeline never reorders and never edits a message in place; the
//! single exception is the pending → sent/failed status transition.

use chrono::Utc;
use haven_types::message::{DeliveryStatus, Message, Sender};

/// State of the conversation currently on screen.
///
/// `active_conversation_id` is `None` only for a new, unsent
/// conversation; it is minted on the first successful send, never
/// before. The `epoch` counter bumps whenever a different conversation
/// becomes active, so completions from a previous conversation can be
/// recognised as stale and dropped.
pub struct ConversationState {
    active_conversation_id: Option<String>,
    timeline: Vec<Message>,
    assistant_composing: bool,
    epoch: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            active_conversation_id: None,
            timeline: Vec::new(),
            assistant_composing: false,
            epoch: 0,
        }
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.timeline
    }

    pub fn is_composing(&self) -> bool {
        self.assistant_composing
    }

    /// Identity of the currently active conversation; compared by the
    /// session manager against the value captured before an await.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the timeline with a different conversation's history.
    pub fn open(&mut self, conversation_id: Option<String>, history: Vec<Message>) {
        self.active_conversation_id = conversation_id;
        self.timeline = history;
        self.assistant_composing = false;
        self.epoch += 1;
    }

    /// Attach the id minted on the first successful send. Same logical
    /// conversation, so the epoch does not change.
    pub fn adopt_conversation_id(&mut self, id: impl Into<String>) {
        debug_assert!(self.active_conversation_id.is_none());
        self.active_conversation_id = Some(id.into());
    }

    /// Optimistically append a user message as `Pending`. Whitespace-only
    /// text is rejected and nothing is appended.
    pub fn append_user_message(&mut self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let msg = Message::user(self.mint_message_id(), text);
        self.timeline.push(msg.clone());
        Some(msg)
    }

    /// Transition a pending message to a terminal status. Unknown ids and
    /// already-terminal messages are left alone, so a duplicate or late
    /// completion is harmless. Returns whether a transition happened.
    pub fn resolve_pending(&mut self, id: &str, outcome: DeliveryStatus) -> bool {
        if !outcome.is_terminal() {
            return false;
        }
        match self
            .timeline
            .iter_mut()
            .find(|m| m.id == id && m.status == DeliveryStatus::Pending)
        {
            Some(msg) => {
                msg.status = outcome;
                true
            }
            None => false,
        }
    }

    /// Append an assistant message (already delivered, so `Sent`). Clears
    /// the composing indicator in the same call.
    pub fn append_assistant_message(&mut self, text: impl Into<String>) -> Message {
        let msg = Message::assistant(self.mint_message_id(), text);
        self.timeline.push(msg.clone());
        self.assistant_composing = false;
        msg
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.assistant_composing = composing;
    }

    pub fn find(&self, id: &str) -> Option<&Message> {
        self.timeline.iter().find(|m| m.id == id)
    }

    /// Local message id: millisecond timestamp, collision-checked against
    /// the timeline (two appends can land on the same millisecond).
    fn mint_message_id(&self) -> String {
        let millis = Utc::now().timestamp_millis();
        let mut candidate = format!("msg-{}", millis);
        let mut bump = 1u32;
        while self.timeline.iter().any(|m| m.id == candidate) {
            candidate = format!("msg-{}-{}", millis, bump);
            bump += 1;
        }
        candidate
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `id` names a failed user message whose text can be re-sent.
pub fn is_retryable(msg: &Message) -> bool {
    msg.sender == Sender::User && msg.status == DeliveryStatus::Failed
}
