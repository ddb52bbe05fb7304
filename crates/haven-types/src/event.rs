use serde::{Deserialize, Serialize};

use crate::message::{DeliveryStatus, Message};
use crate::theme::ThemePreference;

/// Events emitted by the session manager and its collaborators.
/// The view layer subscribes to these for reactive updates; state flows
/// one way (command in, event out).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Auth state changed (login, logout, bootstrap restore)
    SessionChanged { authenticated: bool },

    /// The backend rejected the stored token; the user must re-authenticate
    SessionExpired,

    /// A conversation's history finished loading and is now active
    ConversationOpened { conversation_id: Option<String> },

    /// The paged conversation list gained or replaced entries
    ConversationListUpdated { total: usize },

    /// A message was appended to the active timeline
    MessageAppended { message: Message },

    /// A pending message reached a terminal delivery status
    MessageResolved { id: String, status: DeliveryStatus },

    /// The "assistant is composing" indicator toggled
    AssistantComposing { composing: bool },

    /// The recording toggle moved to a new state
    RecordingChanged { state: String },

    /// A transcript was appended to the composer buffer
    TranscriptReady { text: String },

    /// Theme preference changed
    ThemeChanged { theme: ThemePreference },

    /// A recoverable error the view should surface
    Error { message: String },
}
