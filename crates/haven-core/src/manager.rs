//! The session manager — orchestrates auth, conversation selection, and
//! message dispatch over the port traits.
//!
//! All transitions run to completion on the single event loop; ports are
//! handed in per call, so the same logic runs unchanged against the real
//! backend or a scripted fake.

use std::time::Instant;

use haven_types::config::ClientConfig;
use haven_types::event::ChatEvent;
use haven_types::message::{DeliveryStatus, Message};
use haven_types::session::{Session, User};
use haven_types::theme::ThemePreference;
use haven_types::{ChatError, Result};
use serde_json::{json, Value};

use crate::event_bus::EventBus;
use crate::ports::{HttpResponse, Method, SpeechPort, StoragePort, TransportPort};
use crate::recorder::Recorder;
use crate::repository::ConversationRepository;
use crate::session_store;
use crate::timeline::{self, ConversationState};

/// Where the manager is in the login cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

pub struct SessionManager {
    config: ClientConfig,
    phase: AuthPhase,
    session: Session,
    theme: ThemePreference,
    conversation: ConversationState,
    repository: ConversationRepository,
    recorder: Recorder,
    /// Draft text the view is editing; transcripts land here.
    composer: String,
    event_bus: EventBus,
}

impl SessionManager {
    pub fn new(config: ClientConfig, event_bus: EventBus) -> Self {
        let repository = ConversationRepository::new(config.api_base.clone(), config.page_size);
        let recorder = Recorder::new(config.recording_timeout, event_bus.clone());
        Self {
            config,
            phase: AuthPhase::LoggedOut,
            session: Session::logged_out(),
            theme: ThemePreference::default(),
            conversation: ConversationState::new(),
            repository,
            recorder,
            composer: String::new(),
            event_bus,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn repository(&self) -> &ConversationRepository {
        &self.repository
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    /// Hand the draft to the caller (usually right before a send).
    pub fn take_composer(&mut self) -> String {
        std::mem::take(&mut self.composer)
    }

    fn api_path(&self, route: &str) -> String {
        format!("{}{}", self.config.api_base, route)
    }

    // ─── Auth ────────────────────────────────────────────────

    /// Restore persisted session and theme at app start.
    pub async fn bootstrap(&mut self, storage: &dyn StoragePort) {
        self.session = session_store::load(storage).await;
        self.theme = session_store::load_theme(storage).await;
        if self.session.is_authenticated() {
            self.phase = AuthPhase::LoggedIn;
            log::info!(
                "session restored for {}",
                self.session.user().map(|u| u.email.as_str()).unwrap_or("?")
            );
        }
        self.event_bus.emit(ChatEvent::SessionChanged {
            authenticated: self.session.is_authenticated(),
        });
    }

    pub async fn login(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
        email: &str,
        password: &str,
    ) -> Result<()> {
        self.phase = AuthPhase::LoggingIn;
        let result = self.do_login(transport, storage, email, password).await;
        match &result {
            Ok(()) => {
                self.phase = AuthPhase::LoggedIn;
                self.event_bus
                    .emit(ChatEvent::SessionChanged { authenticated: true });
            }
            Err(e) => {
                self.phase = AuthPhase::LoggedOut;
                self.event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn do_login(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let body = json!({ "email": email, "password": password });
        let resp = transport
            .request(Method::Post, &self.api_path("/auth/login"), None, Some(body))
            .await?;

        if !resp.is_success() {
            return Err(ChatError::Auth(resp.message()));
        }

        let token = str_field(&resp, "token")
            .ok_or_else(|| ChatError::Auth("malformed login response".to_string()))?;
        let user = User {
            id: str_field(&resp, "user_id")
                .ok_or_else(|| ChatError::Auth("malformed login response".to_string()))?,
            display_name: str_field(&resp, "name").unwrap_or_default(),
            email: email.to_string(),
        };

        self.session = Session::authenticated(user, token);
        if let Err(e) = session_store::save(storage, &self.session).await {
            // Login still succeeds; the session just won't survive restart.
            log::warn!("failed to persist session: {}", e);
        }
        log::info!("logged in as {}", email);
        Ok(())
    }

    /// Create an account. Success does not log the user in; the backend
    /// answers "you can now log in".
    pub async fn register(
        &mut self,
        transport: &dyn TransportPort,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String> {
        let body = json!({ "name": name, "email": email, "password": password });
        let resp = transport
            .request(Method::Post, &self.api_path("/auth/register"), None, Some(body))
            .await?;
        if !resp.is_success() {
            return Err(ChatError::Auth(resp.message()));
        }
        Ok(resp.message())
    }

    /// Log out locally no matter what; server-side invalidation is
    /// best-effort only.
    pub async fn logout(&mut self, transport: &dyn TransportPort, storage: &dyn StoragePort) {
        if let Some(token) = self.session.token().map(str::to_string) {
            if let Err(e) = transport
                .request(
                    Method::Post,
                    &self.api_path("/auth/logout"),
                    Some(&token),
                    None,
                )
                .await
            {
                log::warn!("server-side logout failed (ignored): {}", e);
            }
        }
        self.drop_session(storage).await;
        self.event_bus
            .emit(ChatEvent::SessionChanged { authenticated: false });
    }

    /// The stored token was rejected (401): clear everything and ask the
    /// view to prompt for re-authentication.
    async fn expire_session(&mut self, storage: &dyn StoragePort) {
        log::info!("session expired, logging out");
        self.drop_session(storage).await;
        self.event_bus.emit(ChatEvent::SessionExpired);
    }

    async fn drop_session(&mut self, storage: &dyn StoragePort) {
        if let Err(e) = session_store::clear(storage).await {
            log::warn!("failed to clear session store: {}", e);
        }
        self.session = Session::logged_out();
        self.phase = AuthPhase::LoggedOut;
        self.conversation.open(None, Vec::new());
    }

    /// Map a 401 on an authed call to session expiry. Guest-mode 401s are
    /// surfaced as-is; there is no session to expire.
    async fn check_expiry(&mut self, storage: &dyn StoragePort, err: &ChatError) {
        if matches!(err, ChatError::Auth(_)) && self.session.is_authenticated() {
            self.expire_session(storage).await;
        }
    }

    // ─── Theme ───────────────────────────────────────────────

    pub async fn set_theme(&mut self, storage: &dyn StoragePort, theme: ThemePreference) {
        if let Err(e) = session_store::save_theme(storage, theme).await {
            log::warn!("failed to persist theme: {}", e);
        }
        self.theme = theme;
        self.event_bus.emit(ChatEvent::ThemeChanged { theme });
    }

    // ─── Conversations ───────────────────────────────────────

    /// Refresh page 1 of the conversation list.
    pub async fn refresh_conversations(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
    ) -> Result<usize> {
        let token = self.session.token().map(str::to_string);
        let result = self.repository.refresh(transport, token.as_deref()).await;
        self.after_list_fetch(storage, result.as_ref().err().cloned())
            .await;
        result
    }

    /// Pull the next page of the conversation list.
    pub async fn load_more_conversations(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
    ) -> Result<bool> {
        let token = self.session.token().map(str::to_string);
        let result = self.repository.load_more(transport, token.as_deref()).await;
        self.after_list_fetch(storage, result.as_ref().err().cloned())
            .await;
        result
    }

    async fn after_list_fetch(&mut self, storage: &dyn StoragePort, err: Option<ChatError>) {
        match err {
            None => self.event_bus.emit(ChatEvent::ConversationListUpdated {
                total: self.repository.total(),
            }),
            Some(e) => {
                self.check_expiry(storage, &e).await;
                self.event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Load a conversation's history and make it active.
    pub async fn select_conversation(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
        id: &str,
    ) -> Result<()> {
        let token = self.session.token().map(str::to_string);
        let path = self.api_path(&format!("/conversations/{}/messages", id));
        let resp = transport
            .request(Method::Get, &path, token.as_deref(), None)
            .await
            .map_err(|e| ChatError::Fetch(e.to_string()));

        let history = match resp {
            Ok(resp) if resp.status == 401 => Err(ChatError::Auth(resp.message())),
            Ok(resp) if !resp.is_success() => Err(ChatError::Fetch(resp.message())),
            Ok(resp) => {
                let raw = resp.body.get("messages").cloned().unwrap_or(Value::Null);
                serde_json::from_value::<Vec<Message>>(raw)
                    .map_err(|e| ChatError::Fetch(format!("malformed history: {}", e)))
            }
            Err(e) => Err(e),
        };

        match history {
            Ok(history) => {
                self.conversation.open(Some(id.to_string()), history);
                self.event_bus.emit(ChatEvent::ConversationOpened {
                    conversation_id: Some(id.to_string()),
                });
                Ok(())
            }
            Err(e) => {
                // Failed load keeps whatever was active before.
                self.check_expiry(storage, &e).await;
                self.event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Start a fresh, unsent conversation and fetch the opening greeting.
    /// The conversation has no id until the first message lands. A failed
    /// greeting fetch leaves the fresh conversation open but empty.
    pub async fn new_conversation(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
    ) -> Result<()> {
        self.conversation.open(None, Vec::new());
        self.event_bus.emit(ChatEvent::ConversationOpened {
            conversation_id: None,
        });

        let token = self.session.token().map(str::to_string);
        let greeting = match transport
            .request(
                Method::Get,
                &self.api_path("/chat/initial"),
                token.as_deref(),
                None,
            )
            .await
        {
            Ok(resp) if resp.status == 401 => Err(ChatError::Auth(resp.message())),
            Ok(resp) if !resp.is_success() => Err(ChatError::Fetch(resp.message())),
            Ok(resp) => Ok(str_field(&resp, "response")),
            Err(e) => Err(e),
        };

        match greeting {
            Ok(Some(greeting)) => {
                let msg = self.conversation.append_assistant_message(greeting);
                self.event_bus.emit(ChatEvent::MessageAppended { message: msg });
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.check_expiry(storage, &e).await;
                self.event_bus.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // ─── Messages ────────────────────────────────────────────

    /// Optimistic send: the message is on screen as `Pending` before the
    /// request goes out, and resolves to `Sent` or `Failed` afterwards.
    /// For a new conversation a candidate id is minted and carried on the
    /// request, but only adopted locally if the send succeeds.
    pub async fn send_message(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
        text: &str,
    ) -> Result<()> {
        let Some(pending) = self.conversation.append_user_message(text) else {
            return Ok(()); // whitespace-only input
        };
        self.event_bus.emit(ChatEvent::MessageAppended {
            message: pending.clone(),
        });
        self.conversation.set_composing(true);
        self.event_bus
            .emit(ChatEvent::AssistantComposing { composing: true });

        let epoch = self.conversation.epoch();
        let token = self.session.token().map(str::to_string);
        let minted = match self.conversation.active_conversation_id() {
            Some(_) => None,
            None => Some(uuid::Uuid::new_v4().to_string()),
        };
        let conversation_id = self
            .conversation
            .active_conversation_id()
            .map(str::to_string)
            .or_else(|| minted.clone());
        let body = json!({
            "message": &pending.text,
            "conversation_id": conversation_id,
        });
        let result = transport
            .request(
                Method::Post,
                &self.api_path("/chat/send"),
                token.as_deref(),
                Some(body),
            )
            .await;

        self.finish_send(storage, epoch, &pending.id, minted, result)
            .await
    }

    /// Apply a send completion. If the user switched conversations while
    /// the request was in flight, the completion targets a timeline that
    /// is no longer active and is dropped whole.
    pub(crate) async fn finish_send(
        &mut self,
        storage: &dyn StoragePort,
        epoch: u64,
        pending_id: &str,
        minted: Option<String>,
        result: Result<HttpResponse>,
    ) -> Result<()> {
        if self.conversation.epoch() != epoch {
            log::debug!("send completion for inactive conversation dropped");
            return Ok(());
        }

        let failure = match result {
            Ok(resp) if resp.is_success() => {
                if let Some(minted) = minted {
                    if self.conversation.active_conversation_id().is_none() {
                        log::info!("minted conversation id {}", minted);
                        self.conversation.adopt_conversation_id(minted);
                    }
                }
                self.conversation.resolve_pending(pending_id, DeliveryStatus::Sent);
                self.event_bus.emit(ChatEvent::MessageResolved {
                    id: pending_id.to_string(),
                    status: DeliveryStatus::Sent,
                });
                if let Some(reply) = str_field(&resp, "response") {
                    let msg = self.conversation.append_assistant_message(reply);
                    self.event_bus
                        .emit(ChatEvent::AssistantComposing { composing: false });
                    self.event_bus.emit(ChatEvent::MessageAppended { message: msg });
                } else {
                    self.conversation.set_composing(false);
                    self.event_bus
                        .emit(ChatEvent::AssistantComposing { composing: false });
                }
                return Ok(());
            }
            Ok(resp) if resp.status == 401 => ChatError::Auth(resp.message()),
            Ok(resp) => ChatError::Send(resp.message()),
            Err(e) => ChatError::Send(e.to_string()),
        };

        // Delivery failed: mark this one message, keep the timeline.
        self.conversation
            .resolve_pending(pending_id, DeliveryStatus::Failed);
        self.conversation.set_composing(false);
        self.event_bus.emit(ChatEvent::MessageResolved {
            id: pending_id.to_string(),
            status: DeliveryStatus::Failed,
        });
        self.event_bus
            .emit(ChatEvent::AssistantComposing { composing: false });
        self.check_expiry(storage, &failure).await;
        self.event_bus.emit(ChatEvent::Error {
            message: failure.to_string(),
        });
        Err(failure)
    }

    /// Re-send a failed message's text as a brand-new message. The failed
    /// original stays in the timeline untouched.
    pub async fn retry_message(
        &mut self,
        transport: &dyn TransportPort,
        storage: &dyn StoragePort,
        id: &str,
    ) -> Result<()> {
        let text = match self.conversation.find(id) {
            Some(msg) if timeline::is_retryable(msg) => msg.text.clone(),
            _ => {
                return Err(ChatError::Send(format!(
                    "message {} is not retryable",
                    id
                )))
            }
        };
        self.send_message(transport, storage, &text).await
    }

    // ─── Recording ───────────────────────────────────────────

    /// Drive the recording toggle; a resolved transcript is appended to
    /// the composer buffer.
    pub async fn press_recording(&mut self, speech: &dyn SpeechPort) -> Result<()> {
        let transcript = self.recorder.press(speech).await?;
        self.accept_transcript(transcript);
        Ok(())
    }

    pub async fn cancel_recording(&mut self, speech: &dyn SpeechPort) {
        self.recorder.cancel(speech).await;
    }

    /// Timer tick for the fail-safe stop.
    pub async fn poll_recording_timeout(&mut self, speech: &dyn SpeechPort) -> Result<()> {
        let transcript = self.recorder.poll_timeout(Instant::now(), speech).await?;
        self.accept_transcript(transcript);
        Ok(())
    }

    fn accept_transcript(&mut self, transcript: Option<String>) {
        let Some(text) = transcript else { return };
        if text.trim().is_empty() {
            return;
        }
        if !self.composer.is_empty() && !self.composer.ends_with(' ') {
            self.composer.push(' ');
        }
        self.composer.push_str(text.trim());
        self.event_bus.emit(ChatEvent::TranscriptReady {
            text: text.trim().to_string(),
        });
    }
}

fn str_field(resp: &HttpResponse, field: &str) -> Option<String> {
    resp.body
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}
