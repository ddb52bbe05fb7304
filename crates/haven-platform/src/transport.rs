//! In-process mock backend implementing the transport port.
//!
//! Route shapes, status codes, and reply texts follow the demo server
//! the client was built against: token-gated conversation reads,
//! guest-friendly sends, a canned opening greeting, and a crisis-keyword
//! scan that short-circuits the assistant reply. Deterministic by
//! construction, so the session manager behaves identically in tests
//! and in the demo wiring.

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use haven_core::ports::{HttpResponse, Method, TransportPort};
use haven_types::conversation::ConversationSummary;
use haven_types::message::{DeliveryStatus, Message};
use haven_types::{ChatError, Result};
use serde_json::{json, Value};
use uuid::Uuid;

const GREETING: &str = "Hello, I'm here to provide a space where you can explore \
your thoughts and feelings. What brings you here today?";

const CRISIS_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "harm myself",
];

const CRISIS_RESPONSE: &str = "I'm deeply concerned about what you're sharing. \
Your life matters, and it's important you speak with someone immediately who can \
provide proper support. Please contact the National Suicide Prevention Lifeline \
at 988, text HOME to 741741 to reach the Crisis Text Line, or go to your nearest \
emergency room.";

const REPLIES: &[&str] = &[
    "Thank you for sharing that with me. How does it feel to say it out loud?",
    "I hear you. What do you think is underneath that feeling?",
    "That sounds like a lot to carry. What would help you most right now?",
    "Tell me more about when you first noticed this.",
];

struct Account {
    password: String,
    user_id: String,
    name: String,
}

struct MockState {
    accounts: HashMap<String, Account>,
    /// token -> account email
    tokens: HashMap<String, String>,
    summaries: Vec<ConversationSummary>,
    histories: HashMap<String, Vec<Message>>,
    next_token: u64,
    fail_next: u32,
}

pub struct MockTransport {
    state: RefCell<MockState>,
}

impl MockTransport {
    /// A backend seeded with the demo account
    /// (`user@example.com` / `password`).
    pub fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            "user@example.com".to_string(),
            Account {
                password: "password".to_string(),
                user_id: "1234567890".to_string(),
                name: "Demo User".to_string(),
            },
        );
        Self {
            state: RefCell::new(MockState {
                accounts,
                tokens: HashMap::new(),
                summaries: Vec::new(),
                histories: HashMap::new(),
                next_token: 1,
                fail_next: 0,
            }),
        }
    }

    /// Seed a conversation the list and history routes will serve.
    pub fn seed_conversation(&self, summary: ConversationSummary, history: Vec<Message>) {
        let mut st = self.state.borrow_mut();
        st.histories.insert(summary.id.clone(), history);
        st.summaries.push(summary);
        st.summaries.sort_by(ConversationSummary::list_ordering);
    }

    /// Invalidate every issued token; the next authed call sees a 401.
    pub fn revoke_tokens(&self) {
        self.state.borrow_mut().tokens.clear();
    }

    /// Make the next `n` requests fail at the transport level.
    pub fn fail_next(&self, n: u32) {
        self.state.borrow_mut().fail_next = n;
    }

    fn token_valid(st: &MockState, token: Option<&str>) -> bool {
        token.is_some_and(|t| st.tokens.contains_key(t))
    }

    fn unauthorized(token: Option<&str>) -> HttpResponse {
        let message = if token.is_some() {
            "Token expired!"
        } else {
            "Token is missing!"
        };
        HttpResponse::new(401, json!({ "message": message }))
    }

    fn login(&self, body: Option<Value>) -> HttpResponse {
        let body = body.unwrap_or(Value::Null);
        let email = body.get("email").and_then(Value::as_str).unwrap_or("");
        let password = body.get("password").and_then(Value::as_str).unwrap_or("");

        let mut st = self.state.borrow_mut();
        let Some(account) = st.accounts.get(email) else {
            return HttpResponse::new(401, json!({"message": "Invalid email or password"}));
        };
        if account.password != password {
            return HttpResponse::new(401, json!({"message": "Invalid email or password"}));
        }

        let (user_id, name) = (account.user_id.clone(), account.name.clone());
        let token = format!("mock_jwt_token_{}", st.next_token);
        st.next_token += 1;
        st.tokens.insert(token.clone(), email.to_string());

        HttpResponse::ok(json!({
            "message": "Login successful!",
            "token": token,
            "user_id": user_id,
            "name": name,
        }))
    }

    fn register(&self, body: Option<Value>) -> HttpResponse {
        let body = body.unwrap_or(Value::Null);
        let email = body.get("email").and_then(Value::as_str).unwrap_or("");
        let password = body.get("password").and_then(Value::as_str).unwrap_or("");
        let name = body.get("name").and_then(Value::as_str).unwrap_or("");

        if email.is_empty() || password.is_empty() {
            return HttpResponse::new(400, json!({"message": "Missing required fields!"}));
        }

        let mut st = self.state.borrow_mut();
        if st.accounts.contains_key(email) {
            return HttpResponse::new(409, json!({"message": "User already exists!"}));
        }
        st.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user_id: Uuid::new_v4().to_string(),
                name: name.to_string(),
            },
        );
        HttpResponse::new(
            201,
            json!({"message": "Registration successful! You can now log in."}),
        )
    }

    fn list_conversations(&self, query: &str, token: Option<&str>) -> HttpResponse {
        let st = self.state.borrow();
        if !Self::token_valid(&st, token) {
            return Self::unauthorized(token);
        }

        let page = query_param(query, "page").unwrap_or(1).max(1);
        let per_page = query_param(query, "per_page").unwrap_or(20).max(1);
        let start = (page - 1) * per_page;
        let slice: Vec<&ConversationSummary> = st
            .summaries
            .iter()
            .skip(start)
            .take(per_page)
            .collect();

        HttpResponse::ok(json!({ "conversations": slice }))
    }

    fn conversation_history(&self, id: &str, token: Option<&str>) -> HttpResponse {
        let st = self.state.borrow();
        if !Self::token_valid(&st, token) {
            return Self::unauthorized(token);
        }
        match st.histories.get(id) {
            Some(messages) => HttpResponse::ok(json!({ "messages": messages })),
            None => HttpResponse::new(404, json!({"message": "Conversation not found!"})),
        }
    }

    fn send(&self, token: Option<&str>, body: Option<Value>) -> HttpResponse {
        let body = body.unwrap_or(Value::Null);
        let text = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        if text.is_empty() {
            return HttpResponse::new(400, json!({"message": "No message provided!"}));
        }

        let mut st = self.state.borrow_mut();
        // A stored-but-revoked token means an expired session, even though
        // anonymous sends are allowed.
        if token.is_some() && !Self::token_valid(&st, token) {
            return Self::unauthorized(token);
        }

        let lowered = text.to_lowercase();
        let reply = if CRISIS_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            CRISIS_RESPONSE.to_string()
        } else {
            REPLIES[text.len() % REPLIES.len()].to_string()
        };

        // Persist under the client-minted conversation id, creating the
        // record on first sight like the original backend did.
        if let Some(conv_id) = body.get("conversation_id").and_then(Value::as_str) {
            let now = Utc::now();
            let history = st.histories.entry(conv_id.to_string()).or_default();
            let next = history.len();
            // Stored copies are already delivered, whatever the client's
            // local status was.
            let mut user_msg = Message::user(format!("srv-{}-{}", conv_id, next), text);
            user_msg.status = DeliveryStatus::Sent;
            history.push(user_msg);
            history.push(Message::assistant(
                format!("srv-{}-{}", conv_id, next + 1),
                reply.clone(),
            ));

            match st.summaries.iter_mut().find(|s| s.id == conv_id) {
                Some(summary) => {
                    summary.preview_text = text.to_string();
                    summary.last_updated = now;
                }
                None => st.summaries.push(ConversationSummary {
                    id: conv_id.to_string(),
                    title: truncate_title(text),
                    preview_text: text.to_string(),
                    last_updated: now,
                }),
            }
            st.summaries.sort_by(ConversationSummary::list_ordering);
        }

        HttpResponse::ok(json!({
            "message": "Message sent successfully!",
            "response": reply,
        }))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl TransportPort for MockTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        {
            let mut st = self.state.borrow_mut();
            if st.fail_next > 0 {
                st.fail_next -= 1;
                return Err(ChatError::Fetch("simulated network failure".to_string()));
            }
        }

        let (route, query) = match path.split_once('?') {
            Some((r, q)) => (r, q),
            None => (path, ""),
        };
        // Routes are mounted under the client's `/api` base.
        let route = route.strip_prefix("/api").unwrap_or(route);
        log::debug!("mock transport: {} {}", method.as_str(), route);

        let resp = match (method, route) {
            (Method::Post, "/auth/login") => self.login(body),
            (Method::Post, "/auth/register") => self.register(body),
            (Method::Post, "/auth/logout") => {
                HttpResponse::ok(json!({"message": "Logged out"}))
            }
            (Method::Get, "/chat/initial") => HttpResponse::ok(json!({
                "message": "Initial message retrieved successfully!",
                "response": GREETING,
            })),
            (Method::Get, "/conversations") => self.list_conversations(query, token),
            (Method::Get, p) => match p
                .strip_prefix("/conversations/")
                .and_then(|rest| rest.strip_suffix("/messages"))
            {
                Some(id) => self.conversation_history(id, token),
                None => HttpResponse::new(404, json!({"message": "Not found"})),
            },
            (Method::Post, "/chat/send") => self.send(token, body),
            _ => HttpResponse::new(404, json!({"message": "Not found"})),
        };
        Ok(resp)
    }
}

fn query_param(query: &str, name: &str) -> Option<usize> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
}

fn truncate_title(text: &str) -> String {
    const MAX: usize = 32;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{}…", head.trim_end())
    }
}
