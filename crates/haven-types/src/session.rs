use serde::{Deserialize, Serialize};

/// The authenticated account, as returned by the backend on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

/// The identity attached to this app instance.
///
/// Token and user travel together: the only ways to build a `Session` are
/// [`Session::logged_out`] and [`Session::authenticated`], so a token
/// without a user (or the reverse) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user: Option<User>,
    auth_token: Option<String>,
}

impl Session {
    pub fn logged_out() -> Self {
        Self {
            user: None,
            auth_token: None,
        }
    }

    pub fn authenticated(user: User, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            auth_token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::logged_out()
    }
}
