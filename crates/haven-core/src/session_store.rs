//! Persisted session state over the key-value storage port.
//!
//! Reads fail soft: any missing key, storage error, or unparseable
//! record yields a logged-out session instead of an error. Writes are
//! both-or-nothing: the user profile lands first and the token last, so
//! the token acts as the commit marker — a crash between the two writes
//! leaves a record that `load` treats as "no session".

use haven_types::session::Session;
use haven_types::theme::ThemePreference;
use haven_types::Result;

use crate::ports::StoragePort;

pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_USER_PROFILE: &str = "userProfile";
pub const KEY_THEME: &str = "themePreference";

/// Restore the persisted session. Never fails; corruption means logged out.
pub async fn load(storage: &dyn StoragePort) -> Session {
    let token = match storage.get(KEY_AUTH_TOKEN).await {
        Ok(Some(t)) => t,
        Ok(None) => return Session::logged_out(),
        Err(e) => {
            log::warn!("session load: token read failed: {}", e);
            return Session::logged_out();
        }
    };

    let profile = match storage.get(KEY_USER_PROFILE).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            // Token without a profile is a torn write; discard it.
            log::warn!("session load: token present but profile missing");
            return Session::logged_out();
        }
        Err(e) => {
            log::warn!("session load: profile read failed: {}", e);
            return Session::logged_out();
        }
    };

    match serde_json::from_str(&profile) {
        Ok(user) => Session::authenticated(user, token),
        Err(e) => {
            log::warn!("session load: profile unparseable: {}", e);
            Session::logged_out()
        }
    }
}

/// Persist the session. Saving a logged-out session clears the store.
pub async fn save(storage: &dyn StoragePort, session: &Session) -> Result<()> {
    let (Some(user), Some(token)) = (session.user(), session.token()) else {
        return clear(storage).await;
    };

    let profile = serde_json::to_string(user)?;
    // Profile first, token last: load requires both, so a failure in
    // between is indistinguishable from "never saved".
    storage.set(KEY_USER_PROFILE, &profile).await?;
    storage.set(KEY_AUTH_TOKEN, token).await?;
    log::debug!("session saved to {}", storage.backend_name());
    Ok(())
}

/// Remove all persisted session data. Idempotent.
pub async fn clear(storage: &dyn StoragePort) -> Result<()> {
    // Token first so a partial clear still reads as logged out.
    storage.remove(KEY_AUTH_TOKEN).await?;
    storage.remove(KEY_USER_PROFILE).await?;
    Ok(())
}

/// Restore the theme preference, defaulting to `System` on any problem.
pub async fn load_theme(storage: &dyn StoragePort) -> ThemePreference {
    match storage.get(KEY_THEME).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("theme preference unparseable: {}", e);
            ThemePreference::default()
        }),
        Ok(None) => ThemePreference::default(),
        Err(e) => {
            log::warn!("theme preference read failed: {}", e);
            ThemePreference::default()
        }
    }
}

pub async fn save_theme(storage: &dyn StoragePort, theme: ThemePreference) -> Result<()> {
    let raw = serde_json::to_string(&theme)?;
    storage.set(KEY_THEME, &raw).await
}
