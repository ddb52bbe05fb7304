use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a conversation for listing. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub preview_text: String,
    pub last_updated: DateTime<Utc>,
}

impl ConversationSummary {
    /// List order: most recently updated first, ties broken by id ascending
    /// so pagination is stable across refetches.
    pub fn list_ordering(a: &Self, b: &Self) -> Ordering {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.id.cmp(&b.id))
    }
}
