use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Conversations fetched per page
    pub page_size: usize,
    /// Fail-safe stop for a recording left running
    #[serde(with = "duration_millis")]
    pub recording_timeout: Duration,
    /// Base URL prefixed to every transport path
    pub api_base: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            recording_timeout: Duration::from_secs(30),
            api_base: "/api".to_string(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
