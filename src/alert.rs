use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert record an activation handler hands to the persistence backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub id: String,
    pub session_id: String,
    pub raised_at: DateTime<Utc>,
    /// Evidence data URI, empty when capture degraded
    pub payload: String,
    pub payload_bytes: usize,
    pub degraded: bool,
}

impl ActivationRecord {
    pub fn new(session_id: impl Into<String>, payload: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            raised_at: Utc::now(),
            payload_bytes: payload.len(),
            degraded: payload.is_empty(),
            payload,
        }
    }

    /// Container format named in the data URI prefix, if any
    pub fn mime_type(&self) -> Option<&str> {
        self.payload
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
    }
}
