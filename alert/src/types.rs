use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ThreadRef identifies the chat thread an alert was posted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub channel_id: String,
    pub thread_ts: String,
}

/// Alert is a security alert as seen by the similarity engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier.
    pub id: String,

    /// Short human-readable title.
    #[serde(default)]
    pub title: String,

    pub created_at: DateTime<Utc>,

    /// Semantic embedding. Empty until the embedding model has run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,

    /// Ticket the alert is bound to. `None` means unbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,

    /// Chat thread the alert was posted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadRef>,

    /// Opaque payload. Only used for keyword filtering.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Alert {
    /// Create an unbound alert with an empty payload.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            created_at,
            embedding,
            ticket_id: None,
            thread: None,
            data: serde_json::Value::Null,
        }
    }

    /// Returns true if the alert is not bound to a ticket.
    pub fn is_unbound(&self) -> bool {
        self.ticket_id.as_deref().is_none_or(str::is_empty)
    }

    /// Returns true if the alert carries a usable embedding.
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    /// Compact JSON rendering of the payload. Null payloads render empty.
    pub fn data_text(&self) -> String {
        match &self.data {
            serde_json::Value::Null => String::new(),
            v => v.to_string(),
        }
    }

    /// Case-insensitive substring match over the serialized payload.
    /// An empty payload never matches a non-empty keyword.
    pub fn data_contains(&self, keyword: &str) -> bool {
        if keyword.is_empty() {
            return true;
        }
        let text = self.data_text();
        if text.is_empty() {
            return false;
        }
        text.to_lowercase().contains(&keyword.to_lowercase())
    }
}

/// Sort alerts by ascending creation time, then id.
///
/// Repositories do not promise a fetch order; callers that break ties by
/// position sort first so results are reproducible.
pub fn sort_stable(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
