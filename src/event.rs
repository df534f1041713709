// src/event.rs
// Lifecycle event records from the host server's event stream

use serde::Deserialize;

use crate::error::Result;

/// Event kind emitted when a session becomes inactive
pub const SESSION_IDLE: &str = "session.idle";

/// One record from the host's event stream.
///
/// The host attaches more fields per event kind; only the discriminant
/// and the session id are decoded here, everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: EventProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventProperties {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

impl ServerEvent {
    /// Decode a raw SSE data payload into an event record
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}
