//! API request and response types

use serde::{Deserialize, Serialize};

/// A chat message from a participant: a `/command` or a reply to a prompt
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response for a queued message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub queued: bool,
}

/// Response for cancel action
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Recent-records summary, as `/view_records` renders it
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub roster: Vec<String>,
}

/// Payload of a `reply` stream event; `menu` is rows of option labels or null
#[derive(Debug, Serialize)]
pub struct ReplyPayload<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub menu: Option<&'a [Vec<String>]>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
