//! Server response envelopes and normalized request outcomes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Status the server uses to flag an application-level failure.
const FAILURE_STATUS: &str = "error";

/// The server's structured JSON response.
///
/// The envelope is the only authority for post-call side effects; the core
/// never synthesizes one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: Content,
}

/// Directives carried in `content`.
///
/// A directive of the wrong type reads as absent: `"reload": 1` does not
/// reload and does not make the envelope unreadable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reload: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
    /// Anything else the server put in the content bag.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Redirect directive: either a flag or a target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Redirect {
    Flag(bool),
    Url(String),
}

impl Redirect {
    /// The target URL, if the directive names one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url(url) if !url.is_empty() => Some(url),
            _ => None,
        }
    }
}

impl ResponseEnvelope {
    /// Create an envelope with a status and message.
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: Some(message.into()),
            content: Content::default(),
        }
    }

    /// Parse a JSON body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Whether the envelope status flags an application failure.
    pub fn is_failure(&self) -> bool {
        self.status.eq_ignore_ascii_case(FAILURE_STATUS)
    }

    pub fn is_silent(&self) -> bool {
        self.content.silent == Some(true)
    }

    pub fn wants_reload(&self) -> bool {
        self.content.reload == Some(true)
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.content.redirect.as_ref()?.url()
    }

    /// Non-empty user-facing message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_content<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Content, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(Content::default());
    }
    serde_json::from_value(value).map_err(serde::de::Error::custom)
}

/// The normalized result of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The server accepted the request.
    Success(ResponseEnvelope),
    /// Network failure, timeout, or an unusable response.
    TransportError { reason: String },
    /// The transport worked but the server reported a failure.
    ApplicationError {
        /// HTTP status, when the failure was signalled by it.
        http_status: Option<u16>,
        /// Parsed envelope, when the body carried one.
        envelope: Option<ResponseEnvelope>,
        detail: String,
    },
}

impl Outcome {
    /// Classify an envelope by its status field.
    pub fn from_envelope(envelope: ResponseEnvelope) -> Self {
        if envelope.is_failure() {
            let detail = envelope
                .message()
                .unwrap_or(envelope.status.as_str())
                .to_string();
            return Self::ApplicationError {
                http_status: None,
                envelope: Some(envelope),
                detail,
            };
        }
        Self::Success(envelope)
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::TransportError {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure detail, for error outcomes.
    pub fn error_detail(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::TransportError { reason } => Some(reason),
            Self::ApplicationError { detail, .. } => Some(detail),
        }
    }

    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            Self::Success(envelope) => Some(envelope),
            Self::ApplicationError { envelope, .. } => envelope.as_ref(),
            Self::TransportError { .. } => None,
        }
    }
}
