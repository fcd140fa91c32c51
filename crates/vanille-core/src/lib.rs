//! Core types for Vanille.
//!
//! This crate holds the pieces of the request dispatch layer that need no I/O:
//! namespacing, typed field values, trigger element snapshots, parameter
//! resolution, server envelopes and configuration. Transports and side effects
//! live in `vanille-client`; the expiring cache lives in `vanille-cache`.

mod config;
mod element;
mod envelope;
mod field;
mod namespace;
mod payload;
mod resolve;
pub mod text;

pub use config::{Config, ConfigError, FieldSpec, HookBaselines, InputSchema, StringTable};
pub use element::{ControlTag, ElementId, ElementKind, ElementSnapshot, FieldSnapshot, FileBlob};
pub use envelope::{Content, Outcome, Redirect, ResponseEnvelope};
pub use field::{FieldParseError, FormatHint, TypedValue, detect_changed};
pub use namespace::Namespace;
pub use payload::{Payload, PayloadValue};
pub use resolve::{ExplicitParams, ResolvedParams, resolve};

use serde::{Deserialize, Serialize};

/// Which of the two server conventions a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// One shared URL, disambiguated by an `action` field in a form body.
    Legacy,
    /// One URL per endpoint, JSON bodies, token carried in a header.
    Rest,
}

/// HTTP method for Rest requests. Legacy requests always POST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// A fully resolved request, built fresh for every dispatch.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Namespaced action name. Required by Legacy transport, unused by Rest.
    pub action: Option<String>,
    /// Security token, if one was resolved.
    pub token: Option<String>,
    /// Rest endpoint name.
    pub endpoint: String,
    pub payload: Payload,
    pub files: Vec<FileBlob>,
    pub kind: TransportKind,
    pub method: Method,
    /// Extra headers, applied after the defaults (Rest only).
    pub headers: Vec<(String, String)>,
}
