//! Toolkit configuration.
//!
//! The host page hands the toolkit one configuration object at startup. It is
//! accepted as JSON (camelCase keys, as injected by the page) or TOML
//! (snake_case keys, as used by the CLI). Numeric fields are lenient: a
//! timeout of `"30"` and `30` mean the same thing.

use crate::field::parse_int_prefix;
use crate::{ElementSnapshot, FormatHint, Namespace, Payload, TransportKind, detect_changed};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upper bound for uploaded files.
const DEFAULT_UPLOAD_LIMIT: u64 = 1024 * 1024;

/// Path segment between the namespace and the endpoint in Rest URLs.
const REST_VERSION: &str = "v1";

/// Toolkit configuration, fixed for the lifetime of a session.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "root_path", alias = "baseUrl")]
    pub base_url: String,
    /// URL of the shared Legacy endpoint.
    #[serde(default = "root_path", alias = "ajaxUrl")]
    pub ajax_url: String,
    /// Root of the Rest API.
    #[serde(default = "root_path", alias = "restUrl")]
    pub rest_url: String,
    pub namespace: Namespace,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Request timeout. Given in seconds; zero disables it.
    #[serde(
        default,
        alias = "timeoutSeconds",
        alias = "timeout_seconds",
        deserialize_with = "seconds"
    )]
    pub timeout: Duration,
    /// Send ambiguous requests over Rest instead of Legacy.
    #[serde(default, deserialize_with = "flag")]
    pub restful: bool,
    #[serde(default)]
    pub strings: StringTable,
    #[serde(default)]
    pub urls: StringTable,
    #[serde(default)]
    pub inputs: InputSchema,
    #[serde(default)]
    pub hooks: HookBaselines,
    /// Largest accepted upload, in bytes.
    #[serde(default = "default_upload_limit", alias = "uploadLimit")]
    pub upload_limit: u64,
    /// Rest endpoint used when none can be resolved.
    #[serde(default = "default_endpoint", alias = "defaultEndpoint")]
    pub default_endpoint: String,
    /// Header carrying the Rest token. Bearer `Authorization` when unset.
    #[serde(default, alias = "restTokenHeader")]
    pub rest_token_header: Option<String>,
}

fn root_path() -> String {
    "/".to_string()
}

fn default_upload_limit() -> u64 {
    DEFAULT_UPLOAD_LIMIT
}

fn default_endpoint() -> String {
    "default".to_string()
}

impl Config {
    /// Minimal configuration for a namespace, everything else defaulted.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            base_url: root_path(),
            ajax_url: root_path(),
            rest_url: root_path(),
            namespace: Namespace::new(namespace),
            name: None,
            language: None,
            timeout: Duration::ZERO,
            restful: false,
            strings: StringTable::default(),
            urls: StringTable::default(),
            inputs: InputSchema::default(),
            hooks: HookBaselines::default(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            default_endpoint: default_endpoint(),
            rest_token_header: None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()
    }

    /// Load from a file; `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.namespace.as_str().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        Ok(self)
    }

    /// Transport used by call sites that do not pick one.
    pub fn transport_kind(&self) -> TransportKind {
        if self.restful {
            TransportKind::Rest
        } else {
            TransportKind::Legacy
        }
    }

    /// Timeout for a request, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        Some(self.timeout).filter(|t| !t.is_zero())
    }

    /// Full URL of a Rest endpoint.
    pub fn rest_endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}/{REST_VERSION}/{endpoint}", self.rest_url, self.namespace)
    }
}

/// Nested table of user-facing strings or URLs, addressed by dotted paths.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StringTable(Value);

impl StringTable {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a string by dotted path (`global.error`).
    pub fn get(&self, path: &str) -> Option<&str> {
        path.split('.')
            .try_fold(&self.0, |node, key| node.get(key))?
            .as_str()
    }

    /// Look up a string, falling back to `fallback` when it is missing.
    pub fn text_or<'a>(&'a self, path: &str, fallback: &'a str) -> &'a str {
        self.get(path).unwrap_or(fallback)
    }
}

/// Declared controls per input group (`settings`, `advanced`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct InputSchema(BTreeMap<String, InputGroup>);

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct InputGroup {
    #[serde(default)]
    values: BTreeMap<String, FieldSpec>,
}

/// Declaration of one input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldSpec {
    /// Control selector kind (`input`, `select`, `textarea`).
    #[serde(default, rename = "type")]
    pub control: Option<String>,
    #[serde(default)]
    pub format: Option<FormatHint>,
}

impl InputSchema {
    /// Declared inputs of a group, in name order.
    pub fn group(&self, group: &str) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.0
            .get(group)
            .into_iter()
            .flat_map(|g| g.values.iter().map(|(name, spec)| (name.as_str(), spec)))
    }

    /// Read every declared input of `group` from a form.
    ///
    /// Inputs missing from the form are coerced from an absent value, so the
    /// server always receives the full group.
    pub fn collect(&self, group: &str, form: &ElementSnapshot) -> Payload {
        let mut payload = Payload::new();
        for (name, spec) in self.group(group) {
            let value = match form.field(name) {
                Some(field) => field.typed(spec.format),
                None => Some(spec.format.unwrap_or_default().coerce(None, false)),
            };
            if let Some(value) = value {
                payload.insert(name, value);
            }
        }
        payload
    }

    pub fn insert(&mut self, group: &str, name: impl Into<String>, spec: FieldSpec) {
        self.0
            .entry(group.to_string())
            .or_default()
            .values
            .insert(name.into(), spec);
    }
}

/// Last-saved values of hook fields per group, used as the baseline for
/// partial updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct HookBaselines(BTreeMap<String, BTreeMap<String, Value>>);

impl HookBaselines {
    /// Field names tracked in a group.
    pub fn keys(&self, group: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(group)
            .into_iter()
            .flat_map(|g| g.keys().map(String::as_str))
    }

    /// Baseline of a field in string form. Absent and null baselines are
    /// the empty string.
    pub fn baseline(&self, group: &str, key: &str) -> String {
        match self.0.get(group).and_then(|g| g.get(key)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Fields of `group` whose current value in `form` differs from the
    /// baseline. Missing fields and buttons are skipped.
    pub fn changes(&self, group: &str, form: &ElementSnapshot) -> Payload {
        let mut payload = Payload::new();
        for key in self.keys(group) {
            let Some(value) = form.field(key).and_then(|f| f.typed(None)) else {
                continue;
            };
            if detect_changed(&value, &self.baseline(group, key)) {
                payload.insert(key, value);
            }
        }
        payload
    }

    /// Record a newly saved value.
    pub fn record(&mut self, group: &str, key: impl Into<String>, value: impl Into<String>) {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(key.into(), Value::String(value.into()));
    }
}

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("namespace cannot be empty")]
    EmptyNamespace,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Loose {
    /// Integer reading, truncating fractions and numeric-prefixed strings.
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(_) => None,
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Self::Float(_) => None,
            Self::Str(s) => parse_int_prefix(s),
        }
    }
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = Loose::deserialize(deserializer)?;
    let secs = raw.as_int().unwrap_or(0).max(0);
    Ok(Duration::from_secs(secs.unsigned_abs()))
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Loose::deserialize(deserializer)?;
    Ok(match raw {
        Loose::Bool(b) => b,
        other => other.as_int() == Some(1),
    })
}
