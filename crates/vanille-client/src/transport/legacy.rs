use super::{Transport, absolute_url, describe, status_text};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use vanille_core::{Config, FileBlob, Outcome, RequestDescriptor, ResponseEnvelope};

/// Form posts to the site's single ajax URL.
///
/// Every request is a POST regardless of the descriptor's method. The body
/// carries the namespaced `action` and the `nonce` alongside the payload.
/// Failures at the HTTP level, including non-2xx statuses and bodies that are
/// not an envelope, are transport errors; a delivered envelope whose status
/// is `error` is an application error.
#[derive(Debug, Clone)]
pub struct LegacyTransport {
    client: reqwest::Client,
    url: String,
}

impl LegacyTransport {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: absolute_url(&config.base_url, &config.ajax_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn body_fields(request: &RequestDescriptor) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = request
        .payload
        .form_pairs()
        .into_iter()
        .filter(|(name, _)| name != "action" && name != "nonce")
        .collect();
    if let Some(action) = &request.action {
        fields.push(("action".to_string(), action.clone()));
    }
    if let Some(token) = &request.token {
        fields.push(("nonce".to_string(), token.clone()));
    }
    fields
}

fn file_part(file: &FileBlob) -> Part {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    match &file.mime {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|e| {
            tracing::warn!(file = %file.name, %mime, error = %e, "ignoring invalid mime type");
            part()
        }),
        None => part(),
    }
}

/// Files go first under their index, then the text fields.
fn multipart_body(files: &[FileBlob], fields: Vec<(String, String)>) -> Form {
    let form = files
        .iter()
        .enumerate()
        .fold(Form::new(), |form, (index, file)| form.part(index.to_string(), file_part(file)));
    fields
        .into_iter()
        .fold(form, |form, (name, value)| form.text(name, value))
}

#[async_trait]
impl Transport for LegacyTransport {
    async fn send(&self, request: &RequestDescriptor, timeout: Option<Duration>) -> Outcome {
        let fields = body_fields(request);
        tracing::debug!(
            url = %self.url,
            action = ?request.action,
            files = request.files.len(),
            "legacy request"
        );

        let mut builder = self.client.post(&self.url);
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }
        builder = if request.files.is_empty() {
            builder.form(&fields)
        } else {
            builder.multipart(multipart_body(&request.files, fields))
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::transport(describe(&e)),
        };
        let status = response.status();
        if !status.is_success() {
            return Outcome::transport(status_text(status));
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Outcome::transport(describe(&e)),
        };
        match ResponseEnvelope::from_slice(&body) {
            Ok(envelope) => Outcome::from_envelope(envelope),
            Err(e) => Outcome::transport(format!("invalid response body: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, serve};
    use axum::extract::{Form as AxumForm, Multipart};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use vanille_core::{Payload, TransportKind, TypedValue};

    const AJAX: &str = "/wp-admin/admin-ajax.php";

    async fn echo(AxumForm(fields): AxumForm<HashMap<String, String>>) -> Json<Value> {
        Json(json!({"status": "success", "message": "ok", "content": {"fields": fields}}))
    }

    async fn parts(mut multipart: Multipart) -> Json<Value> {
        let mut parts = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file = field.file_name().map(str::to_string);
            let body = field.text().await.unwrap();
            parts.push(json!({"name": name, "file": file, "body": body}));
        }
        Json(json!({"status": "success", "content": {"parts": parts}}))
    }

    async fn transport(router: Router) -> LegacyTransport {
        let base = serve(router).await;
        let mut config = Config::new("acme");
        config.base_url = format!("{base}/");
        config.ajax_url = AJAX.to_string();
        LegacyTransport::new(reqwest::Client::new(), &config)
    }

    fn request(payload: Payload) -> RequestDescriptor {
        let mut request = descriptor(TransportKind::Legacy, payload);
        request.action = Some("acme-save".to_string());
        request.token = Some("n0nce".to_string());
        request
    }

    #[tokio::test]
    async fn posts_form_with_action_and_nonce() {
        let legacy = transport(Router::new().route(AJAX, post(echo))).await;
        let payload = Payload::new()
            .with("limit", TypedValue::Int(Some(5)))
            .with("action", "ignored");

        let outcome = legacy.send(&request(payload), None).await;
        let Outcome::Success(envelope) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        let fields = &envelope.content.extra["fields"];
        assert_eq!(fields["action"], "acme-save");
        assert_eq!(fields["nonce"], "n0nce");
        assert_eq!(fields["limit"], "int|5");
    }

    #[tokio::test]
    async fn error_status_in_ok_response_is_application_error() {
        let router = Router::new().route(
            AJAX,
            post(|| async { Json(json!({"status": "error", "message": "Bad nonce"})) }),
        );
        let legacy = transport(router).await;

        match legacy.send(&request(Payload::new()), None).await {
            Outcome::ApplicationError {
                http_status,
                envelope,
                detail,
            } => {
                assert_eq!(http_status, None);
                assert_eq!(detail, "Bad nonce");
                assert_eq!(envelope.unwrap().status, "error");
            }
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let router = Router::new().route(
            AJAX,
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": "success", "message": "fine"})),
                )
            }),
        );
        let legacy = transport(router).await;

        let outcome = legacy.send(&request(Payload::new()), None).await;
        assert_eq!(outcome, Outcome::transport("500 Internal Server Error"));
    }

    #[tokio::test]
    async fn undecodable_body_is_transport_error() {
        let router = Router::new().route(AJAX, post(|| async { "0" }));
        let legacy = transport(router).await;

        let outcome = legacy.send(&request(Payload::new()), None).await;
        assert!(matches!(outcome, Outcome::TransportError { .. }), "{outcome:?}");
    }

    #[tokio::test]
    async fn files_switch_to_multipart() {
        let legacy = transport(Router::new().route(AJAX, post(parts))).await;
        let mut request = request(Payload::new().with("slug", "theme"));
        request.files = vec![
            FileBlob::new("a.zip", b"first".to_vec()).with_mime("application/zip"),
            FileBlob::new("b.zip", b"second".to_vec()),
        ];

        let outcome = legacy.send(&request, None).await;
        let parts = outcome.envelope().unwrap().content.extra["parts"].clone();
        let names: Vec<&str> = parts
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["0", "1", "slug", "action", "nonce"]);
        assert_eq!(parts[0]["file"], "a.zip");
        assert_eq!(parts[1]["body"], "second");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let mut config = Config::new("acme");
        config.ajax_url = "http://127.0.0.1:9/ajax".to_string();
        let legacy = LegacyTransport::new(reqwest::Client::new(), &config);

        let outcome = legacy
            .send(&request(Payload::new()), Some(Duration::from_secs(2)))
            .await;
        assert!(matches!(outcome, Outcome::TransportError { .. }), "{outcome:?}");
    }
}
