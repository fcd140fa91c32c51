use crate::dom::{Dom, LOADING_CLASS};
use crate::error::DispatchError;
use crate::loading::LoadingGuard;
use crate::navigate::{Navigator, RELOAD_DELAY};
use crate::notify::{ERROR_TIMEOUT, NOTICE_TIMEOUT, Notifier, NotifyKind, Toast};
use crate::session::Session;
use crate::transport::{self, LegacyTransport, RestTransport, Transport};
use crate::upload::UploadGuard;
use crate::SetupError;
use std::sync::Arc;
use std::time::Duration;
use vanille_core::{
    Config, ElementSnapshot, ExplicitParams, FileBlob, Method, Outcome, Payload, RequestDescriptor,
    ResponseEnvelope, TransportKind, resolve,
};

type SuccessHook = Box<dyn FnOnce(&ResponseEnvelope) + Send>;
type ErrorHook = Box<dyn FnOnce(&str) + Send>;
type CompleteHook = Box<dyn FnOnce() + Send>;

/// Callbacks run around a dispatch.
#[derive(Default)]
pub struct Hooks {
    pub on_success: Option<SuccessHook>,
    /// Receives the failure detail.
    pub on_error: Option<ErrorHook>,
    /// Runs last on every path, before the loading marker is cleared.
    pub on_complete: Option<CompleteHook>,
}

/// Per-call options.
pub struct DispatchArgs {
    pub action: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
    pub data: Payload,
    pub files: Vec<FileBlob>,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Suppress notifications.
    pub silent: bool,
    /// Check and set the loading marker. On by default.
    pub loading: bool,
    /// Overrides the configured timeout. Zero disables it.
    pub timeout: Option<Duration>,
    /// Overrides the configured transport.
    pub transport: Option<TransportKind>,
    pub hooks: Hooks,
}

impl Default for DispatchArgs {
    fn default() -> Self {
        Self {
            action: None,
            token: None,
            endpoint: None,
            data: Payload::new(),
            files: Vec::new(),
            method: Method::Post,
            headers: Vec::new(),
            silent: false,
            loading: true,
            timeout: None,
            transport: None,
            hooks: Hooks::default(),
        }
    }
}

impl DispatchArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    pub fn files(mut self, files: Vec<FileBlob>) -> Self {
        self.files = files;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn without_loading(mut self) -> Self {
        self.loading = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.transport = Some(kind);
        self
    }

    pub fn on_success(mut self, hook: impl FnOnce(&ResponseEnvelope) + Send + 'static) -> Self {
        self.hooks.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl FnOnce(&str) + Send + 'static) -> Self {
        self.hooks.on_error = Some(Box::new(hook));
        self
    }

    pub fn on_complete(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_complete = Some(Box::new(hook));
        self
    }
}

/// The page surfaces a dispatcher acts on.
#[derive(Clone)]
pub struct Surfaces {
    pub dom: Arc<dyn Dom>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

/// Sends actions and applies their side effects.
pub struct Dispatcher {
    config: Arc<Config>,
    session: Arc<Session>,
    surfaces: Surfaces,
    legacy: Arc<dyn Transport>,
    rest: Arc<dyn Transport>,
}

impl Dispatcher {
    /// A dispatcher with HTTP transports for both conventions.
    pub fn new(
        config: Arc<Config>,
        session: Arc<Session>,
        surfaces: Surfaces,
    ) -> Result<Self, SetupError> {
        let client = transport::http_client()?;
        let legacy = Arc::new(LegacyTransport::new(client.clone(), &config));
        let rest = Arc::new(RestTransport::new(client, config.clone()));
        Ok(Self::with_transports(config, session, surfaces, legacy, rest))
    }

    pub fn with_transports(
        config: Arc<Config>,
        session: Arc<Session>,
        surfaces: Surfaces,
        legacy: Arc<dyn Transport>,
        rest: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            session,
            surfaces,
            legacy,
            rest,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    /// Size check for uploads, reporting through this dispatcher's surfaces.
    pub fn upload_guard(&self) -> UploadGuard {
        let message = self.config.strings.text_or("upload.size", "File is too large");
        UploadGuard::new(
            self.config.upload_limit,
            message,
            self.surfaces.dom.clone(),
            self.surfaces.notifier.clone(),
        )
    }

    /// Whether `element` has a request in flight.
    pub fn is_loading(&self, element: &ElementSnapshot) -> bool {
        self.surfaces
            .dom
            .has_class(element.loading_target(), LOADING_CLASS)
    }

    fn transport(&self, kind: TransportKind) -> &dyn Transport {
        match kind {
            TransportKind::Legacy => self.legacy.as_ref(),
            TransportKind::Rest => self.rest.as_ref(),
        }
    }

    /// Send the action triggered by `element`.
    ///
    /// Returns [`DispatchError::InFlight`] without doing anything when the
    /// element is already loading. Otherwise the returned [`Outcome`] has
    /// already been applied: hooks run, notifications shown, navigation
    /// requested. Attached files over the upload limit fail with
    /// [`DispatchError::Validation`] before anything is sent. The completion
    /// hook and the loading marker are released on every path, including when
    /// the returned future is dropped early.
    pub async fn dispatch(
        &self,
        element: &ElementSnapshot,
        args: DispatchArgs,
    ) -> Result<Outcome, DispatchError> {
        let DispatchArgs {
            action,
            token,
            endpoint,
            data,
            files,
            method,
            headers,
            silent,
            loading,
            timeout,
            transport,
            hooks,
        } = args;
        let Hooks {
            on_success,
            on_error,
            on_complete,
        } = hooks;

        let target = element.loading_target().clone();
        let mut guard = if loading {
            match LoadingGuard::acquire(self.surfaces.dom.clone(), target.clone()) {
                Some(guard) => guard,
                None => {
                    tracing::debug!(
                        element = %target,
                        "request already in flight, dropping dispatch"
                    );
                    return Err(DispatchError::InFlight(target));
                }
            }
        } else {
            LoadingGuard::unmarked()
        };
        guard.set_on_complete(on_complete);
        self.upload_guard().check_all(&files)?;

        let kind = transport.unwrap_or_else(|| self.config.transport_kind());
        let explicit = ExplicitParams {
            action: data.scalar("action").or(action),
            token: data.scalar("nonce").or(token),
            endpoint,
        };
        let params = resolve(element, &explicit, kind);
        let action = params
            .action
            .map(|a| self.config.namespace.apply(Some(&a)));
        if kind == TransportKind::Legacy && action.is_none() {
            tracing::warn!(element = %element.id, "no action to dispatch");
            return Err(DispatchError::MissingAction(element.id.clone()));
        }

        let request = RequestDescriptor {
            action,
            token: params.token,
            endpoint: params
                .endpoint
                .unwrap_or_else(|| self.config.default_endpoint.clone()),
            payload: data,
            files,
            kind,
            method,
            headers,
        };
        let timeout = match timeout {
            Some(t) => Some(t).filter(|t| !t.is_zero()),
            None => self.config.request_timeout(),
        };

        tracing::debug!(
            element = %element.id,
            action = ?request.action,
            endpoint = %request.endpoint,
            ?kind,
            "dispatching"
        );
        let outcome = self.transport(kind).send(&request, timeout).await;
        tracing::debug!(element = %element.id, success = outcome.is_success(), "dispatch finished");

        self.apply(&outcome, silent, on_success, on_error);
        Ok(outcome)
    }

    fn apply(
        &self,
        outcome: &Outcome,
        silent: bool,
        on_success: Option<SuccessHook>,
        on_error: Option<ErrorHook>,
    ) {
        match outcome {
            Outcome::Success(envelope) => {
                if let Some(hook) = on_success {
                    hook(envelope);
                }
                if !silent && !envelope.is_silent() {
                    if let Some(message) = envelope.message() {
                        let kind = NotifyKind::from_status(&envelope.status);
                        self.surfaces
                            .notifier
                            .show(Toast::new(message, kind, NOTICE_TIMEOUT));
                    }
                }
                if envelope.wants_reload() || self.session.is_reloading() {
                    self.surfaces.navigator.reload(RELOAD_DELAY);
                }
                if let Some(url) = envelope.redirect_url() {
                    self.surfaces.navigator.redirect(url);
                }
            }
            Outcome::TransportError { .. } | Outcome::ApplicationError { .. } => {
                let detail = outcome.error_detail().unwrap_or_default();
                tracing::debug!(detail, "request failed");
                if let Some(hook) = on_error {
                    hook(detail);
                }
                if !silent {
                    let message = self.config.strings.text_or("global.error", "Request failed");
                    let toast = Toast::new(message, NotifyKind::Error, ERROR_TIMEOUT);
                    self.surfaces.notifier.show(toast.with_detail(detail));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;
    use crate::testing::{Harness, Navigation, ScriptedTransport};
    use serde_json::json;
    use std::panic::AssertUnwindSafe;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use vanille_core::{FieldSnapshot, StringTable, TypedValue};

    fn config() -> Config {
        let mut config = Config::new("acme");
        config.timeout = Duration::from_secs(30);
        config.strings = StringTable::new(json!({"global": {"error": "Something went wrong"}}));
        config
    }

    fn envelope(body: serde_json::Value) -> ResponseEnvelope {
        serde_json::from_value(body).unwrap()
    }

    fn success(message: &str) -> Outcome {
        Outcome::Success(ResponseEnvelope::new("success", message))
    }

    fn button() -> ElementSnapshot {
        ElementSnapshot::control("purge")
            .with_attr("data-action", "purge")
            .with_container_attr("data-nonce", "n0nce")
    }

    #[tokio::test]
    async fn second_dispatch_while_loading_is_dropped() {
        let harness = Harness::new(config(), ScriptedTransport::gated(success("Done")));
        let dispatcher = Arc::new(harness.dispatcher());
        let element = button();

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let element = element.clone();
            async move { dispatcher.dispatch(&element, DispatchArgs::new()).await }
        });
        harness.transport.wait_started().await;
        assert!(dispatcher.is_loading(&element));

        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let second = dispatcher
            .dispatch(
                &element,
                DispatchArgs::new().on_complete(move || flag.store(true, Ordering::SeqCst)),
            )
            .await;
        assert!(matches!(second, Err(DispatchError::InFlight(_))));
        assert!(!completed.load(Ordering::SeqCst));

        harness.transport.release();
        let first = first.await.unwrap().unwrap();
        assert!(first.is_success());
        assert_eq!(harness.transport.calls(), 1);
        assert!(!dispatcher.is_loading(&element));
    }

    #[tokio::test]
    async fn loading_cleared_on_every_outcome() {
        let outcomes = [
            success("Done"),
            Outcome::transport("timeout"),
            Outcome::from_envelope(ResponseEnvelope::new("error", "Bad nonce")),
        ];
        for outcome in outcomes {
            let harness = Harness::new(config(), ScriptedTransport::new(outcome));
            let dispatcher = harness.dispatcher();
            let completed = Arc::new(AtomicBool::new(false));
            let flag = completed.clone();

            dispatcher
                .dispatch(
                    &button(),
                    DispatchArgs::new().on_complete(move || flag.store(true, Ordering::SeqCst)),
                )
                .await
                .unwrap();

            assert!(!dispatcher.is_loading(&button()));
            assert!(completed.load(Ordering::SeqCst));
        }
    }

    #[tokio::test]
    async fn missing_action_still_completes() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();
        let element = ElementSnapshot::control("orphan");

        let result = dispatcher
            .dispatch(
                &element,
                DispatchArgs::new().on_complete(move || flag.store(true, Ordering::SeqCst)),
            )
            .await;

        assert!(matches!(result, Err(DispatchError::MissingAction(_))));
        assert!(completed.load(Ordering::SeqCst));
        assert!(!dispatcher.is_loading(&element));
        assert_eq!(harness.transport.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_files_are_never_sent() {
        let mut config = config();
        config.upload_limit = 8;
        let harness = Harness::new(config, ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let completed = Arc::new(AtomicBool::new(false));
        let flag = completed.clone();

        let result = dispatcher
            .dispatch(
                &button(),
                DispatchArgs::new()
                    .files(vec![FileBlob::new("big.lic", vec![0u8; 1000])])
                    .on_complete(move || flag.store(true, Ordering::SeqCst)),
            )
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::Validation(ValidationError::FileTooLarge {
                size: 1000,
                limit: 8,
                ..
            }))
        ));
        assert_eq!(harness.transport.calls(), 0);
        assert!(completed.load(Ordering::SeqCst));
        assert!(!dispatcher.is_loading(&button()));
        let toasts = harness.notifier.toasts();
        assert_eq!(toasts[0].message, "File is too large");
        assert_eq!(toasts[0].kind, NotifyKind::Warning);
    }

    #[tokio::test]
    async fn loading_cleared_when_success_hook_panics() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = Arc::new(harness.dispatcher());
        let element = button();

        let task = tokio::spawn({
            let dispatcher = dispatcher.clone();
            let element = element.clone();
            async move {
                dispatcher
                    .dispatch(&element, DispatchArgs::new().on_success(|_| panic!("hook failed")))
                    .await
            }
        });
        assert!(task.await.unwrap_err().is_panic());
        assert!(!dispatcher.is_loading(&element));
    }

    #[tokio::test]
    async fn dropped_future_releases_marker() {
        let harness = Harness::new(config(), ScriptedTransport::gated(success("Done")));
        let dispatcher = harness.dispatcher();
        let element = button();

        let call = dispatcher.dispatch(&element, DispatchArgs::new());
        let cancelled = tokio::time::timeout(Duration::from_millis(20), call).await;
        assert!(cancelled.is_err());
        assert!(!dispatcher.is_loading(&element));
    }

    #[tokio::test]
    async fn legacy_request_is_namespaced_and_resolved() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();

        dispatcher.dispatch(&button(), DispatchArgs::new()).await.unwrap();

        let (request, timeout) = harness.transport.last_request().unwrap();
        assert_eq!(request.kind, TransportKind::Legacy);
        assert_eq!(request.action.as_deref(), Some("acme-purge"));
        assert_eq!(request.token.as_deref(), Some("n0nce"));
        assert_eq!(timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn explicit_values_in_data_win() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let data = Payload::new()
            .with("action", "flush")
            .with("nonce", "fresh")
            .with("limit", TypedValue::Int(Some(3)));

        dispatcher
            .dispatch(&button(), DispatchArgs::new().action("ignored").data(data))
            .await
            .unwrap();

        let (request, _) = harness.transport.last_request().unwrap();
        assert_eq!(request.action.as_deref(), Some("acme-flush"));
        assert_eq!(request.token.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn rest_uses_default_endpoint_and_override_timeout() {
        let mut config = config();
        config.restful = true;
        let harness = Harness::new(config, ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let element = ElementSnapshot::control("go").with_container_attr("data-token", "tok");

        dispatcher
            .dispatch(&element, DispatchArgs::new().timeout(Duration::ZERO))
            .await
            .unwrap();

        let (request, timeout) = harness.transport.last_request().unwrap();
        assert_eq!(request.kind, TransportKind::Rest);
        assert_eq!(request.endpoint, "default");
        assert_eq!(request.action, None);
        assert_eq!(request.token.as_deref(), Some("tok"));
        assert_eq!(timeout, None);
    }

    #[tokio::test]
    async fn form_fields_feed_resolution() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let form = ElementSnapshot::form("settings")
            .with_field(FieldSnapshot::hidden("action", "save-settings"))
            .with_field(FieldSnapshot::hidden("nonce", "abc"))
            .with_field(FieldSnapshot::button("submit").with_id("settings-submit"))
            .with_submit("settings-submit");

        dispatcher.dispatch(&form, DispatchArgs::new()).await.unwrap();

        let (request, _) = harness.transport.last_request().unwrap();
        assert_eq!(request.action.as_deref(), Some("acme-save-settings"));
        assert_eq!(request.token.as_deref(), Some("abc"));
        assert!(harness.dom.classes(&"settings-submit".into()).is_empty());
    }

    #[tokio::test]
    async fn success_notifies_with_status_kind() {
        let outcome = Outcome::Success(envelope(json!({"status": "warning", "message": "Almost"})));
        let harness = Harness::new(config(), ScriptedTransport::new(outcome));
        let dispatcher = harness.dispatcher();
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();

        dispatcher
            .dispatch(
                &button(),
                DispatchArgs::new()
                    .on_success(move |e| *slot.lock().unwrap() = Some(e.status.clone())),
            )
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("warning"));
        let toasts = harness.notifier.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Almost");
        assert_eq!(toasts[0].kind, NotifyKind::Warning);
        assert_eq!(toasts[0].timeout, Duration::from_secs(5));
        assert!(harness.navigator.events().is_empty());
    }

    #[tokio::test]
    async fn silent_call_or_envelope_skips_notification() {
        let silenced = Outcome::Success(envelope(json!({
            "status": "success",
            "message": "Hi",
            "content": {"silent": true}
        })));
        let harness = Harness::new(config(), ScriptedTransport::new(silenced));
        harness.dispatcher().dispatch(&button(), DispatchArgs::new()).await.unwrap();
        assert!(harness.notifier.toasts().is_empty());

        let harness = Harness::new(config(), ScriptedTransport::new(Outcome::transport("timeout")));
        harness
            .dispatcher()
            .dispatch(&button(), DispatchArgs::new().silent())
            .await
            .unwrap();
        assert!(harness.notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn reload_and_redirect() {
        let outcome = Outcome::Success(envelope(json!({
            "status": "success",
            "content": {"reload": true, "redirect": "https://example.com/wp-admin/"}
        })));
        let harness = Harness::new(config(), ScriptedTransport::new(outcome));
        harness.dispatcher().dispatch(&button(), DispatchArgs::new()).await.unwrap();

        assert_eq!(
            harness.navigator.events(),
            [
                Navigation::Reload(Duration::from_millis(1500)),
                Navigation::Redirect("https://example.com/wp-admin/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn session_reload_flag_applies_to_every_success() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        harness.session.set_reloading(true);
        harness.dispatcher().dispatch(&button(), DispatchArgs::new()).await.unwrap();
        assert_eq!(harness.navigator.events(), [Navigation::Reload(RELOAD_DELAY)]);
    }

    #[tokio::test]
    async fn failure_notifies_generic_message_with_detail() {
        let outcome = Outcome::from_envelope(ResponseEnvelope::new("error", "Bad nonce"));
        let harness = Harness::new(config(), ScriptedTransport::new(outcome));
        let detail = Arc::new(Mutex::new(String::new()));
        let slot = detail.clone();

        let result = harness
            .dispatcher()
            .dispatch(
                &button(),
                DispatchArgs::new().on_error(move |d| *slot.lock().unwrap() = d.to_string()),
            )
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(*detail.lock().unwrap(), "Bad nonce");
        let toasts = harness.notifier.toasts();
        assert_eq!(toasts[0].message, "Something went wrong");
        assert_eq!(toasts[0].detail.as_deref(), Some("Bad nonce"));
        assert_eq!(toasts[0].kind, NotifyKind::Error);
        assert_eq!(toasts[0].timeout, Duration::from_secs(3));
        assert!(harness.navigator.events().is_empty());
    }

    #[tokio::test]
    async fn without_loading_skips_marker() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let element = button();
        harness.dom.add_class(element.loading_target(), LOADING_CLASS);

        let outcome = dispatcher
            .dispatch(&element, DispatchArgs::new().without_loading())
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert!(dispatcher.is_loading(&element));
    }

    #[test]
    fn completion_hook_panic_propagates() {
        let harness = Harness::new(config(), ScriptedTransport::new(success("Done")));
        let dispatcher = harness.dispatcher();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let args = DispatchArgs::new().on_complete(|| panic!("boom"));
            runtime.block_on(dispatcher.dispatch(&button(), args))
        }));
        assert!(result.is_err());
        assert!(!dispatcher.is_loading(&button()));
    }
}
