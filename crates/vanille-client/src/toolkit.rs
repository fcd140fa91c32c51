//! The operations the UI layer binds to forms and controls.

use crate::dispatch::{DispatchArgs, Dispatcher, Surfaces};
use crate::error::{DispatchError, SetupError, ValidationError};
use crate::notify::{Notifier, NotifyKind, Toast};
use crate::session::Session;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use vanille_cache::{KeyValueStore, StoreError, TtlCache};
use vanille_core::{
    Config, ElementId, ElementSnapshot, FileBlob, HookBaselines, Method, Outcome, Payload,
    PayloadValue, TransportKind,
};

const TAB_KEY: &str = "nav-tab";
const ACTIVATION_TAB: &str = "#activation-tab";
/// How long a remembered tab survives.
pub const TAB_TTL: Duration = Duration::from_secs(10);
/// Activation and registration talk to a remote licence server.
const SLOW_CALL_FACTOR: u32 = 10;
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Toolkit {
    dispatcher: Dispatcher,
    cache: TtlCache,
    hooks: Mutex<HookBaselines>,
}

impl Toolkit {
    pub fn new(
        config: Arc<Config>,
        session: Arc<Session>,
        surfaces: Surfaces,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, SetupError> {
        let cache = TtlCache::new(config.namespace.clone(), store);
        let dispatcher = Dispatcher::new(config, session, surfaces)?;
        Ok(Self::with_dispatcher(dispatcher, cache))
    }

    pub fn with_dispatcher(dispatcher: Dispatcher, cache: TtlCache) -> Self {
        let hooks = dispatcher.config().hooks.clone();
        Self {
            dispatcher,
            cache,
            hooks: Mutex::new(hooks),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    fn config(&self) -> &Config {
        self.dispatcher.config()
    }

    fn notifier(&self) -> &dyn Notifier {
        self.dispatcher.surfaces().notifier.as_ref()
    }

    fn baselines(&self) -> MutexGuard<'_, HookBaselines> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current hook baselines, including values saved during this session.
    pub fn hook_baselines(&self) -> HookBaselines {
        self.baselines().clone()
    }

    fn slow_timeout(&self) -> Duration {
        self.config().timeout * SLOW_CALL_FACTOR
    }

    /// Typed payload of one input group, as declared in the configuration.
    pub fn parse_inputs(&self, group: &str, form: &ElementSnapshot) -> Payload {
        self.config().inputs.collect(group, form)
    }

    /// Submit the activation form. On success the activation hooks are
    /// saved and the activation tab is remembered.
    pub async fn activate(&self, form: &ElementSnapshot) -> Result<Outcome, DispatchError> {
        let args = DispatchArgs::new()
            .data(Payload::new().with("activation", self.parse_inputs("activation", form)))
            .transport(TransportKind::Legacy)
            .timeout(self.slow_timeout());
        let outcome = self.dispatcher.dispatch(form, args).await?;
        if outcome.is_success() {
            self.save_hooks("activation", form).await?;
            if let Err(e) = self.remember_tab(ACTIVATION_TAB, Some(TAB_TTL)) {
                tracing::warn!(error = %e, "failed to remember activation tab");
            }
        }
        Ok(outcome)
    }

    /// Submit the registration form with its selected files.
    ///
    /// Every file is checked against the upload limit first; an oversized
    /// one empties its input and nothing is sent.
    pub async fn register(&self, form: &ElementSnapshot) -> Result<Outcome, DispatchError> {
        if self.dispatcher.is_loading(form) {
            return Err(DispatchError::InFlight(form.loading_target().clone()));
        }
        let files = form.files();
        if files.is_empty() {
            let message = self.config().strings.text_or("upload.error", "Please select a file");
            self.notifier()
                .show(Toast::new(message, NotifyKind::Warning, Duration::from_secs(5)));
            return Err(ValidationError::NoFiles.into());
        }
        let guard = self.dispatcher.upload_guard();
        for field in form.fields.iter().filter(|f| !f.files.is_empty()) {
            let input = field
                .id
                .clone()
                .unwrap_or_else(|| ElementId::new(field.name.as_str()));
            for file in &field.files {
                guard.check(&input, file)?;
            }
        }
        let args = DispatchArgs::new()
            .files(files)
            .transport(TransportKind::Legacy)
            .timeout(self.slow_timeout());
        self.dispatcher.dispatch(form, args).await
    }

    pub async fn unregister(&self, control: &ElementSnapshot) -> Result<Outcome, DispatchError> {
        self.dispatcher.dispatch(control, DispatchArgs::new()).await
    }

    /// Submit the settings form. On success both hook groups are saved.
    pub async fn save_settings(&self, form: &ElementSnapshot) -> Result<Outcome, DispatchError> {
        let data = Payload::new()
            .with("settings", self.parse_inputs("settings", form))
            .with("advanced", self.parse_inputs("advanced", form));
        let outcome = self.dispatcher.dispatch(form, DispatchArgs::new().data(data)).await?;
        if outcome.is_success() {
            self.save_hooks("settings", form).await?;
            self.save_hooks("advanced", form).await?;
        }
        Ok(outcome)
    }

    /// Send the hook fields of `group` that changed since they were last
    /// saved. Returns `None` without sending anything when nothing changed.
    ///
    /// The request is silent and leaves the loading marker alone. Saved
    /// values become the new baselines.
    pub async fn save_hooks(
        &self,
        group: &str,
        form: &ElementSnapshot,
    ) -> Result<Option<Outcome>, DispatchError> {
        let changes = self.baselines().changes(group, form);
        if changes.is_empty() {
            tracing::debug!(group, "no hook changes to save");
            return Ok(None);
        }

        let data = Payload::new().with("hooks", Payload::new().with(group, changes.clone()));
        let mut args = DispatchArgs::new()
            .action("save-hooks")
            .endpoint("hooks")
            .data(data)
            .silent()
            .without_loading();
        if self.config().transport_kind() == TransportKind::Legacy {
            if let Some(token) = form.field_value("hook-token") {
                args = args.token(token);
            }
        }

        let outcome = self.dispatcher.dispatch(form, args).await?;
        if outcome.is_success() {
            let mut baselines = self.baselines();
            for (key, value) in changes.iter() {
                if let PayloadValue::Value(value) = value {
                    baselines.record(group, key.clone(), value.to_string());
                }
            }
        }
        Ok(Some(outcome))
    }

    /// Purge the server-side cache. Rest sends a DELETE; Legacy posts.
    pub async fn purge_cache(&self, control: &ElementSnapshot) -> Result<Outcome, DispatchError> {
        self.dispatcher
            .dispatch(control, DispatchArgs::new().method(Method::Delete))
            .await
    }

    /// Check a picked file against the upload limit.
    pub fn check_upload(&self, input: &ElementId, file: &FileBlob) -> Result<(), ValidationError> {
        self.dispatcher.upload_guard().check(input, file)
    }

    /// Remember the open tab. `None` uses [`TAB_TTL`].
    pub fn remember_tab(&self, id: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let id = if id.starts_with('#') {
            id.to_string()
        } else {
            format!("#{id}")
        };
        self.cache.put(TAB_KEY, &id, Some(ttl.unwrap_or(TAB_TTL)))
    }

    pub fn restore_tab(&self) -> Result<Option<String>, StoreError> {
        self.cache.get(TAB_KEY)
    }

    pub fn connectivity_changed(&self, online: bool) {
        let strings = &self.config().strings;
        let toast = if online {
            let message = strings.text_or("online", "Back online");
            Toast::new(message, NotifyKind::Success, CONNECTIVITY_TIMEOUT)
        } else {
            Toast::persistent(strings.text_or("offline", "You are offline"), NotifyKind::Error)
        };
        self.notifier().show(toast);
    }
}
