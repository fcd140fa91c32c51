//! Test doubles shared by the module tests.

use crate::{Dispatcher, MemoryDom, Navigator, Notifier, Session, Surfaces, Toast, Transport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use vanille_core::{Config, Method, Outcome, Payload, RequestDescriptor, TransportKind};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

pub fn descriptor(kind: TransportKind, payload: Payload) -> RequestDescriptor {
    RequestDescriptor {
        action: None,
        token: None,
        endpoint: "default".to_string(),
        payload,
        files: Vec::new(),
        kind,
        method: Method::Post,
        headers: Vec::new(),
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Reload(Duration),
    Redirect(String),
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub events: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn events(&self) -> Vec<Navigation> {
        self.events.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn reload(&self, after: Duration) {
        self.events.lock().unwrap().push(Navigation::Reload(after));
    }

    fn redirect(&self, url: &str) {
        self.events.lock().unwrap().push(Navigation::Redirect(url.to_string()));
    }
}

/// Answers every request with a fixed outcome and records what it was sent.
pub struct ScriptedTransport {
    outcome: Outcome,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<(RequestDescriptor, Option<Duration>)>>,
    /// When set, each call waits for a permit before answering.
    gate: Option<Notify>,
    started: Notify,
}

impl ScriptedTransport {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
            started: Notify::new(),
        }
    }

    pub fn gated(outcome: Outcome) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(outcome)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(RequestDescriptor, Option<Duration>)> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor, timeout: Option<Duration>) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((request.clone(), timeout));
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

/// A dispatcher wired to in-memory surfaces and one scripted transport used
/// for both conventions.
pub struct Harness {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
    pub dom: Arc<MemoryDom>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
    pub transport: Arc<ScriptedTransport>,
}

impl Harness {
    pub fn new(config: Config, transport: ScriptedTransport) -> Self {
        Self {
            config: Arc::new(config),
            session: Arc::new(Session::new()),
            dom: Arc::new(MemoryDom::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            transport: Arc::new(transport),
        }
    }

    pub fn surfaces(&self) -> Surfaces {
        Surfaces {
            dom: self.dom.clone(),
            notifier: self.notifier.clone(),
            navigator: self.navigator.clone(),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::with_transports(
            self.config.clone(),
            self.session.clone(),
            self.surfaces(),
            self.transport.clone(),
            self.transport.clone(),
        )
    }
}
