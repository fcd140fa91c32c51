//! Toast notifications.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a success notice stays up.
pub(crate) const NOTICE_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a request failure notice stays up.
pub(crate) const ERROR_TIMEOUT: Duration = Duration::from_secs(3);

/// Visual category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotifyKind {
    /// Map an envelope status to a kind. Unknown statuses render as success.
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" => Self::Info,
            _ => Self::Success,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A transient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    /// Secondary line, e.g. the transport error behind a generic message.
    pub detail: Option<String>,
    pub kind: NotifyKind,
    /// Zero keeps the toast up until replaced or dismissed.
    pub timeout: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: NotifyKind, timeout: Duration) -> Self {
        Self {
            message: message.into(),
            detail: None,
            kind,
            timeout,
        }
    }

    pub fn persistent(message: impl Into<String>, kind: NotifyKind) -> Self {
        Self::new(message, kind, Duration::ZERO)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.is_empty()).then_some(detail);
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.timeout.is_zero()
    }
}

/// Where toasts go.
pub trait Notifier: Send + Sync {
    fn show(&self, toast: Toast);
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    visible: Option<Toast>,
}

/// A single toast slot. A newer toast replaces the visible one; timed toasts
/// hide themselves unless something newer has replaced them first.
///
/// Auto-hide needs a Tokio runtime. Outside one, timed toasts stay up until
/// replaced or dismissed.
#[derive(Debug, Clone, Default)]
pub struct ToastCenter {
    slot: Arc<Mutex<Slot>>,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Toast> {
        self.slot().visible.clone()
    }

    pub fn dismiss(&self) {
        let mut slot = self.slot();
        slot.generation += 1;
        slot.visible = None;
    }

    fn hide_if_current(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.generation == generation {
            slot.visible = None;
        }
    }
}

impl Notifier for ToastCenter {
    fn show(&self, toast: Toast) {
        tracing::info!(
            kind = toast.kind.as_str(),
            message = %toast.message,
            detail = ?toast.detail,
            "notification"
        );

        let timeout = toast.timeout;
        let generation = {
            let mut slot = self.slot();
            slot.generation += 1;
            slot.visible = Some(toast);
            slot.generation
        };

        if timeout.is_zero() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let center = self.clone();
            handle.spawn(async move {
                tokio::time::sleep(timeout).await;
                center.hide_if_current(generation);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(NotifyKind::from_status("error"), NotifyKind::Error);
        assert_eq!(NotifyKind::from_status("Warning"), NotifyKind::Warning);
        assert_eq!(NotifyKind::from_status("info"), NotifyKind::Info);
        assert_eq!(NotifyKind::from_status("success"), NotifyKind::Success);
        assert_eq!(NotifyKind::from_status("done"), NotifyKind::Success);
        assert_eq!(NotifyKind::from_status(""), NotifyKind::Success);
    }

    #[test]
    fn empty_detail_is_dropped() {
        let toast = Toast::new("Saved", NotifyKind::Success, NOTICE_TIMEOUT).with_detail("");
        assert_eq!(toast.detail, None);
        assert!(!toast.is_persistent());
        assert!(Toast::persistent("Offline", NotifyKind::Error).is_persistent());
    }

    #[test]
    fn newer_toast_replaces_visible() {
        let center = ToastCenter::new();
        center.show(Toast::persistent("first", NotifyKind::Info));
        center.show(Toast::persistent("second", NotifyKind::Error));
        assert_eq!(center.current().unwrap().message, "second");
        center.dismiss();
        assert_eq!(center.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_toast_hides_itself() {
        let center = ToastCenter::new();
        center.show(Toast::new("Saved", NotifyKind::Success, NOTICE_TIMEOUT));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(center.current().is_some());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(center.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_leaves_newer_toast() {
        let center = ToastCenter::new();
        center.show(Toast::new("first", NotifyKind::Error, ERROR_TIMEOUT));
        tokio::time::sleep(Duration::from_secs(2)).await;
        center.show(Toast::persistent("offline", NotifyKind::Error));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(center.current().unwrap().message, "offline");
    }
}
