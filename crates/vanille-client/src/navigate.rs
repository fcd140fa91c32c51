use std::time::Duration;

/// Delay before a requested reload.
pub const RELOAD_DELAY: Duration = Duration::from_millis(1500);

/// Page navigation.
pub trait Navigator: Send + Sync {
    /// Reload the current page after `after`.
    fn reload(&self, after: Duration);
    fn redirect(&self, url: &str);
}

/// Navigator for headless use: records the request in the log and does
/// nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn reload(&self, after: Duration) {
        tracing::info!(after_ms = after.as_millis() as u64, "reload requested");
    }

    fn redirect(&self, url: &str) {
        tracing::info!(url, "redirect requested");
    }
}
