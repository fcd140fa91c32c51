use std::sync::atomic::{AtomicBool, Ordering};

/// Page-lifetime state shared by every dispatch.
#[derive(Debug, Default)]
pub struct Session {
    reloading: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every successful response reloads the page.
    pub fn set_reloading(&self, reloading: bool) {
        self.reloading.store(reloading, Ordering::Relaxed);
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading.load(Ordering::Relaxed)
    }
}
