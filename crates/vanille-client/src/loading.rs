//! Scoped loading state.

use crate::dom::{Dom, LOADING_CLASS};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use vanille_core::ElementId;

type CompleteHook = Box<dyn FnOnce() + Send>;

/// Holds an element's loading marker for the duration of a request.
///
/// Dropping the guard runs the completion hook and then clears the marker.
/// Both happen on every exit path: normal return, early error return,
/// cancellation of the enclosing future, and unwinding out of a hook.
pub struct LoadingGuard {
    marker: Option<(Arc<dyn Dom>, ElementId)>,
    on_complete: Option<CompleteHook>,
}

impl LoadingGuard {
    /// Mark `target` as loading. Returns `None` if it already was.
    pub fn acquire(dom: Arc<dyn Dom>, target: ElementId) -> Option<Self> {
        if !dom.add_class(&target, LOADING_CLASS) {
            return None;
        }
        Some(Self {
            marker: Some((dom, target)),
            on_complete: None,
        })
    }

    /// A guard that only runs the completion hook.
    pub fn unmarked() -> Self {
        Self {
            marker: None,
            on_complete: None,
        }
    }

    pub fn set_on_complete(&mut self, hook: Option<CompleteHook>) {
        self.on_complete = hook;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let hook_result = self
            .on_complete
            .take()
            .map(|hook| panic::catch_unwind(AssertUnwindSafe(hook)));

        if let Some((dom, target)) = self.marker.take() {
            dom.remove_class(&target, LOADING_CLASS);
        }

        if let Some(Err(payload)) = hook_result {
            if !thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDom;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn marker_cleared_on_drop() {
        let dom = Arc::new(MemoryDom::new());
        let id = ElementId::from("btn");
        let guard = LoadingGuard::acquire(dom.clone(), id.clone()).unwrap();
        assert!(dom.has_class(&id, LOADING_CLASS));
        assert!(LoadingGuard::acquire(dom.clone(), id.clone()).is_none());
        drop(guard);
        assert!(!dom.has_class(&id, LOADING_CLASS));
    }

    #[test]
    fn completion_runs_before_marker_is_cleared() {
        let dom = Arc::new(MemoryDom::new());
        let id = ElementId::from("btn");
        let seen_loading = Arc::new(AtomicBool::new(false));

        let mut guard = LoadingGuard::acquire(dom.clone(), id.clone()).unwrap();
        let (d, i, seen) = (dom.clone(), id.clone(), seen_loading.clone());
        guard.set_on_complete(Some(Box::new(move || {
            seen.store(d.has_class(&i, LOADING_CLASS), Ordering::SeqCst);
        })));
        drop(guard);

        assert!(seen_loading.load(Ordering::SeqCst));
        assert!(!dom.has_class(&id, LOADING_CLASS));
    }

    #[test]
    fn marker_cleared_when_completion_panics() {
        let dom = Arc::new(MemoryDom::new());
        let id = ElementId::from("btn");
        let mut guard = LoadingGuard::acquire(dom.clone(), id.clone()).unwrap();
        guard.set_on_complete(Some(Box::new(|| panic!("hook failed"))));

        let result = panic::catch_unwind(AssertUnwindSafe(move || drop(guard)));
        assert!(result.is_err());
        assert!(!dom.has_class(&id, LOADING_CLASS));
    }

    #[test]
    fn marker_cleared_when_caller_panics() {
        let dom = Arc::new(MemoryDom::new());
        let id = ElementId::from("btn");
        let completed = Arc::new(AtomicBool::new(false));

        let (d, i, c) = (dom.clone(), id.clone(), completed.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(move || {
            let mut guard = LoadingGuard::acquire(d, i).unwrap();
            guard.set_on_complete(Some(Box::new(move || c.store(true, Ordering::SeqCst))));
            panic!("success hook failed");
        }));

        assert!(result.is_err());
        assert!(completed.load(Ordering::SeqCst));
        assert!(!dom.has_class(&id, LOADING_CLASS));
    }
}
