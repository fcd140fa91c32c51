//! DOM capability.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vanille_core::ElementId;

/// Class marking an element with a request in flight.
pub const LOADING_CLASS: &str = "icon-loading";

/// The slice of the host document the dispatcher needs.
pub trait Dom: Send + Sync {
    fn has_class(&self, element: &ElementId, class: &str) -> bool;
    /// Add a class. Returns false if the element already had it; the check
    /// and the insert are one atomic step.
    fn add_class(&self, element: &ElementId, class: &str) -> bool;
    fn remove_class(&self, element: &ElementId, class: &str);
    /// Reset an input's value.
    fn clear_value(&self, element: &ElementId);
}

#[derive(Debug, Default)]
struct Node {
    classes: BTreeSet<String>,
    value: Option<String>,
}

/// A document held in memory. Used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryDom {
    nodes: Mutex<HashMap<ElementId, Node>>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<ElementId, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_value(&self, element: &ElementId, value: impl Into<String>) {
        self.nodes().entry(element.clone()).or_default().value = Some(value.into());
    }

    pub fn value(&self, element: &ElementId) -> Option<String> {
        self.nodes().get(element).and_then(|n| n.value.clone())
    }

    pub fn classes(&self, element: &ElementId) -> Vec<String> {
        self.nodes()
            .get(element)
            .map(|n| n.classes.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Dom for MemoryDom {
    fn has_class(&self, element: &ElementId, class: &str) -> bool {
        self.nodes()
            .get(element)
            .is_some_and(|n| n.classes.contains(class))
    }

    fn add_class(&self, element: &ElementId, class: &str) -> bool {
        self.nodes()
            .entry(element.clone())
            .or_default()
            .classes
            .insert(class.to_string())
    }

    fn remove_class(&self, element: &ElementId, class: &str) {
        if let Some(node) = self.nodes().get_mut(element) {
            node.classes.remove(class);
        }
    }

    fn clear_value(&self, element: &ElementId) {
        if let Some(node) = self.nodes().get_mut(element) {
            node.value = None;
        }
    }
}
