use crate::dom::Dom;
use crate::error::ValidationError;
use crate::notify::{Notifier, NotifyKind, Toast};
use std::sync::Arc;
use vanille_core::{ElementId, FileBlob};

/// Rejects oversized files as soon as they are picked.
///
/// A rejected file leaves a persistent warning and an emptied input behind,
/// and never reaches a transport.
pub struct UploadGuard {
    limit: u64,
    message: String,
    dom: Arc<dyn Dom>,
    notifier: Arc<dyn Notifier>,
}

impl UploadGuard {
    pub fn new(
        limit: u64,
        message: impl Into<String>,
        dom: Arc<dyn Dom>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            limit,
            message: message.into(),
            dom,
            notifier,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Check a file picked in `input`, emptying the input when it is rejected.
    pub fn check(&self, input: &ElementId, file: &FileBlob) -> Result<(), ValidationError> {
        self.reject_oversized(Some(input), file)
    }

    /// Check files that are not tied to an input, such as those attached to a
    /// dispatch directly. Stops at the first oversized file.
    pub fn check_all(&self, files: &[FileBlob]) -> Result<(), ValidationError> {
        files
            .iter()
            .try_for_each(|file| self.reject_oversized(None, file))
    }

    fn reject_oversized(
        &self,
        input: Option<&ElementId>,
        file: &FileBlob,
    ) -> Result<(), ValidationError> {
        let size = file.size();
        if size <= self.limit {
            return Ok(());
        }
        tracing::warn!(
            input = ?input.map(ElementId::as_str),
            file = %file.name,
            size,
            limit = self.limit,
            "rejecting oversized upload"
        );
        self.notifier
            .show(Toast::persistent(self.message.clone(), NotifyKind::Warning));
        if let Some(input) = input {
            self.dom.clear_value(input);
        }
        Err(ValidationError::FileTooLarge {
            name: file.name.clone(),
            size,
            limit: self.limit,
        })
    }
}
