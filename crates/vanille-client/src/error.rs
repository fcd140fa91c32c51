//! Client errors.
//!
//! Transport and application failures are not errors here: they are
//! [`Outcome`](vanille_core::Outcome) values, surfaced through hooks and
//! notifications. These types cover what stops a request from being sent.

use vanille_core::ElementId;

/// A dispatch that never reached the network.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The element already has a request in flight; this call was dropped.
    #[error("element {0} already has a request in flight")]
    InFlight(ElementId),
    /// Legacy transport needs an action and none could be resolved.
    #[error("no action given or found on element {0}")]
    MissingAction(ElementId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Input rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file {name} is {size} bytes, limit is {limit}")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("no file selected")]
    NoFiles,
}

/// Failure constructing the client.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
