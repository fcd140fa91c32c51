//! Request dispatch for Vanille.
//!
//! The [`Dispatcher`] sends an action to the server over one of two
//! transports, keeps the trigger element in a loading state for the duration
//! of the call, and turns the server's envelope into notifications, reloads
//! and redirects. [`Toolkit`] wraps it with the operations the UI layer binds
//! to forms and buttons.
//!
//! Everything that touches the page is an injected capability: [`Dom`] for
//! class markers and input values, [`Notifier`] for toasts, [`Navigator`] for
//! reloads and redirects.

mod dispatch;
mod dom;
mod error;
mod loading;
mod navigate;
mod notify;
mod session;
mod toolkit;
pub mod transport;
mod upload;

#[cfg(test)]
mod testing;

pub use dispatch::{DispatchArgs, Dispatcher, Hooks, Surfaces};
pub use dom::{Dom, LOADING_CLASS, MemoryDom};
pub use error::{DispatchError, SetupError, ValidationError};
pub use loading::LoadingGuard;
pub use navigate::{LogNavigator, Navigator, RELOAD_DELAY};
pub use notify::{Notifier, NotifyKind, Toast, ToastCenter};
pub use session::Session;
pub use toolkit::{TAB_TTL, Toolkit};
pub use transport::{LegacyTransport, RestTransport, Transport};
pub use upload::UploadGuard;
