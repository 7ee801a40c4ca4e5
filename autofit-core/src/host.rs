//! Host capabilities the engines run against.
//!
//! ```text
//! ┌──────────────────────── Host ────────────────────────┐
//! │  Document          │  Timer            │  ResizeSignal │
//! │  - query           │  - schedule       │  - subscribe  │
//! │  - geometry        │  - cancel         │  - unsubscribe│
//! │  - inline styles   │                   │               │
//! │  - stylesheets     │                   │               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Timers and resize notifications are delivered back to the owning
//! [`Session`](crate::Session) as [`HostEvent`]s.

use std::fmt::Debug;

use thiserror::Error;

use crate::Size;

/// Errors reported by a host implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The selector could not be parsed.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// No stylesheet node with this id exists.
    #[error("Stylesheet not found: {0}")]
    MissingStylesheet(String),

    /// Any other failure raised by the host.
    #[error("{0}")]
    Host(String),
}

/// Read and write access to the live document.
pub trait Document {
    /// Handle to an element; equality means identity.
    type Element: Clone + PartialEq + Debug;

    /// All elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidSelector`] if the selector does not parse.
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError>;

    /// First element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::InvalidSelector`] if the selector does not parse.
    fn query_first(&self, selector: &str) -> Result<Option<Self::Element>, DomError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Client area of the viewport.
    fn viewport_size(&self) -> Size;

    /// Rendered client box of `element`.
    fn client_size(&self, element: &Self::Element) -> Size;

    /// Set one inline style property.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the write.
    fn set_style(
        &mut self,
        element: &Self::Element,
        property: &str,
        value: &str,
    ) -> Result<(), DomError>;

    /// Remove one inline style property.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the write.
    fn remove_style(&mut self, element: &Self::Element, property: &str) -> Result<(), DomError>;

    /// Drop every inline style property of `element`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the write.
    fn reset_style(&mut self, element: &Self::Element) -> Result<(), DomError>;

    /// Insert a stylesheet node, replacing one with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be created.
    fn insert_stylesheet(&mut self, id: &str, text: &str) -> Result<(), DomError>;

    /// Replace the text of an existing stylesheet node.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::MissingStylesheet`] if no node has this id.
    fn set_stylesheet_text(&mut self, id: &str, text: &str) -> Result<(), DomError>;

    /// Remove a stylesheet node. Removing a missing node succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the host fails to detach the node.
    fn remove_stylesheet(&mut self, id: &str) -> Result<(), DomError>;
}

/// Deferred work the session asks the host to run later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// A debounced scale pass.
    ResizePass,
    /// Enable the root transition after the first pass.
    ApplyTransition,
}

/// Cancellable one-shot timers.
pub trait Timer {
    /// Handle returned by [`Timer::schedule`].
    type Handle: Debug;

    /// Run `task` after `delay_ms`, delivered as [`HostEvent::Timer`].
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot create the timer.
    fn schedule(&mut self, task: TimerTask, delay_ms: u32) -> Result<Self::Handle, DomError>;

    /// Cancel a pending timer. Cancelling a fired timer does nothing.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Viewport resize notifications, delivered as [`HostEvent::Resize`].
pub trait ResizeSignal {
    /// Start delivering resize notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be attached.
    fn subscribe_resize(&mut self) -> Result<(), DomError>;

    /// Stop delivering resize notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be detached.
    fn unsubscribe_resize(&mut self) -> Result<(), DomError>;
}

/// Everything a [`Session`](crate::Session) needs from its environment.
pub trait Host: Document + Timer + ResizeSignal {}

impl<T: Document + Timer + ResizeSignal> Host for T {}

/// Notification from the host to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The viewport client area changed.
    Resize,
    /// A scheduled timer fired.
    Timer(TimerTask),
}
