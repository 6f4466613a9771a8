//! Errors that can occur while starting or running the listener.

/// Errors surfaced by [`crate::serve`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listener failed to bind to its configured address.
    #[error("failed to bind to address: {0}")]
    Bind(#[source] std::io::Error),

    /// The listener failed while serving connections.
    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}
