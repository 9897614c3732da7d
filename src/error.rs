//! Error types

/// Errors produced by a [`TableSource::load`](crate::TableSource::load) call.
///
/// These never escape to the view: the controller catches them at its
/// boundary, logs them, and leaves the buffer in its last good state.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The backend rejected or failed the query.
    #[error("backend error: {0}")]
    Backend(String),

    /// The underlying transport failed before a response was produced.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Creates a new backend error from a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a new transport error wrapping the underlying cause.
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(source))
    }
}
