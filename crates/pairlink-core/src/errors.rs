/// Errors reported synchronously to callers of the session service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,
    /// The recipient is empty once the leading `+` is stripped.
    #[error("recipient is empty")]
    EmptyRecipient,
    /// `dispatch` was called off a Tokio runtime, so the send task has
    /// nowhere to run.
    #[error("no async runtime available for dispatch")]
    RuntimeUnavailable,
}

/// Simulated send failure drawn inside a detached dispatch task.
///
/// Never returned to the caller that requested the dispatch; the display
/// text is what ends up in the session's `last_error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DispatchFailure {
    #[error("Network connection error")]
    Network,
    #[error("Invalid phone number format")]
    InvalidRecipient,
    #[error("Operation timed out")]
    Timeout,
}

impl DispatchFailure {
    /// Every failure reason, in a fixed order for uniform selection.
    pub const ALL: [DispatchFailure; 3] = [Self::Network, Self::InvalidRecipient, Self::Timeout];

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::InvalidRecipient => "invalid_recipient",
            Self::Timeout => "timeout",
        }
    }
}

/// Failure of the token image renderer. Tolerated by the service.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("image error: {0}")]
    Image(String),
}
