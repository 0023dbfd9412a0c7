use thiserror::Error;

/// Core error types for Lifeline dispatch operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not found: {entity}/{id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a new InvalidTransition error
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new TransportUnavailable error
    pub fn transport_unavailable(message: impl Into<String>) -> Self {
        Self::TransportUnavailable(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidTransition { .. }
                | Self::InvalidState { .. }
                | Self::Validation(_)
                | Self::JsonError(_)
        )
    }

    /// Check if this error is recoverable during fan-out.
    ///
    /// Transport failures are scoped to a single delivery attempt and must
    /// never abort the mutation that triggered the broadcast.
    pub fn is_delivery_error(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidTransition { .. } | Self::InvalidState { .. } => ErrorCategory::Conflict,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::TransportUnavailable(_) => ErrorCategory::Transport,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Transport,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Transport => write!(f, "transport"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
