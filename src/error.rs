use thiserror::Error;

/// Errors surfaced by the client-side components (auth gate, API client,
/// router handlers and the application orchestrator).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("This event is full")]
    EventFull,

    #[error("You are already registered for this event")]
    AlreadyRegistered,

    #[error("This event is not open for registration")]
    EventUnavailable,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{method} {endpoint} failed: {reason}")]
    Connectivity {
        method: String,
        endpoint: String,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to decide how an error is surfaced in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Business,
    Connectivity,
    Unexpected,
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn connectivity(
        method: impl std::fmt::Display,
        endpoint: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Connectivity {
            method: method.to_string(),
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidCredentials | Self::Unauthorized | Self::Forbidden => {
                ErrorKind::Authorization
            }
            Self::EventFull
            | Self::AlreadyRegistered
            | Self::EventUnavailable
            | Self::NotFound(_)
            | Self::Conflict(_) => ErrorKind::Business,
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("Malformed JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_message_names_method_and_endpoint() {
        let err = AppError::connectivity("GET", "/events/4", "HTTP 500");
        assert_eq!(err.to_string(), "GET /events/4 failed: HTTP 500");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn business_rules_are_classified_together() {
        for err in [
            AppError::EventFull,
            AppError::AlreadyRegistered,
            AppError::NotFound("Event not found".into()),
        ] {
            assert_eq!(err.kind(), ErrorKind::Business);
        }
        assert_eq!(AppError::Forbidden.kind(), ErrorKind::Authorization);
    }
}
