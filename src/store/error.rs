use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("{collection}/{id} not found")]
    RecordNotFound { collection: String, id: String },

    #[error("{collection}/{id} already exists")]
    DuplicateId { collection: String, id: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Data file is malformed: {0}")]
    Corrupt(String),

    #[error("Failed to access data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownCollection(_) | Self::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateId { .. } => StatusCode::CONFLICT,
            Self::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            Self::Corrupt(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn collection(&self) -> Option<&str> {
        match self {
            Self::UnknownCollection(name) => Some(name.as_str()),
            Self::RecordNotFound { collection, .. } | Self::DuplicateId { collection, .. } => {
                Some(collection.as_str())
            }
            _ => None,
        }
    }
}

impl From<JsonRejection> for StoreError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRecord(rejection.body_text())
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });

        if status.is_server_error() {
            tracing::error!("store failure: {self}");
            body = json!({ "error": "Internal server error" });
        } else {
            tracing::warn!(
                status = status.as_u16(),
                collection = self.collection().unwrap_or("-"),
                "{self}"
            );
            if let Some(collection) = self.collection() {
                body["collection"] = Value::from(collection);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_failure() {
        assert_eq!(StoreError::not_found("events", "3").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            StoreError::UnknownCollection("tickets".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StoreError::InvalidRecord("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StoreError::Corrupt("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_id_is_a_conflict() {
        let resp = StoreError::DuplicateId {
            collection: "users".into(),
            id: "1".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
