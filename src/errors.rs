use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use strum::{AsRefStr, Display};

use crate::services::checkout::form::FormField;

/// Error body returned by the backend on non-success statuses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description; a list of objects for request-shape errors
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Renders `detail` for display: strings verbatim, anything else as JSON.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Coarse classification used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Token absent or rejected: force sign-out
    Auth,
    /// Local form checks: inline notice, nothing sent
    Validation,
    /// Backend answered with a failure status
    Request,
    /// The exchange itself failed
    Transport,
    /// Local invariants, storage, configuration
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("{message}")]
    Validation {
        field: Option<FormField>,
        message: String,
    },

    #[error("Request failed ({status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Api {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Payment initialization failed")]
    PaymentInitialization,

    #[error("Payment verification failed: {0}")]
    PaymentVerification(String),

    #[error("Invalid checkout state: {0}")]
    InvalidState(String),

    #[error("Token store error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        // Surface the first human-readable message rather than the full report.
        let message = err
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| err.to_string());

        ClientError::Validation {
            field: None,
            message,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl ClientError {
    pub fn validation(field: FormField, message: impl Into<String>) -> Self {
        ClientError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Auth,
            Self::Api { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                ErrorKind::Auth
            }
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Api { .. } | Self::PaymentInitialization | Self::PaymentVerification(_) => {
                ErrorKind::Request
            }
            Self::Transport(_) | Self::Decode(_) => ErrorKind::Transport,
            Self::InvalidState(_) | Self::Storage(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// True when the backend explicitly refused the credentials.
    ///
    /// A locally missing token is `Auth` too, but there is nothing to discard.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Api { .. }) && self.kind() == ErrorKind::Auth
    }

    /// Text for the on-screen notice.
    ///
    /// Backend and validation messages are shown verbatim; transport-level
    /// failures and bodies without `detail` fall back to the caller's wording.
    pub fn notice_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Validation { message, .. } => message.clone(),
            Self::Unauthenticated(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_text_keeps_strings_verbatim() {
        let body: ErrorBody = serde_json::from_value(json!({"detail": "Insufficient stock"})).unwrap();
        assert_eq!(body.detail_text().as_deref(), Some("Insufficient stock"));
    }

    #[test]
    fn detail_text_renders_structured_detail() {
        let body: ErrorBody =
            serde_json::from_value(json!({"detail": [{"loc": ["query", "quantity"]}]})).unwrap();
        assert_eq!(
            body.detail_text().as_deref(),
            Some(r#"[{"loc":["query","quantity"]}]"#)
        );
    }

    #[test]
    fn missing_detail_is_none() {
        let body: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.detail_text().is_none());
    }

    #[test]
    fn unauthorized_status_classifies_as_auth() {
        let err = ClientError::Api {
            status: StatusCode::UNAUTHORIZED,
            detail: Some("Could not validate credentials".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.is_auth_rejection());
    }

    #[test]
    fn notice_prefers_backend_detail() {
        let err = ClientError::Api {
            status: StatusCode::BAD_REQUEST,
            detail: Some("Product not found".into()),
        };
        assert_eq!(err.notice_message("Error adding to cart"), "Product not found");

        let bare = ClientError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        };
        assert_eq!(bare.notice_message("Failed to create order"), "Failed to create order");
        assert_eq!(
            ClientError::Decode("bad json".into()).notice_message("Error adding to cart"),
            "Error adding to cart"
        );
    }
}
