use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fmt;

use crate::error_mapping::describe_facebook_error;

/// Typed failures surfaced by the Facebook Marketing API client.
///
/// Every operation of [`crate::facebook_client::FacebookClient`] returns one of
/// these variants unchanged, so callers can decide how to map them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacebookError {
    /// The platform itself throttled the call (HTTP 429).
    RateLimited {
        /// Seconds to wait before retrying, when known.
        retry_after: Option<u64>,
    },
    /// The platform answered HTTP 404 for the resource.
    NotFound {
        /// Endpoint or identifier that was not found.
        resource_id: String,
    },
    /// Any other non-2xx platform response.
    ApiError {
        /// Platform error code (e.g. `"190"`).
        code: Option<String>,
        /// Platform error message.
        message: String,
        /// HTTP status returned by the platform.
        http_status: Option<u16>,
    },
    /// No confirmed response from the platform (connection, DNS, timeout).
    TransportError {
        /// Underlying transport failure.
        message: String,
    },
    /// Malformed input or configuration caught before any network call.
    ValidationError {
        /// What was rejected.
        message: String,
    },
}

impl FacebookError {
    pub fn validation(message: impl Into<String>) -> Self {
        FacebookError::ValidationError {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        FacebookError::TransportError {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            FacebookError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            FacebookError::NotFound { .. } => "NOT_FOUND",
            FacebookError::ApiError { .. } => "FACEBOOK_API_ERROR",
            FacebookError::TransportError { .. } => "TRANSPORT_ERROR",
            FacebookError::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }

    /// HTTP status a route handler should answer with.
    pub fn http_status(&self) -> StatusCode {
        match self {
            FacebookError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            FacebookError::NotFound { .. } => StatusCode::NOT_FOUND,
            FacebookError::ApiError { http_status, .. } => match http_status {
                Some(status) if *status >= 500 => StatusCode::BAD_GATEWAY,
                _ => StatusCode::BAD_REQUEST,
            },
            FacebookError::TransportError { .. } => StatusCode::BAD_GATEWAY,
            FacebookError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable description, run through the platform error table for API errors.
    pub fn user_message(&self) -> String {
        match self {
            FacebookError::RateLimited { .. } => {
                "Facebook API rate limit exceeded. Please try again later.".to_string()
            }
            FacebookError::NotFound { resource_id } => {
                format!("Resource '{}' not found", resource_id)
            }
            FacebookError::ApiError { code, message, .. } => {
                describe_facebook_error(code.as_deref(), message)
            }
            FacebookError::TransportError { message } => format!("Request failed: {}", message),
            FacebookError::ValidationError { message } => message.clone(),
        }
    }
}

impl fmt::Display for FacebookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacebookError::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "Rate limit exceeded (retry after {}s)", secs),
            FacebookError::RateLimited { retry_after: None } => write!(f, "Rate limit exceeded"),
            FacebookError::NotFound { resource_id } => write!(f, "Not found: {}", resource_id),
            FacebookError::ApiError {
                code,
                message,
                http_status,
            } => {
                write!(f, "Facebook API error")?;
                if let Some(status) = http_status {
                    write!(f, " [HTTP {}]", status)?;
                }
                if let Some(code) = code {
                    write!(f, " (code {})", code)?;
                }
                write!(f, ": {}", message)
            }
            FacebookError::TransportError { message } => write!(f, "Transport error: {}", message),
            FacebookError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
        }
    }
}

impl std::error::Error for FacebookError {}

impl From<reqwest::Error> for FacebookError {
    fn from(err: reqwest::Error) -> Self {
        FacebookError::TransportError {
            message: err.without_url().to_string(),
        }
    }
}

impl IntoResponse for FacebookError {
    /// Converts the failure into the standard `{"error": {...}}` JSON body.
    fn into_response(self) -> Response {
        let status = self.http_status();
        match &self {
            FacebookError::RateLimited { .. } | FacebookError::ValidationError { .. } => {
                tracing::warn!("{}", self);
            }
            FacebookError::NotFound { .. } => tracing::info!("{}", self),
            FacebookError::ApiError { .. } | FacebookError::TransportError { .. } => {
                tracing::error!("{}", self);
            }
        }

        let mut error = json!({
            "code": self.error_code(),
            "message": self.user_message(),
            "timestamp": Utc::now().to_rfc3339(),
        });

        let retry_after = match &self {
            FacebookError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };

        match &self {
            FacebookError::RateLimited {
                retry_after: Some(secs),
            } => {
                error["details"] = json!({ "retry_after": secs });
            }
            FacebookError::ApiError {
                code, http_status, ..
            } => {
                error["details"] = json!({
                    "facebook_code": code,
                    "facebook_status": http_status,
                });
            }
            _ => {}
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
