//! Tally API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tally_core::error::DomainError;
use tally_ingestion::application::ingestion::IngestError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// HTTP-layer error that implements `IntoResponse`.
///
/// Server-side failures answer with a generic message and a short code. The
/// underlying detail is only logged where the failure happened.
#[derive(Debug)]
pub enum ApiError {
    /// A storage or lookup failure.
    Domain(DomainError),
    /// An ingestion pipeline failure.
    Ingest(IngestError),
    /// A query string or path segment that could not be deserialized.
    Rejected {
        /// Status chosen by the underlying extractor.
        status: StatusCode,
        /// Extractor's explanation, safe to show to the client.
        message: String,
    },
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, Option<&'static str>) {
        const INGEST_FAILED: &str = "Error processing webhook event";

        match self {
            Self::Ingest(IngestError::InvalidSignature) => (
                StatusCode::UNAUTHORIZED,
                "Invalid webhook signature".to_owned(),
                None,
            ),
            Self::Ingest(IngestError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INGEST_FAILED.to_owned(),
                Some("persistence_failure"),
            ),
            Self::Ingest(IngestError::Dispatch { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INGEST_FAILED.to_owned(),
                Some("dispatch_failure"),
            ),
            Self::Ingest(IngestError::MarkProcessed { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INGEST_FAILED.to_owned(),
                Some("mark_processed_failure"),
            ),
            Self::Domain(err @ DomainError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string(), Some("not_found"))
            }
            Self::Domain(err @ DomainError::AlreadyProcessed(_)) => {
                (StatusCode::CONFLICT, err.to_string(), Some("already_processed"))
            }
            Self::Domain(err @ DomainError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string(), Some("validation_error"))
            }
            Self::Rejected { status, message } => {
                (*status, message.clone(), Some("invalid_request"))
            }
            Self::Domain(DomainError::Infrastructure(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
                Some("infrastructure_error"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = self.parts();
        if status.is_server_error() {
            if let Self::Domain(err) = &self {
                tracing::error!(error = %err, "request failed");
            }
        }

        let body = ErrorBody {
            success: false,
            message,
            error,
        };

        (status, Json(body)).into_response()
    }
}
