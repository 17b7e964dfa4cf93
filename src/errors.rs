use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::errors::{DomainError, ErrorKind};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A request body or query string that could not be deserialized.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Domain(e) => e.code(),
            AppError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Internal details are logged, never returned to the client.
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::InvalidState | ErrorKind::InsufficientStock | ErrorKind::Conflict => {
                    StatusCode::CONFLICT
                }
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("{} ({})", self, status);
        }
        HttpResponse::build(status).json(ErrorBody {
            status: status.as_u16(),
            code: self.code().to_string(),
            message: self.public_message(),
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}
