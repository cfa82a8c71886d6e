// src/error.rs
use std::any::Any;

use axum::{
    Json,
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::message::ErrorBody;
use crate::services::{upstream::UpstreamError, validator::ValidationError};

pub const UPSTREAM_FAILED_MESSAGE: &str = "upstream chat service failed, please try again later";
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("upstream exhausted: {last_error}")]
    UpstreamExhausted { last_error: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Exhausted { last_error, .. } => AppError::UpstreamExhausted { last_error },
            other => AppError::Unexpected(other.into()),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamExhausted { .. } => StatusCode::BAD_GATEWAY,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(e) => ErrorBody {
                error: e.to_string(),
                details: None,
            },
            AppError::UpstreamExhausted { last_error } => ErrorBody {
                error: UPSTREAM_FAILED_MESSAGE.to_string(),
                details: Some(last_error),
            },
            AppError::Unexpected(e) => {
                error!("unhandled error while serving request: {e:#}");
                ErrorBody {
                    error: INTERNAL_ERROR_MESSAGE.to_string(),
                    details: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`: same 500 body as [`AppError::Unexpected`].
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("handler panicked: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
            details: None,
        }),
    )
        .into_response()
}
