use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use application::error::AppError;
use log::error;
use serde::Serialize;
use std::fmt::{self, Display};

/// HTTP 层错误，包装应用层错误并映射到稳定的状态码
#[derive(Debug)]
pub struct ApiError(pub AppError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match &self.0 {
            AppError::NotFound(..) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::PartialWriteFailure { .. } => "PartialWriteFailure",
            AppError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PartialWriteFailure { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(msg) = &self.0 {
            error!("internal error: {}", msg);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            detail: self.0.to_string(),
        })
    }
}
