use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid JSON body: {0}")]
    MalformedPayload(String),

    #[error("reCAPTCHA verification failed")]
    CaptchaRejected,

    #[error("reCAPTCHA verification unavailable")]
    CaptchaUnavailable(#[source] reqwest::Error),

    #[error("Too many requests, please try again later.")]
    RateLimited,

    #[error("Access denied")]
    Blacklisted,

    // Provider answered with a non-success status
    #[error("{message}")]
    Provider {
        status: StatusCode,
        message: String,
        body: Value,
    },

    #[error("Unexpected response from signing provider")]
    BadProviderBody(#[source] serde_json::Error),

    #[error("{context}")]
    Upstream {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::CaptchaRejected => StatusCode::BAD_REQUEST,
            AppError::CaptchaUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Blacklisted => StatusCode::FORBIDDEN,
            AppError::Provider { status, .. } => *status,
            AppError::BadProviderBody(_) | AppError::Upstream { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Provider { body, .. } => json!({
                "success": false,
                "error": self.to_string(),
                "details": body,
            }),
            _ => json!({
                "success": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
