use axum::{http::header::CONTENT_TYPE, response::IntoResponse};

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
}
