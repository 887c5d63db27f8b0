use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;

use crate::digio::is_valid_document_id;
use crate::error::AppError;
use crate::state::AppState;

// Provider JSON is returned unmodified, with the provider's status
pub async fn document_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    check_id(&document_id)?;

    let (status, body) = state.digio.document(&document_id).await?;
    Ok((status, Json(body)))
}

pub async fn audit_trail_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    check_id(&document_id)?;

    let (status, body) = state.digio.audit_trail(&document_id).await?;
    Ok((status, Json(body)))
}

fn check_id(document_id: &str) -> Result<(), AppError> {
    if is_valid_document_id(document_id) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid document id".to_string()))
    }
}
