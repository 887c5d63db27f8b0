use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::metrics::{PERSIST_FAILURES, SUBMISSIONS, SUBMISSION_FAILURES};
use crate::models::{ClientSubmission, SubmitResponse};
use crate::rate_limit::ClientIp;
use crate::state::AppState;
use crate::validation::validate;

pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Extension(client_ip): Extension<ClientIp>,
    payload: Result<Json<ClientSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let result = submit(&state, &client_ip, payload).await;
    if let Err(e) = &result {
        SUBMISSION_FAILURES.inc();
        warn!(status = e.status().as_u16(), error = %e, "submission failed");
    }
    result.map(Json)
}

async fn submit(
    state: &AppState,
    client_ip: &ClientIp,
    payload: Result<Json<ClientSubmission>, JsonRejection>,
) -> Result<SubmitResponse, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    // syntactic checks happen before anything leaves the process
    let submission = validate(payload)?;

    if let Some(recaptcha) = &state.recaptcha {
        recaptcha
            .verify(submission.recaptcha_token.as_deref(), Some(client_ip.0.as_str()))
            .await?;
    }

    let (created, body) = state.digio.create_sign_request(&submission).await?;
    SUBMISSIONS.inc();
    info!(digio_id = %created.id, status = %created.agreement_status, "sign request created");

    // best effort: a failed write is logged, never surfaced
    if let Some(store) = &state.firebase {
        match store.append(&submission, &created).await {
            Ok(key) => info!(key = %key, digio_id = %created.id, "submission stored"),
            Err(e) => {
                PERSIST_FAILURES.inc();
                error!(digio_id = %created.id, error = %e, "failed to store submission");
            }
        }
    }

    Ok(SubmitResponse {
        success: true,
        message: "Agreement sent for signing".to_string(),
        digio_id: created.id,
        agreement_status: created.agreement_status,
        file_name: created.file_name,
        data: body,
    })
}
