//! Digio e-signature API client.
//!
//! One attempt per call, no retries, reqwest's default timeout. Non-success
//! replies are surfaced with the provider's own status code and body.

use axum::http::StatusCode;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics::PROVIDER_LATENCY;
use crate::models::{ClientSubmission, SignRequestCreated};

const CREATE_FAILED: &str = "Failed to create signing request";
const LOOKUP_FAILED: &str = "Failed to fetch document from signing provider";

#[derive(Clone)]
pub struct DigioClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    template_key: String,
    expire_days: u32,
}

impl DigioClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        client_id: String,
        client_secret: String,
        template_key: String,
        expire_days: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            template_key,
            expire_days,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Body of a template-based sign request for one signer
    pub fn sign_request_body(&self, submission: &ClientSubmission) -> Value {
        json!({
            "signers": [{
                "identifier": submission.email,
                "name": submission.client_name,
                "reason": "Client agreement",
            }],
            "expire_in_days": self.expire_days,
            "display_on_page": "all",
            "notify_signers": true,
            "send_sign_link": true,
            "file_name": agreement_file_name(&submission.client_name),
            "templates": [{
                "template_key": self.template_key,
                "template_values": {
                    "client_name": submission.client_name,
                    "father_name": submission.father_name,
                    "mobile": submission.mobile,
                    "dob": submission.dob,
                    "address": submission.address,
                    "pan": submission.pan,
                    "aadhaar": submission.aadhaar,
                    "email": submission.email,
                    "client_id": submission.client_id.clone().unwrap_or_default(),
                },
            }],
        })
    }

    pub async fn create_sign_request(
        &self,
        submission: &ClientSubmission,
    ) -> Result<(SignRequestCreated, Value), AppError> {
        let url = format!(
            "{}/v2/client/template/multi_templates/create_sign_request",
            self.base_url
        );
        let started = Instant::now();

        let result = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(&self.sign_request_body(submission))
            .send()
            .await;
        PROVIDER_LATENCY.observe(started.elapsed().as_secs_f64());

        let res = result.map_err(|source| AppError::Upstream {
            context: CREATE_FAILED,
            source,
        })?;
        let (status, body) = read_body(res, CREATE_FAILED).await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "digio rejected sign request");
            return Err(provider_error(status, body));
        }

        let created: SignRequestCreated =
            serde_json::from_value(body.clone()).map_err(AppError::BadProviderBody)?;
        debug!(digio_id = %created.id, status = %created.agreement_status, "sign request created");
        Ok((created, body))
    }

    pub async fn document(&self, document_id: &str) -> Result<(StatusCode, Value), AppError> {
        self.passthrough(&format!("/v2/client/document/{document_id}"))
            .await
    }

    pub async fn audit_trail(&self, document_id: &str) -> Result<(StatusCode, Value), AppError> {
        self.passthrough(&format!("/v2/client/document/{document_id}/audit_trail"))
            .await
    }

    // GET with credentials, provider status and JSON handed back as-is
    async fn passthrough(&self, path: &str) -> Result<(StatusCode, Value), AppError> {
        let started = Instant::now();
        let result = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await;
        PROVIDER_LATENCY.observe(started.elapsed().as_secs_f64());

        let res = result.map_err(|source| AppError::Upstream {
            context: LOOKUP_FAILED,
            source,
        })?;
        read_body(res, LOOKUP_FAILED).await
    }
}

// Document ids are opaque provider tokens; keep them to a path-safe alphabet
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn agreement_file_name(client_name: &str) -> String {
    let slug: String = client_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("Client_Agreement_{slug}.pdf")
}

async fn read_body(
    res: reqwest::Response,
    context: &'static str,
) -> Result<(StatusCode, Value), AppError> {
    let status =
        StatusCode::from_u16(res.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let text = res
        .text()
        .await
        .map_err(|source| AppError::Upstream { context, source })?;

    // non-JSON error pages are kept as a string
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

fn provider_error(status: StatusCode, body: Value) -> AppError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(CREATE_FAILED)
        .to_string();
    AppError::Provider {
        status,
        message,
        body,
    }
}
