//! Append-only writes to the Firebase Realtime Database REST API.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ClientSubmission, SignRequestCreated, SubmissionRecord};

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("request to realtime database failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("realtime database answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

// Reply to a POST: the generated push key
#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Clone)]
pub struct FirebaseStore {
    client: reqwest::Client,
    database_url: String,
    collection: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl FirebaseStore {
    pub fn new(
        client: reqwest::Client,
        database_url: &str,
        collection: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            collection: collection.trim_matches('/').to_string(),
            auth_token,
            timeout,
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/{}.json", self.database_url, self.collection)
    }

    /// Appends one submission record and returns its push key.
    ///
    /// `createdAt` is a server-side timestamp placeholder, resolved by
    /// Firebase when the write lands.
    pub async fn append(
        &self,
        submission: &ClientSubmission,
        created: &SignRequestCreated,
    ) -> Result<String, PersistError> {
        let record = SubmissionRecord {
            submission,
            digio_id: &created.id,
            agreement_status: &created.agreement_status,
            file_name: &created.file_name,
            created_at: json!({ ".sv": "timestamp" }),
        };

        // own deadline so a stalled database cannot hold the reply
        let mut request = self
            .client
            .post(self.collection_url())
            .timeout(self.timeout)
            .json(&record);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PersistError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let pushed: PushResponse = res.json().await?;
        Ok(pushed.name)
    }
}
