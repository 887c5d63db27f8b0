use serde::{Deserialize, Serialize};
use serde_json::Value;

// Client information form posted by the onboarding page
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientSubmission {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pan: String,
    #[serde(default)]
    pub aadhaar: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub recaptcha_token: Option<String>,
}

// Successful submission reply
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub digio_id: String,
    pub agreement_status: String,
    pub file_name: String,
    pub data: Value,
}

// What Digio hands back for a created sign request (only the fields we keep)
#[derive(Deserialize, Debug, Clone)]
pub struct SignRequestCreated {
    pub id: String,
    #[serde(default)]
    pub agreement_status: String,
    #[serde(default)]
    pub file_name: String,
}

// Record appended to the realtime database
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord<'a> {
    #[serde(flatten)]
    pub submission: &'a ClientSubmission,
    pub digio_id: &'a str,
    pub agreement_status: &'a str,
    pub file_name: &'a str,
    pub created_at: Value,
}
