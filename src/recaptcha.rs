use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;

// siteverify reply
#[derive(Deserialize, Debug)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl RecaptchaVerifier {
    pub fn new(client: reqwest::Client, verify_url: String, secret: String) -> Self {
        Self {
            client,
            verify_url,
            secret,
        }
    }

    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> Result<(), AppError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AppError::CaptchaRejected),
        };

        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let reply: VerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(AppError::CaptchaUnavailable)?
            .json()
            .await
            .map_err(AppError::CaptchaUnavailable)?;

        if !reply.success {
            warn!(codes = ?reply.error_codes, "recaptcha token rejected");
            return Err(AppError::CaptchaRejected);
        }
        Ok(())
    }
}
