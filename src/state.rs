use std::sync::Arc;

use crate::digio::DigioClient;
use crate::firebase::FirebaseStore;
use crate::rate_limit::RateLimiter;
use crate::recaptcha::RecaptchaVerifier;

// app's shared state
pub struct AppState {
    pub digio: DigioClient,
    pub firebase: Option<FirebaseStore>, // None = persistence off
    pub recaptcha: Option<RecaptchaVerifier>, // None = no captcha gate
    pub rate_limiter: Arc<RateLimiter>,
    pub trust_proxy: bool, // read client IP from X-Forwarded-For
}
