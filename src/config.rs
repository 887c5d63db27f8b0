use clap::Parser;
use std::fs::read_to_string;
use std::time::Duration;

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "advisory-gateway")]
#[command(about = "Client onboarding backend: Digio sign requests, Firebase records, per-IP rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Origins allowed by CORS (comma-separated, "*" for any)
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "http://localhost:3000")]
    pub allowed_origins: String,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 100)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW_SECS", default_value_t = 900)]
    pub rate_window: u64,

    // How often expired limiter entries are swept, 0 disables the sweeper
    #[arg(long, env = "RATE_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub rate_sweep_interval: u64,

    // IPs that are always rejected (comma-separated)
    #[arg(long, env = "IP_BLACKLIST", default_value = "")]
    pub blacklist: String,

    // Take the client IP from X-Forwarded-For
    #[arg(long, env = "TRUST_PROXY", default_value_t = false)]
    pub trust_proxy: bool,

    #[arg(long, env = "DIGIO_BASE_URL", default_value = "https://ext.digio.in:444")]
    pub digio_base_url: String,

    #[arg(long, env = "DIGIO_CLIENT_ID")]
    pub digio_client_id: String,

    #[arg(long, env = "DIGIO_CLIENT_SECRET", hide_env_values = true)]
    pub digio_client_secret: String,

    // Template used to render the client agreement
    #[arg(long, env = "DIGIO_TEMPLATE_KEY")]
    pub digio_template_key: String,

    #[arg(long, env = "DIGIO_EXPIRE_DAYS", default_value_t = 10)]
    pub digio_expire_days: u32,

    // Realtime database root, persistence is off when unset
    #[arg(long, env = "FIREBASE_DATABASE_URL")]
    pub firebase_database_url: Option<String>,

    #[arg(long, env = "FIREBASE_AUTH_TOKEN", hide_env_values = true)]
    pub firebase_auth_token: Option<String>,

    // File holding the database token (wins over --firebase-auth-token)
    #[arg(long, env = "FIREBASE_TOKEN_FILE")]
    pub firebase_token_file: Option<String>,

    #[arg(long, env = "FIREBASE_COLLECTION", default_value = "clientSubmissions")]
    pub firebase_collection: String,

    // Cap on the best-effort database write, in milliseconds
    #[arg(long, env = "FIREBASE_TIMEOUT_MS", default_value_t = 5000)]
    pub firebase_timeout_ms: u64,

    // reCAPTCHA secret, the captcha gate is off when unset
    #[arg(long, env = "RECAPTCHA_SECRET", hide_env_values = true)]
    pub recaptcha_secret: Option<String>,

    #[arg(
        long,
        env = "RECAPTCHA_VERIFY_URL",
        default_value = "https://www.google.com/recaptcha/api/siteverify"
    )]
    pub recaptcha_verify_url: String,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn firebase_timeout(&self) -> Duration {
        Duration::from_millis(self.firebase_timeout_ms)
    }

    pub fn origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins)
    }

    pub fn blacklisted_ips(&self) -> Vec<String> {
        split_list(&self.blacklist)
    }

    // Token file first, then the inline token
    pub fn firebase_token(&self) -> std::io::Result<Option<String>> {
        if let Some(path) = &self.firebase_token_file {
            let token = read_to_string(path)?.trim().to_string();
            return Ok(Some(token));
        }
        Ok(self.firebase_auth_token.clone())
    }
}

// "a, b,,c" -> ["a", "b", "c"]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<&'static str> {
        vec![
            "advisory-gateway",
            "--digio-client-id",
            "id",
            "--digio-client-secret",
            "secret",
            "--digio-template-key",
            "TMP1",
        ]
    }

    #[test]
    fn defaults_apply() {
        let args = Args::try_parse_from(base()).unwrap();
        assert_eq!(args.rate_limit, 100);
        assert_eq!(args.rate_window(), Duration::from_secs(900));
        assert!(args.blacklisted_ips().is_empty());
        assert_eq!(args.origins(), vec!["http://localhost:3000".to_string()]);
        assert!(args.firebase_database_url.is_none());
        assert_eq!(args.firebase_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn digio_credentials_are_required() {
        let result = Args::try_parse_from(["advisory-gateway", "--port", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn lists_are_trimmed_and_skip_empties() {
        assert_eq!(
            split_list(" 10.0.0.1, ,10.0.0.2,"),
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
    }

    #[test]
    fn token_file_wins_over_inline_token() {
        let path = std::env::temp_dir().join(format!("fb-token-{}", std::process::id()));
        std::fs::write(&path, "file-token\n").unwrap();

        let mut argv: Vec<&str> = base();
        let path_str = path.to_string_lossy().to_string();
        argv.extend(["--firebase-auth-token", "inline", "--firebase-token-file"]);
        argv.push(path_str.as_str());
        let args = Args::try_parse_from(argv).unwrap();

        assert_eq!(args.firebase_token().unwrap(), Some("file-token".to_string()));
        std::fs::remove_file(path).unwrap();
    }
}
