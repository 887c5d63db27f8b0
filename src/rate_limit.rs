//! Per-IP fixed-window rate limiting.
//!
//! Each IP gets `quota` requests per `window`. The window resets wholesale on
//! the first request after it expires, so a client can burst up to twice the
//! quota across a boundary. Counters live in process memory only.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::metrics::{BLACKLISTED, RATE_LIMITED, RATE_LIMIT_ENTRIES, REQUEST_TOTAL};
use crate::state::AppState;

// Rate limit entry - tracks requests per IP
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

// Resolved client address, attached to requests that pass the limiter
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited,
    Blacklisted,
}

pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    blacklist: HashSet<String>,
    quota: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(quota: u32, window: Duration, blacklist: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: DashMap::new(),
            blacklist: blacklist.into_iter().collect(),
            quota,
            window,
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, ip: &str) -> Decision {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: &str, now: Instant) -> Decision {
        // blacklisted IPs never touch the counters
        if self.blacklist.contains(ip) {
            return Decision::Blacklisted;
        }

        let mut entry = self
            .entries
            .entry(ip.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // window expired..? reset it
        if now.saturating_duration_since(entry.window_start) > self.window {
            entry.count = 1;
            entry.window_start = now;
            return Decision::Allowed;
        }

        if entry.count < self.quota {
            entry.count += 1;
            return Decision::Allowed;
        }

        Decision::Limited
    }

    // Drops entries whose window is over; they would be reset on next use anyway
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        // counted inside retain, the map may grow concurrently
        let window = self.window;
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = now.saturating_duration_since(entry.window_start) <= window;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Client IP: first X-Forwarded-For hop behind a trusted proxy, else the peer
pub fn client_ip(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim())
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();
    let ip = client_ip(&request, state.trust_proxy);

    match state.rate_limiter.check(&ip) {
        Decision::Allowed => {
            RATE_LIMIT_ENTRIES.set(state.rate_limiter.len() as f64);
            request.extensions_mut().insert(ClientIp(ip));
            next.run(request).await
        }
        Decision::Limited => {
            RATE_LIMITED.inc();
            warn!(ip = %ip, limit = state.rate_limiter.quota(), "rate limit exceeded");
            AppError::RateLimited.into_response()
        }
        Decision::Blacklisted => {
            BLACKLISTED.inc();
            warn!(ip = %ip, "rejected blacklisted ip");
            AppError::Blacklisted.into_response()
        }
    }
}

// Background sweep of expired entries
pub async fn sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.cleanup();
        RATE_LIMIT_ENTRIES.set(limiter.len() as f64);
        if removed > 0 {
            debug!(removed, remaining = limiter.len(), "swept expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn limiter(quota: u32) -> RateLimiter {
        RateLimiter::new(quota, Duration::from_secs(60), Vec::new())
    }

    #[test]
    fn allows_up_to_quota_then_limits() {
        let limiter = limiter(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at("1.1.1.1", now), Decision::Allowed);
        }
        assert_eq!(limiter.check_at("1.1.1.1", now), Decision::Limited);
        assert_eq!(limiter.check_at("1.1.1.1", now), Decision::Limited);
    }

    #[test]
    fn ips_are_counted_separately() {
        let limiter = limiter(1);
        let now = Instant::now();

        assert_eq!(limiter.check_at("1.1.1.1", now), Decision::Allowed);
        assert_eq!(limiter.check_at("2.2.2.2", now), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", now), Decision::Limited);
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn window_expiry_resets_counter() {
        let limiter = limiter(2);
        let start = Instant::now();

        limiter.check_at("1.1.1.1", start);
        limiter.check_at("1.1.1.1", start);
        assert_eq!(limiter.check_at("1.1.1.1", start), Decision::Limited);

        let later = start + Duration::from_secs(61);
        assert_eq!(limiter.check_at("1.1.1.1", later), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", later), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", later), Decision::Limited);
    }

    #[test]
    fn window_boundary_allows_double_burst() {
        let limiter = limiter(2);
        let start = Instant::now();

        let end_of_window = start + Duration::from_secs(60);
        assert_eq!(limiter.check_at("1.1.1.1", start), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", end_of_window), Decision::Allowed);

        let just_after = end_of_window + Duration::from_millis(1);
        assert_eq!(limiter.check_at("1.1.1.1", just_after), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", just_after), Decision::Allowed);
        assert_eq!(limiter.check_at("1.1.1.1", just_after), Decision::Limited);
    }

    #[test]
    fn blacklist_ignores_counter_state() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), vec!["6.6.6.6".to_string()]);
        let now = Instant::now();

        assert_eq!(limiter.check_at("6.6.6.6", now), Decision::Blacklisted);
        assert_eq!(
            limiter.check_at("6.6.6.6", now + Duration::from_secs(3600)),
            Decision::Blacklisted
        );
        assert!(limiter.is_empty());
    }

    #[test]
    fn cleanup_drops_only_expired_entries() {
        let limiter = limiter(5);
        let start = Instant::now();

        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(50));

        let removed = limiter.cleanup_at(start + Duration::from_secs(90));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn cleanup_survives_concurrent_inserts() {
        let limiter = Arc::new(limiter(5));
        let start = Instant::now();

        let writer = {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                for i in 0..20_000 {
                    limiter.check_at(&format!("ip-{i}"), start);
                }
            })
        };

        // nothing is expired at `start`, so every sweep removes nothing
        while !writer.is_finished() {
            assert_eq!(limiter.cleanup_at(start), 0);
        }
        writer.join().unwrap();

        assert_eq!(limiter.len(), 20_000);
        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(61)), 20_000);
        assert!(limiter.is_empty());
    }

    #[test]
    fn zero_quota_limits_everything() {
        let limiter = limiter(0);
        assert_eq!(limiter.check("1.1.1.1"), Decision::Limited);
    }

    #[test]
    fn forwarded_header_only_used_when_trusted() {
        let mut request = http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        assert_eq!(client_ip(&request, true), "203.0.113.9");
        assert_eq!(client_ip(&request, false), "127.0.0.1");
    }
}
