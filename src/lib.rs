//! Backend for the advisory firm's website.
//!
//! The onboarding form posts client details to `/api/submit`; they are
//! checked, sent to Digio as a sign request and, when a database is
//! configured, appended to the Firebase Realtime Database. Two read-only
//! endpoints pass Digio's document JSON straight through. Everything under
//! `/api` sits behind a per-IP fixed-window rate limiter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub mod config;
pub mod digio;
pub mod error;
pub mod firebase;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod recaptcha;
pub mod state;
pub mod validation;

use config::Args;
use digio::DigioClient;
use firebase::FirebaseStore;
use handlers::{
    audit_trail_handler, document_handler, health_handler, metrics_handler, submit_handler,
};
use rate_limit::{RateLimiter, rate_limit_middleware};
use recaptcha::RecaptchaVerifier;
use state::AppState;

pub fn build_state(args: &Args) -> std::io::Result<Arc<AppState>> {
    let client = reqwest::Client::new();

    let digio = DigioClient::new(
        client.clone(),
        &args.digio_base_url,
        args.digio_client_id.clone(),
        args.digio_client_secret.clone(),
        args.digio_template_key.clone(),
        args.digio_expire_days,
    );

    let firebase = match &args.firebase_database_url {
        Some(url) => Some(FirebaseStore::new(
            client.clone(),
            url,
            &args.firebase_collection,
            args.firebase_token()?,
            args.firebase_timeout(),
        )),
        None => None,
    };

    let recaptcha = args.recaptcha_secret.as_ref().map(|secret| {
        RecaptchaVerifier::new(
            client.clone(),
            args.recaptcha_verify_url.clone(),
            secret.clone(),
        )
    });

    let rate_limiter = Arc::new(RateLimiter::new(
        args.rate_limit,
        args.rate_window(),
        args.blacklisted_ips(),
    ));

    Ok(Arc::new(AppState {
        digio,
        firebase,
        recaptcha,
        rate_limiter,
        trust_proxy: args.trust_proxy,
    }))
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

pub fn app(state: Arc<AppState>, origins: &[String]) -> Router {
    let api = Router::new()
        .route("/submit", post(submit_handler))
        .route("/document/{id}", get(document_handler))
        .route("/document/{id}/audit", get(audit_trail_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer(origins))
        .with_state(state)
}

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&args)?;

    if args.rate_sweep_interval > 0 {
        let limiter = Arc::clone(&state.rate_limiter);
        let every = Duration::from_secs(args.rate_sweep_interval);
        tokio::spawn(async move {
            rate_limit::sweeper(limiter, every).await;
        });
    }

    let origins = args.origins();
    info!(digio = %state.digio.base_url(), template = %args.digio_template_key, "signing provider");
    info!(
        firebase = args.firebase_database_url.as_deref().unwrap_or("disabled"),
        collection = %args.firebase_collection,
        timeout = ?args.firebase_timeout(),
        "submission store"
    );
    info!(enabled = state.recaptcha.is_some(), "recaptcha gate");
    info!(
        limit = state.rate_limiter.quota(),
        window = ?state.rate_limiter.window(),
        blacklisted = args.blacklisted_ips().len(),
        "rate limit"
    );

    let app = app(state, &origins);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "advisory gateway listening");
    info!(origins = ?origins, "cors");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
