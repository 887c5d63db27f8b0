mod document;
mod health;
mod metrics;
mod submit;

pub use document::{audit_trail_handler, document_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use submit::submit_handler;
