//! # ミドルウェア
//!
//! OTP Relay 用のミドルウェアを提供する。

mod body_limit;
pub mod rate_limit;
pub mod request_id;
mod security_headers;

pub use body_limit::payload_too_large_envelope;
pub use rate_limit::{RateLimitState, rate_limit, spawn_expiry_sweep};
pub use security_headers::security_headers;
