//! # HTTP ハンドラ
//!
//! OTP Relay の HTTP エンドポイントを実装する。
//!
//! - `GET /health` - ヘルスチェック（レート制限対象外）
//! - `POST /send-otp` - OTP メールの送信
//! - それ以外 - 404（ルーターの fallback）

pub mod health;
pub mod otp;

pub use health::{HealthState, health_check};
pub use otp::{OtpState, send_otp};

use crate::error::ApiError;

/// 未定義ルートの fallback ハンドラ
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
