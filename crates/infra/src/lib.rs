//! # OTP Relay インフラ層
//!
//! 外部システム（SMTP リレー）との通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! ドメイン層で定義したモデル（`EmailMessage` 等）を受け取り、外部システムの
//! 詳細をカプセル化する。ドメイン層はインフラ層に依存しない。
//!
//! ## モジュール構成
//!
//! - [`notification`] - メール送信（SMTP / Noop）
//! - `mock` - テスト用のインメモリ送信（`test-utils` feature）

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;

pub use notification::{
    NoopNotificationSender,
    NotificationSender,
    SmtpNotificationSender,
    SmtpSettings,
    SmtpTlsMode,
};
