//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（本番・開発）、Noop（リレーなしのローカル実行）
//! - **設定で切替**: `NOTIFICATION_BACKEND` でランタイム選択（選択はアプリ層で行う）

mod noop;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use otp_relay_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
pub use smtp::{SmtpNotificationSender, SmtpSettings, SmtpTlsMode};

/// メール送信トレイト
///
/// 1 回の呼び出しで 1 回だけ送信を試みる。リトライは行わない。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError>;

    /// 送信先リレーへの疎通を確認する
    ///
    /// 確認手段を持たない実装は常に成功する。
    async fn verify_connection(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}
