//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や SMTP リレーを用意できない環境で使用する。

use async_trait::async_trait;
use otp_relay_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let message_id = format!("noop-{}", uuid::Uuid::now_v7());
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(DeliveryReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_emailはnoopの受領番号を返す() {
        let sender = NoopNotificationSender;
        let email = EmailMessage {
            to:        "test@example.com".to_string(),
            subject:   "テスト件名".to_string(),
            html_body: "<p>テスト</p>".to_string(),
            text_body: "テスト".to_string(),
        };

        let receipt = sender.send_email(&email).await.unwrap();
        assert!(receipt.message_id.starts_with("noop-"));
    }

    #[tokio::test]
    async fn verify_connectionは常に成功する() {
        assert!(NoopNotificationSender.verify_connection().await.is_ok());
    }
}
