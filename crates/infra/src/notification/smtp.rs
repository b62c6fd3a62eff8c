//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー、TLS なし）に接続する。

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{AsyncSmtpTransportBuilder, authentication::Credentials},
};
use otp_relay_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};

use super::NotificationSender;

/// SMTP 接続の TLS モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SmtpTlsMode {
    /// 平文（Mailpit 等のローカル SMTP 向け）
    None,
    /// 平文で接続後に STARTTLS で昇格（一般的に 587 番）
    #[strum(serialize = "starttls")]
    StartTls,
    /// 接続時から TLS（一般的に 465 番）
    Tls,
}

/// SMTP 接続設定
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host:     String,
    pub port:     u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls:      SmtpTlsMode,
    /// 接続・各コマンドのタイムアウト
    pub timeout:  Duration,
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// 接続は lettre のコネクションプールが管理する。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `settings`: SMTP リレーの接続設定
    /// - `from_address`: 送信元（`"OTP Relay <no-reply@example.com>"` 形式も可）
    pub fn new(settings: &SmtpSettings, from_address: &str) -> Result<Self, NotificationError> {
        let from: Mailbox = from_address
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("送信元アドレス不正: {e}")))?;

        let mut builder = transport_builder(settings)?
            .port(settings.port)
            .timeout(Some(settings.timeout));

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// 送信元アドレスのドメインで Message-ID を採番する
    fn next_message_id(&self) -> String {
        format!("<{}@{}>", uuid::Uuid::now_v7(), self.from.email.domain())
    }
}

fn transport_builder(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransportBuilder, NotificationError> {
    let host = settings.host.as_str();
    match settings.tls {
        // builder_dangerous: TLS なしで接続
        SmtpTlsMode::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        SmtpTlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::Transport(format!("STARTTLS 設定失敗: {e}"))),
        SmtpTlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotificationError::Transport(format!("TLS 設定失敗: {e}"))),
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let message_id = self.next_message_id();

        let message = Message::builder()
            .from(self.from.clone())
            .to(email
                .to
                .parse()
                .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::MessageBuild(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        tracing::debug!(
            smtp.code = %response.code(),
            smtp.message_id = %message_id,
            "SMTP リレーがメッセージを受理"
        );

        Ok(DeliveryReceipt { message_id })
    }

    async fn verify_connection(&self) -> Result<(), NotificationError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotificationError::Transport(
                "SMTP リレーが応答しません".to_string(),
            )),
            Err(e) => Err(NotificationError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    fn settings(tls: SmtpTlsMode) -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            tls,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotificationSender>();
    }

    #[test]
    fn tlsモードを文字列から解釈できる() {
        assert_eq!(SmtpTlsMode::from_str("none").unwrap(), SmtpTlsMode::None);
        assert_eq!(SmtpTlsMode::from_str("STARTTLS").unwrap(), SmtpTlsMode::StartTls);
        assert_eq!(SmtpTlsMode::from_str("tls").unwrap(), SmtpTlsMode::Tls);
        assert!(SmtpTlsMode::from_str("ssl").is_err());
    }

    #[tokio::test]
    async fn 不正な送信元アドレスはinvalid_addressになる() {
        let result = SmtpNotificationSender::new(&settings(SmtpTlsMode::None), "not an address");
        assert!(matches!(result, Err(NotificationError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn message_idは送信元ドメインを使う() {
        let sender = SmtpNotificationSender::new(
            &settings(SmtpTlsMode::None),
            "OTP Relay <no-reply@mail.example.com>",
        )
        .unwrap();

        let id = sender.next_message_id();
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@mail.example.com>"));
    }

    #[tokio::test]
    async fn 接続できないリレーへの送信はtransportエラーになる() {
        // 127.0.0.1:9 (discard) は通常リッスンされていない
        let mut settings = settings(SmtpTlsMode::None);
        settings.host = "127.0.0.1".to_string();
        settings.port = 9;
        settings.timeout = Duration::from_secs(2);
        let sender = SmtpNotificationSender::new(&settings, "no-reply@example.com").unwrap();

        let email = EmailMessage {
            to:        "user@example.com".to_string(),
            subject:   "件名".to_string(),
            html_body: "<p>本文</p>".to_string(),
            text_body: "本文".to_string(),
        };

        let result = sender.send_email(&email).await;
        assert!(matches!(result, Err(NotificationError::Transport(_))));
    }
}
