//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで OTP メールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名パターン**: `[{app_name}] Your verification code`
//! - **問い合わせ用の参照番号**: HTML 本文に Request ID を記載する

use otp_relay_domain::{
    notification::{EmailMessage, NotificationError},
    otp::OtpRequest,
};
use tera::{Context, Tera};

const HTML_TEMPLATE: &str = "otp.html";
const TEXT_TEMPLATE: &str = "otp.txt";

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、`OtpRequest` から `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine:         Tera,
    app_name:       String,
    expiry_minutes: u32,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    /// `.html` のテンプレートは tera の自動エスケープが有効になる。
    pub fn new(app_name: impl Into<String>, expiry_minutes: u32) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (HTML_TEMPLATE, include_str!("../../templates/otp.html")),
                (TEXT_TEMPLATE, include_str!("../../templates/otp.txt")),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self {
            engine,
            app_name: app_name.into(),
            expiry_minutes,
        })
    }

    /// OTP 送信要求からメールメッセージを生成する
    pub fn render(
        &self,
        request: &OtpRequest,
        request_id: &str,
    ) -> Result<EmailMessage, NotificationError> {
        let mut context = Context::new();
        context.insert("app_name", &self.app_name);
        context.insert("otp", request.passcode.expose());
        context.insert("expiry_minutes", &self.expiry_minutes);
        context.insert("request_id", request_id);

        let html_body = self
            .engine
            .render(HTML_TEMPLATE, &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(TEXT_TEMPLATE, &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: request.email.as_str().to_string(),
            subject: format!("[{}] Your verification code", self.app_name),
            html_body,
            text_body,
        })
    }
}
