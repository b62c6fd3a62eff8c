//! # 通知
//!
//! メール通知に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **1 回だけ送る**: 送信はリトライしない。再試行は呼び出し元の判断に委ねる
//! - **テンプレート分離**: メール生成（TemplateRenderer）と送信（NotificationSender）は分離
//! - **エラー詳細はログのみ**: `NotificationError` の文言はクライアントに返さない

use std::{fmt, time::Duration};

use thiserror::Error;

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 送信元または宛先アドレスが SMTP で扱えない
    #[error("メールアドレスが不正: {0}")]
    InvalidAddress(String),

    /// MIME メッセージの構築に失敗
    #[error("メッセージ構築に失敗: {0}")]
    MessageBuild(String),

    /// SMTP リレーとの通信に失敗（接続拒否、認証失敗、リレー拒否など）
    #[error("SMTP 送信に失敗: {0}")]
    Transport(String),

    /// 送信全体が制限時間内に完了しなかった
    #[error("メール送信がタイムアウト: {0:?}")]
    Timeout(Duration),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
/// 本文には OTP が含まれるため、`Debug` は本文を出力しない。
#[derive(Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

impl fmt::Debug for EmailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailMessage")
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// 送信したメールの `Message-ID`
    pub message_id: String,
}
