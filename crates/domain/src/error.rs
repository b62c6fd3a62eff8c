//! # ドメイン層エラー定義
//!
//! 入力検証の失敗を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |

use derive_more::Display;
use thiserror::Error;

/// フィールド単位の検証エラー
///
/// `message` はクライアントにそのまま返す文言。
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{field}: {message}")]
pub struct FieldError {
    /// 入力フィールド名（ワイヤ上の名前: `email`, `otp`）
    pub field:   &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 最初の 1 件ではなく、失敗したすべてのフィールドを保持する。
    #[error("バリデーションエラー: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),
}

impl DomainError {
    /// バリデーションエラーのフィールド一覧を返す
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
