//! # エラーレスポンス
//!
//! 公開 API で共通のエラーレスポンス構造体を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はアプリ側の責務（shared に axum 依存を入れない）
//! - よく使うエラー種別は便利コンストラクタで提供し、文言のハードコードを排除
//! - `error` フィールドは固定文言のみ。内部エラーの詳細はログにのみ出力する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 入力検証失敗時の文言
pub const VALIDATION_FAILED: &str = "Validation failed";
/// レート制限超過時の文言
pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
/// メール送信失敗時の文言
pub const DISPATCH_FAILED: &str = "Failed to send verification email. Please try again later.";
/// 未定義ルートの文言
pub const ENDPOINT_NOT_FOUND: &str = "Endpoint not found";
/// ボディサイズ超過時の文言
pub const PAYLOAD_TOO_LARGE: &str = "Request body too large";
/// 予期しないエラーの文言
pub const INTERNAL_ERROR: &str = "Internal server error";

/// フィールド単位のエラー詳細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
   pub field:   String,
   pub message: String,
}

impl ErrorDetail {
   pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
      Self {
         field:   field.into(),
         message: message.into(),
      }
   }
}

/// エラーレスポンス
///
/// `{ "success": false, "error": ..., "requestId": ..., "timestamp": ... }` 形式。
/// `details`（入力検証）と `retryAfter`（レート制限）は該当時のみ出力する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
   pub success:     bool,
   pub error:       String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub details:     Option<Vec<ErrorDetail>>,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub retry_after: Option<u64>,
   pub request_id:  String,
   pub timestamp:   DateTime<Utc>,
}

impl ErrorResponse {
   /// 汎用コンストラクタ
   pub fn new(error: impl Into<String>, request_id: impl Into<String>) -> Self {
      Self {
         success:     false,
         error:       error.into(),
         details:     None,
         retry_after: None,
         request_id:  request_id.into(),
         timestamp:   Utc::now(),
      }
   }

   /// 400 Validation failed
   pub fn validation_failed(details: Vec<ErrorDetail>, request_id: impl Into<String>) -> Self {
      Self {
         details: Some(details),
         ..Self::new(VALIDATION_FAILED, request_id)
      }
   }

   /// 429 Too Many Requests
   pub fn too_many_requests(retry_after_secs: u64, request_id: impl Into<String>) -> Self {
      Self {
         retry_after: Some(retry_after_secs),
         ..Self::new(TOO_MANY_REQUESTS, request_id)
      }
   }

   /// 5xx メール送信失敗
   ///
   /// 送信経路の内部情報を漏らさないため文言は固定。
   pub fn dispatch_failed(request_id: impl Into<String>) -> Self {
      Self::new(DISPATCH_FAILED, request_id)
   }

   /// 404 Not Found
   pub fn not_found(request_id: impl Into<String>) -> Self {
      Self::new(ENDPOINT_NOT_FOUND, request_id)
   }

   /// 413 Payload Too Large
   pub fn payload_too_large(request_id: impl Into<String>) -> Self {
      Self::new(PAYLOAD_TOO_LARGE, request_id)
   }

   /// 500 Internal Server Error
   pub fn internal_error(request_id: impl Into<String>) -> Self {
      Self::new(INTERNAL_ERROR, request_id)
   }
}
