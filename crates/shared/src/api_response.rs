//! # 成功レスポンスエンベロープ
//!
//! 公開 API の成功時レスポンス形式
//! `{ "success": true, "message": ..., "timestamp": ..., "requestId": ... }` を提供する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 公開 API の成功レスポンス型
///
/// 失敗時は [`ErrorResponse`](crate::ErrorResponse) を使用する。
/// どちらも `requestId` に同じリクエストの Request ID を載せる。
///
/// ## 使用例
///
/// ```
/// use otp_relay_shared::ApiResponse;
///
/// let response = ApiResponse::new("OTP sent successfully", "req-1");
/// assert!(response.success);
/// assert_eq!(response.request_id, "req-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success:    bool,
    pub message:    String,
    pub timestamp:  DateTime<Utc>,
    pub request_id: String,
}

impl ApiResponse {
    /// 現在時刻で新しい `ApiResponse` を作成する
    pub fn new(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            success:    true,
            message:    message.into(),
            timestamp:  Utc::now(),
            request_id: request_id.into(),
        }
    }
}
