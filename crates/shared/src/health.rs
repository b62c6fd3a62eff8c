//! # ヘルスチェック共通型
//!
//! `GET /health` が返すレスポンス型を提供する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ヘルスチェックレスポンス
///
/// `uptime` はプロセス起動からの経過秒数。
/// `correlation_id` はこのリクエストの Request ID。
///
/// ## 使用例
///
/// ```
/// use otp_relay_shared::HealthResponse;
///
/// let response = HealthResponse::ok(12.5, "development", "req-1");
/// assert_eq!(response.status, "OK");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 稼働状態（常に `"OK"`）
    pub status:         String,
    pub timestamp:      DateTime<Utc>,
    /// 稼働時間（秒）
    pub uptime:         f64,
    /// 実行環境（`development` / `production` / `test`）
    pub environment:    String,
    pub correlation_id: String,
}

impl HealthResponse {
    /// 稼働中を表すレスポンスを作成する
    pub fn ok(
        uptime_secs: f64,
        environment: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            status:         "OK".to_string(),
            timestamp:      Utc::now(),
            uptime:         uptime_secs,
            environment:    environment.into(),
            correlation_id: correlation_id.into(),
        }
    }
}
