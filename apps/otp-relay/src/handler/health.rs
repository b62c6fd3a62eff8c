//! # ヘルスチェックハンドラ
//!
//! 稼働状態を確認するためのエンドポイント。常に 200 を返す。
//!
//! レスポンス型は [`otp_relay_shared::HealthResponse`] を参照。

use std::{sync::Arc, time::Instant};

use axum::{Json, extract::State};
use otp_relay_shared::HealthResponse;

use crate::{config::Environment, middleware::request_id::current_request_id};

/// ヘルスチェック用の State
pub struct HealthState {
    /// プロセスの起動時刻（稼働時間の算出に使う）
    pub started_at:  Instant,
    pub environment: Environment,
}

/// ヘルスチェックエンドポイント
pub async fn health_check(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.started_at.elapsed().as_secs_f64(),
        state.environment.to_string(),
        current_request_id().unwrap_or_else(|| "-".to_string()),
    ))
}
