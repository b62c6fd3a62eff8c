//! # Request ID ミドルウェア
//!
//! `SetRequestIdLayer` が決めた Request ID を、ハンドラーやエラー変換から
//! 参照できるようにする。
//!
//! ## 仕組み
//!
//! 1. [`strip_client_request_id`] がクライアント提供の `X-Request-Id` を取り除き、
//!    `SetRequestIdLayer` に毎回 UUID v7 を採番させる
//! 2. [`store_request_id`] ミドルウェアが `SetRequestIdLayer` の設定した
//!    [`RequestId`](tower_http::request_id::RequestId) を task-local に保存する
//! 3. レスポンス封筒の `requestId` / `correlationId` は [`current_request_id`] から取得する
//!
//! これにより、レスポンスヘッダー `x-request-id`、レスポンス本文、ログの
//! `request_id` が常に同じ値になる。

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use otp_relay_shared::observability::{ClientRequestId, REQUEST_ID_HEADER};
use tower_http::request_id::RequestId;

/// ログに残すクライアント提供 ID の最大長
const MAX_CLIENT_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// 現在のリクエストの Request ID を取得する
///
/// task-local スコープ外（テスト等）では `None` を返す。
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// クライアント提供の `X-Request-Id` を取り除くミドルウェア
///
/// `SetRequestIdLayer` より外側に置く。元の値は [`ClientRequestId`] として
/// リクエスト拡張に残し、リクエストスパンの `client_request_id` に出力する。
pub async fn strip_client_request_id(mut request: Request<Body>, next: Next) -> Response {
    let client_request_id = request
        .headers_mut()
        .remove(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok().map(str::to_string))
        .filter(|value| !value.is_empty() && value.len() <= MAX_CLIENT_REQUEST_ID_LEN);

    if let Some(id) = client_request_id {
        request.extensions_mut().insert(ClientRequestId(id));
    }

    next.run(request).await
}

/// Request ID を task-local に保存するミドルウェア
pub async fn store_request_id(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("-")
        .to_string();

    REQUEST_ID.scope(request_id, next.run(request)).await
}
