//! # ボディサイズ超過の封筒化
//!
//! `RequestBodyLimitLayer` が返す 413 はプレーンテキストのため、
//! 他のエラーと同じ JSON 封筒（`requestId` 付き）に置き換える。

use axum::{
   extract::Request,
   http::StatusCode,
   middleware::Next,
   response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// 413 レスポンスを [`ApiError::PayloadTooLarge`] の封筒に置き換える
///
/// `RequestBodyLimitLayer` の外側、`store_request_id` の内側に置く。
pub async fn payload_too_large_envelope(request: Request, next: Next) -> Response {
   let response = next.run(request).await;
   if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
      return ApiError::PayloadTooLarge.into_response();
   }
   response
}
