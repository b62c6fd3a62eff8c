//! # OTP Relay エラー定義
//!
//! HTTP API のエラー定義と、axum レスポンスへの変換。
//!
//! エラーからレスポンス封筒への変換はここに集約し、クライアントに返してよい
//! 文言もここで決める。SMTP やパニックの詳細はログにのみ出力する。
//!
//! | エラー種別 | HTTP ステータス |
//! |-----------|----------------|
//! | `Validation` | 400 Bad Request |
//! | `RateLimited` | 429 Too Many Requests |
//! | `DispatchFailed` | 500 Internal Server Error |
//! | `NotFound` | 404 Not Found |
//! | `PayloadTooLarge` | 413 Payload Too Large |
//! | パニック（`internal_error_response`） | 500 Internal Server Error |

use axum::{
   Json,
   http::{StatusCode, header},
   response::{IntoResponse, Response},
};
use otp_relay_domain::{DomainError, FieldError, notification::NotificationError};
use otp_relay_shared::{ErrorDetail, ErrorResponse, event_log::error as log_error};
use thiserror::Error;

use crate::middleware::request_id::current_request_id;

/// OTP Relay で発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
   /// 入力検証エラー（失敗したフィールドをすべて保持）
   #[error("入力検証エラー: {0:?}")]
   Validation(Vec<FieldError>),

   /// レート制限超過
   #[error("レート制限超過: {retry_after_secs} 秒後に再試行可能")]
   RateLimited { retry_after_secs: u64 },

   /// メール送信失敗
   #[error("メール送信失敗: {0}")]
   DispatchFailed(#[from] NotificationError),

   /// 未定義のルート
   #[error("エンドポイントが見つかりません")]
   NotFound,

   /// リクエストボディが上限を超えた
   #[error("リクエストボディが上限を超えています")]
   PayloadTooLarge,
}

impl From<DomainError> for ApiError {
   fn from(err: DomainError) -> Self {
      match err {
         DomainError::Validation(errors) => Self::Validation(errors),
      }
   }
}

impl IntoResponse for ApiError {
   fn into_response(self) -> Response {
      let request_id = current_request_id().unwrap_or_else(|| "-".to_string());

      match self {
         ApiError::Validation(errors) => {
            let details = errors
               .into_iter()
               .map(|e| ErrorDetail::new(e.field, e.message))
               .collect();
            (
               StatusCode::BAD_REQUEST,
               Json(ErrorResponse::validation_failed(details, request_id)),
            )
               .into_response()
         }
         ApiError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(ErrorResponse::too_many_requests(retry_after_secs, request_id)),
         )
            .into_response(),
         ApiError::DispatchFailed(e) => {
            let kind = match e {
               NotificationError::Timeout(_) => log_error::kind::TIMEOUT,
               NotificationError::TemplateFailed(_) => log_error::kind::TEMPLATE,
               _ => log_error::kind::SMTP,
            };
            tracing::error!(
               error.category = log_error::category::EXTERNAL_SERVICE,
               error.kind = kind,
               "メール送信に失敗: {}",
               e
            );
            (
               StatusCode::INTERNAL_SERVER_ERROR,
               Json(ErrorResponse::dispatch_failed(request_id)),
            )
               .into_response()
         }
         ApiError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found(request_id)),
         )
            .into_response(),
         ApiError::PayloadTooLarge => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse::payload_too_large(request_id)),
         )
            .into_response(),
      }
   }
}

/// 500 Internal Server Error の封筒
///
/// パニック時のレスポンスで使う。
pub fn internal_error_response(request_id: impl Into<String>) -> Response {
   (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ErrorResponse::internal_error(request_id)),
   )
      .into_response()
}

#[cfg(test)]
mod tests {
   use std::{
      sync::{Arc, Mutex},
      time::Duration,
   };

   use axum::body::to_bytes;
   use pretty_assertions::assert_eq;
   use serde_json::Value;

   use super::*;

   async fn body_json(response: Response) -> Value {
      let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
      serde_json::from_slice(&bytes).unwrap()
   }

   #[tokio::test]
   async fn test_validationは400とフィールド詳細を返す() {
      let err = ApiError::Validation(vec![
         FieldError::new("email", "Please provide a valid email address"),
         FieldError::new("otp", "OTP must be exactly 6 digits"),
      ]);

      let response = err.into_response();
      assert_eq!(response.status(), StatusCode::BAD_REQUEST);

      let json = body_json(response).await;
      assert_eq!(json["success"], false);
      assert_eq!(json["error"], "Validation failed");
      assert_eq!(json["details"][0]["field"], "email");
      assert_eq!(json["details"][1]["field"], "otp");
   }

   #[tokio::test]
   async fn test_rate_limitedは429とretry_afterヘッダーを返す() {
      let response = ApiError::RateLimited {
         retry_after_secs: 42,
      }
      .into_response();

      assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
      assert_eq!(response.headers()[header::RETRY_AFTER], "42");

      let json = body_json(response).await;
      assert_eq!(json["retryAfter"], 42);
      assert_eq!(
         json["error"],
         "Too many requests. Please try again later."
      );
   }

   #[tokio::test]
   async fn test_dispatch_failedは送信エラーの詳細を返さない() {
      let err = ApiError::DispatchFailed(NotificationError::Transport(
         "535 5.7.8 authentication failed for relay.internal".to_string(),
      ));

      let response = err.into_response();
      assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

      let json = body_json(response).await;
      let text = json.to_string();
      assert!(!text.contains("relay.internal"));
      assert_eq!(
         json["error"],
         "Failed to send verification email. Please try again later."
      );
   }

   #[tokio::test]
   async fn test_timeoutもdispatch_failedとして扱う() {
      let err: ApiError = NotificationError::Timeout(Duration::from_secs(20)).into();
      assert_eq!(
         err.into_response().status(),
         StatusCode::INTERNAL_SERVER_ERROR
      );
   }

   #[tokio::test]
   async fn test_task_localスコープ外ではrequest_idがハイフンになる() {
      let json = body_json(ApiError::NotFound.into_response()).await;
      assert_eq!(json["requestId"], "-");
      assert_eq!(json["error"], "Endpoint not found");
   }

   #[tokio::test]
   async fn test_内部エラーの封筒は固定文言を返す() {
      let response = internal_error_response("req-500");
      assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

      let json = body_json(response).await;
      assert_eq!(json["error"], "Internal server error");
      assert_eq!(json["requestId"], "req-500");
   }

   #[tokio::test]
   async fn test_payload_too_largeは413の封筒を返す() {
      let response = ApiError::PayloadTooLarge.into_response();
      assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

      let json = body_json(response).await;
      assert_eq!(json["success"], false);
      assert_eq!(json["error"], "Request body too large");
      assert!(json["timestamp"].is_string());
   }

   // ===== ログ出力の検証 =====

   /// ERROR レベルのイベントの本文とフィールドを記録する Layer
   #[derive(Clone, Default)]
   struct ErrorCapture {
      events: Arc<Mutex<Vec<String>>>,
   }

   impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCapture {
      fn on_event(
         &self,
         event: &tracing::Event<'_>,
         _ctx: tracing_subscriber::layer::Context<'_, S>,
      ) {
         if *event.metadata().level() != tracing::Level::ERROR {
            return;
         }
         let mut visitor = JoinedFields::default();
         event.record(&mut visitor);
         self.events.lock().unwrap().push(visitor.0);
      }
   }

   #[derive(Default)]
   struct JoinedFields(String);

   impl tracing::field::Visit for JoinedFields {
      fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
         self.0.push_str(&format!("{}={:?} ", field.name(), value));
      }

      fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
         self.0.push_str(&format!("{}={} ", field.name(), value));
      }
   }

   #[tokio::test]
   async fn test_dispatch_failedの詳細は内部ログにだけ出力される() {
      use tracing_subscriber::layer::SubscriberExt;

      let capture = ErrorCapture::default();
      let subscriber = tracing_subscriber::registry().with(capture.clone());
      let err = ApiError::DispatchFailed(NotificationError::Transport(
         "535 5.7.8 authentication failed for relay.internal".to_string(),
      ));

      let response = tracing::subscriber::with_default(subscriber, || err.into_response());

      let events = capture.events.lock().unwrap().clone();
      assert_eq!(events.len(), 1);
      assert!(events[0].contains("relay.internal"));
      assert!(events[0].contains("error.category=external_service"));
      assert!(events[0].contains("error.kind=smtp"));

      let json = body_json(response).await;
      assert!(!json.to_string().contains("relay.internal"));
   }
}
