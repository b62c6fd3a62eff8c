//! # OTP Relay アプリケーション構築
//!
//! 依存（送信実装・レート制限器）を受け取り、State の初期化とルーター構築を行う。
//! `main.rs` は設定読み込み・インフラ初期化・サーバー起動に集中する。

use std::{any::Any, sync::Arc, time::Instant};

use axum::{
   Router,
   http::{HeaderName, Method, header},
   middleware::{from_fn, from_fn_with_state},
   response::Response,
   routing::{get, post},
};
use otp_relay_domain::{notification::NotificationError, rate_limit::RateLimiter};
use otp_relay_infra::NotificationSender;
use otp_relay_shared::{
   canonical_log::CanonicalLogLineLayer,
   event_log::error as log_error,
   observability::{MakeRequestUuidV7, REQUEST_ID_HEADER, make_request_span},
};
use tower_http::{
   catch_panic::CatchPanicLayer,
   cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
   limit::RequestBodyLimitLayer,
   request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
   trace::TraceLayer,
};

use crate::{
   config::{AppConfig, Environment},
   error::internal_error_response,
   handler::{HealthState, OtpState, health_check, not_found, send_otp},
   middleware::{
      RateLimitState,
      payload_too_large_envelope,
      rate_limit,
      request_id::{current_request_id, store_request_id, strip_client_request_id},
      security_headers,
   },
   usecase::{OtpDispatcher, TemplateRenderer},
};

/// リクエストボディの上限（10 KiB）
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// State の構築とルーター定義を行う
///
/// `started_at` はヘルスチェックの稼働時間の起点。
pub fn build_app(
   config: &AppConfig,
   sender: Arc<dyn NotificationSender>,
   limiter: Arc<RateLimiter>,
   started_at: Instant,
) -> Result<Router, NotificationError> {
   let renderer = TemplateRenderer::new(&config.app_name, config.otp_expiry_minutes)?;

   let health_state = Arc::new(HealthState {
      started_at,
      environment: config.environment,
   });
   let otp_state = Arc::new(OtpState {
      dispatcher: OtpDispatcher::new(sender, renderer, config.dispatch_timeout),
   });

   let routes = Router::new()
      .route("/health", get(health_check))
      .with_state(health_state)
      .route("/send-otp", post(send_otp))
      .with_state(otp_state)
      .fallback(not_found)
      .method_not_allowed_fallback(not_found);

   Ok(with_middleware(routes, config, limiter))
}

/// ルーターに共通ミドルウェアを適用する
///
/// レイヤー順序が重要（下に書いたものが外側）:
///
/// 1. strip_client_request_id（最外）: クライアント提供の X-Request-Id を取り除く
/// 2. SetRequestIdLayer: 毎回 UUID v7 を採番
/// 3. TraceLayer: request_id を含むスパンを作成し、全ログに自動注入
/// 4. CanonicalLogLineLayer: リクエスト完了時にサマリログを 1 行出力
/// 5. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
/// 6. CORS
/// 7. security_headers: セキュリティヘッダーと `Cache-Control: no-store`
/// 8. store_request_id: task-local に保存し、レスポンス本文の requestId に使う
/// 9. payload_too_large_envelope: 413 を JSON 封筒に置き換える
/// 10. RequestBodyLimitLayer: ボディを 10 KiB に制限
/// 11. CatchPanicLayer: パニックを 500 の封筒に変換（task-local の内側に置く）
/// 12. rate_limit（最内）: ヘルスチェック以外をクライアント単位で制限
pub fn with_middleware(router: Router, config: &AppConfig, limiter: Arc<RateLimiter>) -> Router {
   let rate_limit_state = RateLimitState {
      limiter,
      trust_proxy: config.trust_proxy,
   };

   router
      .layer(from_fn_with_state(rate_limit_state, rate_limit))
      .layer(CatchPanicLayer::custom(handle_panic))
      .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
      .layer(from_fn(payload_too_large_envelope))
      .layer(from_fn(store_request_id))
      .layer(from_fn(security_headers))
      .layer(cors_layer(config))
      .layer(PropagateRequestIdLayer::x_request_id())
      .layer(CanonicalLogLineLayer)
      .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
      .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
      .layer(from_fn(strip_client_request_id))
}

/// CORS 設定
///
/// 許可オリジンが設定されていればそれのみ。未設定なら開発環境では全オリジン、
/// それ以外ではクロスオリジンを許可しない。
fn cors_layer(config: &AppConfig) -> CorsLayer {
   let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
   let cors = CorsLayer::new()
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([header::CONTENT_TYPE, request_id.clone()])
      .expose_headers([request_id, header::RETRY_AFTER]);

   if !config.cors_allowed_origins.is_empty() {
      cors.allow_origin(AllowOrigin::list(config.cors_allowed_origins.clone()))
   } else if config.environment == Environment::Development {
      cors.allow_origin(AnyOrigin)
   } else {
      cors
   }
}

/// パニックを 500 レスポンスに変換する
///
/// パニックの内容はログにのみ出力する。
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
   let detail = if let Some(s) = err.downcast_ref::<String>() {
      s.clone()
   } else if let Some(s) = err.downcast_ref::<&str>() {
      (*s).to_string()
   } else {
      "不明なパニック".to_string()
   };

   tracing::error!(
      error.category = log_error::category::INTERNAL,
      error.kind = log_error::kind::PANIC,
      "リクエスト処理中にパニックが発生: {}",
      detail
   );

   internal_error_response(current_request_id().unwrap_or_else(|| "-".to_string()))
}
