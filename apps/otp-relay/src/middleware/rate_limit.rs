//! # レート制限ミドルウェア
//!
//! クライアント識別子ごとに [`RateLimiter`] で判定し、上限超過なら 429 を返す。
//!
//! ## クライアント識別子
//!
//! - `trust_proxy = true`: `X-Forwarded-For` の先頭要素
//! - それ以外（またはヘッダーが無い）: 接続元 IP（`ConnectInfo`）
//! - どちらも得られない: `"unknown"`（全リクエストで 1 つのバケットを共有する）
//!
//! ヘルスチェック（`/health` 完全一致）は判定しない。

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
   extract::{ConnectInfo, Request, State},
   http::{HeaderName, HeaderValue},
   middleware::Next,
   response::{IntoResponse, Response},
};
use otp_relay_domain::rate_limit::{RateLimitDecision, RateLimiter};
use otp_relay_shared::{event_log::event, log_business_event};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::error::ApiError;

const RATE_LIMIT_LIMIT: &str = "ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "ratelimit-remaining";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";
/// レート制限の対象外とするヘルスチェックのパス
const HEALTH_PATH: &str = "/health";

/// レート制限ミドルウェア用の状態
#[derive(Clone)]
pub struct RateLimitState {
   pub limiter:     Arc<RateLimiter>,
   pub trust_proxy: bool,
}

/// リクエストをクライアント単位で数え、上限超過なら 429 を返すミドルウェア
pub async fn rate_limit(
   State(state): State<RateLimitState>,
   request: Request,
   next: Next,
) -> Response {
   if request.uri().path() == HEALTH_PATH {
      return next.run(request).await;
   }

   let client_id = client_id(&request, state.trust_proxy);

   match state.limiter.check(&client_id) {
      RateLimitDecision::Allowed { remaining } => {
         let mut response = next.run(request).await;
         let headers = response.headers_mut();
         headers.insert(
            HeaderName::from_static(RATE_LIMIT_LIMIT),
            HeaderValue::from(state.limiter.policy().max_requests),
         );
         headers.insert(
            HeaderName::from_static(RATE_LIMIT_REMAINING),
            HeaderValue::from(remaining),
         );
         response
      }
      RateLimitDecision::Denied { retry_after_secs } => {
         log_business_event!(
            event.category = event::category::OTP,
            event.action = event::action::OTP_RATE_LIMITED,
            event.result = event::result::FAILURE,
            client.id = %client_id,
            http.path = %request.uri().path(),
            retry_after_secs,
            "レート制限によりリクエストを拒否"
         );
         ApiError::RateLimited { retry_after_secs }.into_response()
      }
   }
}

/// リクエストからクライアント識別子を決める
fn client_id(request: &Request, trust_proxy: bool) -> String {
   if trust_proxy {
      let forwarded = request
         .headers()
         .get(X_FORWARDED_FOR)
         .and_then(|v| v.to_str().ok())
         .and_then(|v| v.split(',').next())
         .map(str::trim)
         .filter(|v| !v.is_empty());
      if let Some(forwarded) = forwarded {
         return forwarded.to_string();
      }
   }

   request
      .extensions()
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip().to_string())
      .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// 期限切れエントリを定期的に掃除するタスクを起動する
///
/// `shutdown` の送信側が値を送るか破棄されると終了する。
pub fn spawn_expiry_sweep(
   limiter: Arc<RateLimiter>,
   interval: Duration,
   mut shutdown: watch::Receiver<()>,
) -> JoinHandle<()> {
   tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // 初回の tick は即時に完了する
      ticker.tick().await;

      loop {
         tokio::select! {
            _ = ticker.tick() => {
               let removed = limiter.sweep_expired();
               if removed > 0 {
                  tracing::debug!(
                     removed,
                     tracked = limiter.tracked_clients(),
                     "期限切れのレート制限エントリを削除"
                  );
               }
            }
            _ = shutdown.changed() => break,
         }
      }
   })
}
