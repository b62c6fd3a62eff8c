//! # セキュリティヘッダーミドルウェア
//!
//! 全レスポンスに固定のセキュリティヘッダーを設定する。
//! 動的 API レスポンスはブラウザやプロキシにキャッシュさせない（`Cache-Control: no-store`）。

use axum::{
   extract::Request,
   http::{HeaderValue, header},
   middleware::Next,
   response::Response,
};

/// レスポンスにセキュリティヘッダーを付与する
///
/// ハンドラーが同名のヘッダーを設定していても上書きする。
pub async fn security_headers(request: Request, next: Next) -> Response {
   let mut response = next.run(request).await;
   let headers = response.headers_mut();
   headers.insert(
      header::X_CONTENT_TYPE_OPTIONS,
      HeaderValue::from_static("nosniff"),
   );
   headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
   headers.insert(
      header::REFERRER_POLICY,
      HeaderValue::from_static("no-referrer"),
   );
   headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
   response
}
