//! # Graceful shutdown
//!
//! SIGINT / SIGTERM を受けたら新規接続の受け付けを止め、処理中のリクエストに
//! 猶予時間を与えてから終了する。猶予時間を過ぎたリクエストは打ち切る。

use std::{future::IntoFuture, net::SocketAddr, pin::pin, time::Duration};

use axum::Router;
use tokio::{net::TcpListener, signal, sync::watch};

/// シャットダウン信号（Ctrl-C または SIGTERM）を待つ
///
/// シグナルハンドラを登録できない場合はエラーを記録し、その信号は待たない。
pub async fn shutdown_signal() {
   let ctrl_c = async {
      if let Err(e) = signal::ctrl_c().await {
         tracing::error!("Ctrl+C ハンドラの登録に失敗: {}", e);
         std::future::pending::<()>().await;
      }
   };

   #[cfg(unix)]
   let terminate = async {
      match signal::unix::signal(signal::unix::SignalKind::terminate()) {
         Ok(mut sigterm) => {
            sigterm.recv().await;
         }
         Err(e) => {
            tracing::error!("SIGTERM ハンドラの登録に失敗: {}", e);
            std::future::pending::<()>().await;
         }
      }
   };

   #[cfg(not(unix))]
   let terminate = std::future::pending::<()>();

   tokio::select! {
      _ = ctrl_c => {
         tracing::info!("Ctrl+C を受信、シャットダウンを開始します");
      }
      _ = terminate => {
         tracing::info!("SIGTERM を受信、シャットダウンを開始します");
      }
   }
}

/// HTTP サーバーを起動し、`signal` の完了後に猶予付きで停止する
///
/// `signal` が完了すると `notify` に通知し（バックグラウンドタスクの停止用）、
/// 処理中のリクエストを最大 `grace` だけ待つ。
pub async fn serve_with_grace<F>(
   listener: TcpListener,
   app: Router,
   signal: F,
   grace: Duration,
   notify: watch::Sender<()>,
) -> std::io::Result<()>
where
   F: Future<Output = ()>,
{
   let mut server_shutdown = notify.subscribe();
   let server = axum::serve(
      listener,
      app.into_make_service_with_connect_info::<SocketAddr>(),
   )
   .with_graceful_shutdown(async move {
      // 送信側が破棄された場合も停止する
      let _ = server_shutdown.changed().await;
   })
   .into_future();
   let mut server = pin!(server);

   tokio::select! {
      result = &mut server => return result,
      _ = signal => {}
   }

   // 受信側が 1 つも無い場合は Err になるが、通知先が無いだけなので無視する
   let _ = notify.send(());
   tracing::info!(
      grace_secs = grace.as_secs(),
      "新規接続の受け付けを停止、処理中のリクエストの完了を待機"
   );

   match tokio::time::timeout(grace, server).await {
      Ok(result) => result,
      Err(_) => {
         tracing::warn!("猶予時間内に完了しなかったリクエストを打ち切って終了します");
         Ok(())
      }
   }
}
