//! # OTP Relay サーバー
//!
//! 呼び出し元が生成したワンタイムパスコード（OTP）を受け取り、
//! SMTP リレー経由でメール送信する API サーバー。
//!
//! ## リクエストの流れ
//!
//! ```text
//! Request ID 付与 → レート制限 → 入力検証 → SMTP 送信 → レスポンス封筒
//! ```
//!
//! ## 環境変数
//!
//! `.env` ファイルがあれば読み込む。主なもの:
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `APP_ENV` | No | `development` / `production` / `test`（デフォルト: `development`） |
//! | `OTP_RELAY_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `OTP_RELAY_PORT` | No | ポート番号（デフォルト: `3000`） |
//! | `SMTP_HOST` | **Yes**（smtp） | SMTP リレーのホスト |
//! | `MAIL_FROM` | **Yes** | 送信元アドレス |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `noop`（デフォルト: `smtp`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//!
//! 全項目は [`otp_relay::config::AppConfig`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（Mailpit 等のローカル SMTP を使う）
//! SMTP_HOST=localhost SMTP_PORT=1025 SMTP_TLS=none MAIL_FROM=no-reply@example.com \
//!   cargo run -p otp-relay
//!
//! # SMTP なしで動作確認
//! NOTIFICATION_BACKEND=noop MAIL_FROM=no-reply@example.com cargo run -p otp-relay
//! ```

use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context as _;
use otp_relay::{
    app_builder::build_app,
    config::{AppConfig, NotificationBackend},
    middleware::spawn_expiry_sweep,
    shutdown::{serve_with_grace, shutdown_signal},
};
use otp_relay_domain::{clock::SystemClock, rate_limit::RateLimiter};
use otp_relay_infra::{NoopNotificationSender, NotificationSender, SmtpNotificationSender};
use otp_relay_shared::observability::TracingConfig;
use tokio::{net::TcpListener, sync::watch};

/// OTP Relay サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. アプリケーション設定の読み込み
/// 3. トレーシングの初期化
/// 4. 送信実装・レート制限器の初期化
/// 5. ルーターの構築
/// 6. HTTP サーバーの起動と graceful shutdown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started_at = Instant::now();

    // .env ファイルを読み込む（存在する場合）
    // 本番環境では .env ファイルは使用せず、環境変数を直接設定する
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("設定の読み込みに失敗しました")?;

    // トレーシング初期化
    let _tracing_guard = otp_relay_shared::observability::init_tracing(TracingConfig::new(
        "otp-relay",
        config.log_format,
    ))
    .entered();

    tracing::info!(
        environment = %config.environment,
        backend = %config.notification_backend,
        rate_limit.window_secs = config.rate_limit.window.as_secs(),
        rate_limit.max_requests = config.rate_limit.max_requests,
        "OTP Relay サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // 送信実装の選択
    let sender: Arc<dyn NotificationSender> = match config.notification_backend {
        NotificationBackend::Smtp => {
            let settings = config
                .smtp
                .as_ref()
                .context("SMTP バックエンドには SMTP 設定が必要です")?;
            tracing::info!(
                smtp.host = %settings.host,
                smtp.port = settings.port,
                smtp.tls = %settings.tls,
                "SMTP 送信を使用します"
            );
            Arc::new(
                SmtpNotificationSender::new(settings, &config.mail_from)
                    .context("SMTP 送信の初期化に失敗しました")?,
            )
        }
        NotificationBackend::Noop => {
            tracing::warn!("Noop 送信を使用します（メールは送信されません）");
            Arc::new(NoopNotificationSender)
        }
    };

    // 疎通確認の失敗では起動を止めない
    if config.smtp_verify_on_startup {
        match sender.verify_connection().await {
            Ok(()) => tracing::info!("SMTP リレーへの疎通を確認しました"),
            Err(e) => tracing::warn!("SMTP リレーへの疎通確認に失敗しました: {}", e),
        }
    }

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit,
        config.rate_limit_max_clients,
        Arc::new(SystemClock),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let sweeper = spawn_expiry_sweep(
        limiter.clone(),
        config.rate_limit_sweep_interval,
        shutdown_rx,
    );

    let app = build_app(&config, sender, limiter, started_at)
        .context("テンプレートの初期化に失敗しました")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{addr} へのバインドに失敗しました"))?;
    tracing::info!("OTP Relay サーバーが起動しました: {}", addr);

    serve_with_grace(
        listener,
        app,
        shutdown_signal(),
        config.shutdown_grace,
        shutdown_tx,
    )
    .await?;

    if let Err(e) = sweeper.await {
        tracing::warn!("レート制限の掃除タスクが異常終了しました: {}", e);
    }

    tracing::info!("OTP Relay サーバーを停止しました");
    Ok(())
}
