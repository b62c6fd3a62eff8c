//! # OTP Relay 設定
//!
//! 環境変数から OTP Relay サーバーの設定を読み込む。
//!
//! 環境変数を読むのはこのモジュールだけとし、起動時に 1 度だけ [`AppConfig`] を構築する。
//! 値の取得元は [`AppConfig::from_lookup`] に関数として渡せるため、
//! テストではプロセスの環境変数を書き換えずに検証できる。

use std::{env, fmt::Display, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use otp_relay_domain::rate_limit::RateLimitPolicy;
use otp_relay_infra::{SmtpSettings, SmtpTlsMode};
use otp_relay_shared::observability::LogFormat;
use thiserror::Error;

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
   #[default]
   Development,
   Production,
   Test,
}

impl Environment {
   /// 環境ごとのレート制限プリセット
   ///
   /// 本番のみ厳しいプリセットを使う。
   pub fn default_rate_limit_policy(self) -> RateLimitPolicy {
      match self {
         Self::Production => RateLimitPolicy::strict(),
         Self::Development | Self::Test => RateLimitPolicy::permissive(),
      }
   }
}

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NotificationBackend {
   /// SMTP リレー経由で送信
   #[default]
   Smtp,
   /// 送信せずログ出力のみ
   Noop,
}

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
   #[error("{0} が設定されていません")]
   Missing(&'static str),

   #[error("{var} の値が不正です ({value:?}): {reason}")]
   Invalid {
      var:    &'static str,
      value:  String,
      reason: String,
   },
}

/// OTP Relay サーバーの設定
#[derive(Debug, Clone)]
pub struct AppConfig {
   /// 実行環境
   pub environment: Environment,
   /// バインドアドレス
   pub host: String,
   /// ポート番号
   pub port: u16,
   /// メール送信バックエンド
   pub notification_backend: NotificationBackend,
   /// SMTP 接続設定（`smtp` バックエンドのときのみ `Some`）
   pub smtp: Option<SmtpSettings>,
   /// 起動時に SMTP リレーへの疎通を確認するか
   pub smtp_verify_on_startup: bool,
   /// 送信元アドレス
   pub mail_from: String,
   /// メール件名・本文に埋め込むアプリケーション名
   pub app_name: String,
   /// メール本文に記載する OTP の有効期間（分）
   pub otp_expiry_minutes: u32,
   /// 1 件の送信全体に許す時間
   pub dispatch_timeout: Duration,
   /// CORS で許可するオリジン（空なら環境に応じた既定）
   pub cors_allowed_origins: Vec<HeaderValue>,
   /// レート制限ポリシー
   pub rate_limit: RateLimitPolicy,
   /// レート制限で追跡するクライアント数の上限
   pub rate_limit_max_clients: usize,
   /// 期限切れエントリの掃除間隔
   pub rate_limit_sweep_interval: Duration,
   /// `X-Forwarded-For` の先頭をクライアント識別子として信頼するか
   pub trust_proxy: bool,
   /// シャットダウン時に処理中リクエストの完了を待つ時間
   pub shutdown_grace: Duration,
   /// ログ出力形式
   pub log_format: LogFormat,
}

impl AppConfig {
   /// 環境変数から設定を読み込む
   pub fn from_env() -> Result<Self, ConfigError> {
      Self::from_lookup(|key| env::var(key).ok())
   }

   /// 任意の取得関数から設定を読み込む
   ///
   /// 空文字列は未設定として扱う。
   pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
   where
      F: Fn(&str) -> Option<String>,
   {
      let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

      let environment: Environment = parse_or(get("APP_ENV"), "APP_ENV", Environment::default())?;
      let notification_backend: NotificationBackend = parse_or(
         get("NOTIFICATION_BACKEND"),
         "NOTIFICATION_BACKEND",
         NotificationBackend::default(),
      )?;

      let smtp = match notification_backend {
         NotificationBackend::Smtp => Some(SmtpSettings {
            host:     get("SMTP_HOST").ok_or(ConfigError::Missing("SMTP_HOST"))?,
            port:     parse_or(get("SMTP_PORT"), "SMTP_PORT", 587)?,
            username: get("SMTP_USERNAME"),
            password: get("SMTP_PASSWORD"),
            tls:      parse_or(get("SMTP_TLS"), "SMTP_TLS", SmtpTlsMode::StartTls)?,
            timeout:  Duration::from_secs(positive(get("SMTP_TIMEOUT_SECS"), "SMTP_TIMEOUT_SECS", 10)?),
         }),
         NotificationBackend::Noop => None,
      };

      let preset = environment.default_rate_limit_policy();
      let window_ms = positive(
         get("RATE_LIMIT_WINDOW_MS"),
         "RATE_LIMIT_WINDOW_MS",
         preset.window.as_millis() as u64,
      )?;
      let max_requests = positive(
         get("RATE_LIMIT_MAX_REQUESTS"),
         "RATE_LIMIT_MAX_REQUESTS",
         u64::from(preset.max_requests),
      )?;
      let max_requests = u32::try_from(max_requests).map_err(|e| ConfigError::Invalid {
         var:    "RATE_LIMIT_MAX_REQUESTS",
         value:  max_requests.to_string(),
         reason: e.to_string(),
      })?;

      Ok(Self {
         environment,
         host: get("OTP_RELAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
         port: parse_or(get("OTP_RELAY_PORT"), "OTP_RELAY_PORT", 3000)?,
         notification_backend,
         smtp,
         smtp_verify_on_startup: get("SMTP_VERIFY_ON_STARTUP").is_some_and(|v| parse_flag(&v)),
         mail_from: get("MAIL_FROM").ok_or(ConfigError::Missing("MAIL_FROM"))?,
         app_name: get("APP_NAME").unwrap_or_else(|| "OTP Relay".to_string()),
         otp_expiry_minutes: parse_or(get("OTP_EXPIRY_MINUTES"), "OTP_EXPIRY_MINUTES", 10)?,
         dispatch_timeout: Duration::from_secs(positive(
            get("DISPATCH_TIMEOUT_SECS"),
            "DISPATCH_TIMEOUT_SECS",
            20,
         )?),
         cors_allowed_origins: parse_origins(get("CORS_ALLOWED_ORIGINS").as_deref())?,
         rate_limit: RateLimitPolicy::new(Duration::from_millis(window_ms), max_requests),
         rate_limit_max_clients: parse_or(
            get("RATE_LIMIT_MAX_CLIENTS"),
            "RATE_LIMIT_MAX_CLIENTS",
            10_000,
         )?,
         rate_limit_sweep_interval: Duration::from_secs(positive(
            get("RATE_LIMIT_SWEEP_SECS"),
            "RATE_LIMIT_SWEEP_SECS",
            60,
         )?),
         trust_proxy: get("TRUST_PROXY").is_some_and(|v| parse_flag(&v)),
         shutdown_grace: Duration::from_secs(parse_or(
            get("SHUTDOWN_GRACE_SECS"),
            "SHUTDOWN_GRACE_SECS",
            10,
         )?),
         log_format: get("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default(),
      })
   }
}

/// 値があればパースし、無ければ既定値を返す
fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
   T: FromStr,
   T::Err: Display,
{
   match value {
      None => Ok(default),
      Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
         var,
         value: raw,
         reason: e.to_string(),
      }),
   }
}

/// 1 以上の整数としてパースする
fn positive(value: Option<String>, var: &'static str, default: u64) -> Result<u64, ConfigError> {
   let parsed = parse_or(value, var, default)?;
   if parsed == 0 {
      return Err(ConfigError::Invalid {
         var,
         value:  parsed.to_string(),
         reason: "1 以上である必要があります".to_string(),
      });
   }
   Ok(parsed)
}

/// `true` / `1` を有効として扱う
fn parse_flag(value: &str) -> bool {
   let value = value.trim();
   value.eq_ignore_ascii_case("true") || value == "1"
}

/// カンマ区切りのオリジン一覧をパースする
fn parse_origins(value: Option<&str>) -> Result<Vec<HeaderValue>, ConfigError> {
   value
      .unwrap_or_default()
      .split(',')
      .map(str::trim)
      .filter(|origin| !origin.is_empty())
      .map(|origin| {
         HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
            var:    "CORS_ALLOWED_ORIGINS",
            value:  origin.to_string(),
            reason: e.to_string(),
         })
      })
      .collect()
}
