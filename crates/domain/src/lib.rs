//! # OTP Relay ドメイン層
//!
//! OTP 送信要求の検証ルール、レート制限、通知メッセージのモデルを定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: メールアドレスと OTP は生成時に検証し、不正な値を型で排除
//! - **I/O を持たない**: SMTP や HTTP の詳細は infra / app 層に置く
//! - **時刻の注入**: 現在時刻は [`clock::Clock`] 経由で取得し、テストで固定できる
//!
//! ## 依存関係の方向
//!
//! ```text
//! app → infra → domain
//!   ↘            ↗
//!      shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメインエラー
//! - [`notification`] - メールメッセージと送信エラー
//! - [`otp`] - OTP 送信要求と入力検証
//! - [`rate_limit`] - クライアント単位の固定ウィンドウレート制限

pub mod clock;
pub mod error;
pub mod notification;
pub mod otp;
pub mod rate_limit;

pub use error::{DomainError, FieldError};
