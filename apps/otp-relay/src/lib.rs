//! # OTP Relay ライブラリ
//!
//! OTP 配送 API サーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: State の初期化とルーター・ミドルウェアの構築
//! - `config`: 環境変数からの設定読み込み
//! - `error`: API エラーとレスポンス封筒への変換
//! - `handler`: HTTP ハンドラ
//! - `middleware`: ミドルウェア（レート制限、Request ID、セキュリティヘッダー）
//! - `shutdown`: Graceful shutdown
//! - `usecase`: OTP メールの生成と送信

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod shutdown;
pub mod usecase;
