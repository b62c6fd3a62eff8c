//! # ユースケース層
//!
//! OTP 配送のアプリケーションロジックを実装する。
//!
//! - [`otp`] - OTP メールの生成と送信（タイムアウト・ビジネスイベントログ）
//! - [`template_renderer`] - tera によるメール本文の生成

pub mod otp;
pub mod template_renderer;

pub use otp::OtpDispatcher;
pub use template_renderer::TemplateRenderer;
