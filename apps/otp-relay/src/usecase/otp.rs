//! # OTP 配送ユースケース
//!
//! 検証済みの [`OtpRequest`] からメールを生成し、[`NotificationSender`] で 1 回だけ送信する。
//!
//! ## 設計方針
//!
//! - **全体タイムアウト**: SMTP 側のタイムアウトとは別に、送信全体を
//!   `tokio::time::timeout` で打ち切る
//! - **リトライしない**: 失敗はそのまま呼び出し元に返す
//! - **ビジネスイベント**: 成功・失敗ともに `log_business_event!` で記録する。
//!   宛先は記録するが OTP の値は記録しない

use std::{sync::Arc, time::Duration};

use otp_relay_domain::{
    notification::{DeliveryReceipt, NotificationError},
    otp::OtpRequest,
};
use otp_relay_infra::NotificationSender;
use otp_relay_shared::{event_log::event, log_business_event};

use super::TemplateRenderer;

/// OTP メールの配送
pub struct OtpDispatcher {
    sender:   Arc<dyn NotificationSender>,
    renderer: TemplateRenderer,
    timeout:  Duration,
}

impl OtpDispatcher {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        renderer: TemplateRenderer,
        timeout: Duration,
    ) -> Self {
        Self {
            sender,
            renderer,
            timeout,
        }
    }

    /// OTP メールを送信する
    ///
    /// `timeout` を超えた場合は [`NotificationError::Timeout`] を返す。
    pub async fn send(
        &self,
        request: &OtpRequest,
        request_id: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let result = self.deliver(request, request_id).await;

        match &result {
            Ok(receipt) => {
                log_business_event!(
                    event.category = event::category::OTP,
                    event.action = event::action::OTP_SENT,
                    event.result = event::result::SUCCESS,
                    otp.recipient = %request.email,
                    otp.message_id = %receipt.message_id,
                    "OTP メール送信成功"
                );
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::OTP,
                    event.action = event::action::OTP_FAILED,
                    event.result = event::result::FAILURE,
                    otp.recipient = %request.email,
                    error = %e,
                    "OTP メール送信失敗"
                );
            }
        }

        result
    }

    async fn deliver(
        &self,
        request: &OtpRequest,
        request_id: &str,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let email = self.renderer.render(request, request_id)?;

        tokio::time::timeout(self.timeout, self.sender.send_email(&email))
            .await
            .map_err(|_| NotificationError::Timeout(self.timeout))?
    }
}
