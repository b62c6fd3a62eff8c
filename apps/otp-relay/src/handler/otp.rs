//! # OTP 送信ハンドラ
//!
//! `POST /send-otp` を処理する。
//!
//! レート制限はミドルウェアで通過済みのため、ここでは
//! 入力検証 → 送信 → レスポンス生成のみを行う。

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use otp_relay_domain::{
    FieldError,
    otp::{OtpRequest, RawOtpRequest},
};
use otp_relay_shared::{ApiResponse, event_log::event, log_business_event};

use crate::{error::ApiError, middleware::request_id::current_request_id, usecase::OtpDispatcher};

/// 送信成功時の文言
const OTP_SENT_MESSAGE: &str = "OTP sent successfully";

/// OTP 送信用の State
pub struct OtpState {
    pub dispatcher: OtpDispatcher,
}

/// OTP メールを送信する
///
/// JSON として読めないボディも入力検証エラー（`body` フィールド）として扱う。
/// 読み込み中に上限を超えたボディは 413 とする。
#[tracing::instrument(skip_all)]
pub async fn send_otp(
    State(state): State<Arc<OtpState>>,
    payload: Result<Json<RawOtpRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let request_id = current_request_id().unwrap_or_else(|| "-".to_string());

    let raw = match payload {
        Ok(Json(raw)) => raw,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            log_business_event!(
                event.category = event::category::OTP,
                event.action = event::action::OTP_REJECTED,
                event.result = event::result::FAILURE,
                reason = %rejection.body_text(),
                "OTP 送信要求のボディを解釈できない"
            );
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "Request body must be a JSON object with email and otp fields",
            )]));
        }
    };

    let request = OtpRequest::parse(&raw).inspect_err(|e| {
        log_business_event!(
            event.category = event::category::OTP,
            event.action = event::action::OTP_REJECTED,
            event.result = event::result::FAILURE,
            otp.recipient = %raw.email.trim(),
            reason = %e,
            "OTP 送信要求の入力検証に失敗"
        );
    })?;

    state.dispatcher.send(&request, &request_id).await?;

    Ok(Json(ApiResponse::new(OTP_SENT_MESSAGE, request_id)))
}
