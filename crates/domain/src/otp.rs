//! # OTP 送信要求
//!
//! クライアントから受け取った OTP 配送要求と、その入力検証を定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 不変条件 |
//! |---|------------|---------|
//! | [`RawOtpRequest`] | 未検証の要求（ワイヤ形式） | なし |
//! | [`EmailAddress`] | 宛先メールアドレス | trim + 小文字化済み、254 文字以内、アドレス文法に合致 |
//! | [`Passcode`] | ワンタイムパスコード | ちょうど 6 桁の ASCII 数字（文字列のまま保持） |
//! | [`OtpRequest`] | 検証済みの要求 | 上記 2 つを満たす |
//!
//! 検証はフィールドごとに独立して行い、失敗したフィールドをすべて返す。
//! OTP は数値として解釈しない（先頭の `0` を保持する）。

use std::{fmt, sync::LazyLock};

use derive_more::Display;
use regex::Regex;
use serde::Deserialize;

use crate::{DomainError, FieldError};

/// メールアドレスの最大長（RFC 5321 のパス長制限）
pub const EMAIL_MAX_LENGTH: usize = 254;
/// ローカル部の最大長
const EMAIL_LOCAL_MAX_LENGTH: usize = 64;
/// OTP の桁数
pub const PASSCODE_LENGTH: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$",
    )
    .expect("メールアドレスの正規表現は静的に正しい")
});

/// 未検証の OTP 送信要求
///
/// JSON ボディ `{ "email": ..., "otp": ... }` をそのまま受け取る。
/// 欠落したフィールドは空文字列として扱い、検証エラーとして報告する。
#[derive(Clone, Default, Deserialize)]
pub struct RawOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp:   String,
}

impl fmt::Debug for RawOtpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOtpRequest")
            .field("email", &self.email)
            .field("otp", &"<redacted>")
            .finish()
    }
}

/// 宛先メールアドレス（値オブジェクト）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// 入力を正規化（trim + 小文字化）して検証する
    pub fn new(value: &str) -> Result<Self, FieldError> {
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(FieldError::new("email", "Email is required"));
        }

        if normalized.len() > EMAIL_MAX_LENGTH {
            return Err(FieldError::new(
                "email",
                format!("Email must be at most {EMAIL_MAX_LENGTH} characters"),
            ));
        }

        let local_ok = normalized
            .split_once('@')
            .is_some_and(|(local, _)| local.len() <= EMAIL_LOCAL_MAX_LENGTH);

        if !local_ok || !EMAIL_PATTERN.is_match(&normalized) {
            return Err(FieldError::new(
                "email",
                "Please provide a valid email address",
            ));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ワンタイムパスコード（値オブジェクト）
///
/// `Debug` / `Display` は値を出力しない。ログに OTP が漏れないようにするため、
/// 値が必要な箇所（メール本文）は [`Passcode::expose`] を明示的に呼ぶ。
#[derive(Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    pub fn new(value: &str) -> Result<Self, FieldError> {
        if value.is_empty() {
            return Err(FieldError::new("otp", "OTP is required"));
        }

        let is_valid =
            value.len() == PASSCODE_LENGTH && value.bytes().all(|b| b.is_ascii_digit());
        if !is_valid {
            return Err(FieldError::new(
                "otp",
                format!("OTP must be exactly {PASSCODE_LENGTH} digits"),
            ));
        }

        Ok(Self(value.to_string()))
    }

    /// パスコードの値を取り出す
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(<redacted>)")
    }
}

/// 検証済みの OTP 送信要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRequest {
    pub email:    EmailAddress,
    pub passcode: Passcode,
}

impl OtpRequest {
    /// 未検証の要求を検証する
    ///
    /// 各フィールドを独立に検証し、失敗したフィールドをすべて
    /// [`DomainError::Validation`] にまとめて返す（email → otp の順）。
    pub fn parse(raw: &RawOtpRequest) -> Result<Self, DomainError> {
        let email = EmailAddress::new(&raw.email);
        let passcode = Passcode::new(&raw.otp);

        match (email, passcode) {
            (Ok(email), Ok(passcode)) => Ok(Self { email, passcode }),
            (email, passcode) => {
                let errors = [email.err(), passcode.err()]
                    .into_iter()
                    .flatten()
                    .collect();
                Err(DomainError::Validation(errors))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn raw(email: &str, otp: &str) -> RawOtpRequest {
        RawOtpRequest {
            email: email.to_string(),
            otp:   otp.to_string(),
        }
    }

    // ===== EmailAddress =====

    #[rstest]
    #[case("user@example.com", "user@example.com")]
    #[case("  User@Example.COM  ", "user@example.com")]
    #[case("a@b.com", "a@b.com")]
    #[case("first.last+tag@sub.example.co.jp", "first.last+tag@sub.example.co.jp")]
    fn test_有効なメールアドレスは正規化されて受理される(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let email = EmailAddress::new(input).unwrap();
        assert_eq!(email.as_str(), expected);
    }

    #[rstest]
    #[case("not-an-email")]
    #[case("bad")]
    #[case("user@")]
    #[case("@example.com")]
    #[case("user@localhost")]
    #[case("user..dots@example.com")]
    #[case(".user@example.com")]
    #[case("user@-example.com")]
    #[case("us er@example.com")]
    fn test_不正なメールアドレスは拒否される(#[case] input: &str) {
        let err = EmailAddress::new(input).unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn test_空のメールアドレスは必須エラー() {
        let err = EmailAddress::new("   ").unwrap_err();
        assert_eq!(err.message, "Email is required");
    }

    #[test]
    fn test_254文字を超えるメールアドレスは拒否される() {
        let domain = format!("{}.com", "a".repeat(63));
        let labels = [domain.as_str(); 4].join(".");
        let long = format!("user@{labels}");
        assert!(long.len() > EMAIL_MAX_LENGTH);

        let err = EmailAddress::new(&long).unwrap_err();
        assert_eq!(err.message, "Email must be at most 254 characters");
    }

    #[test]
    fn test_ローカル部が64文字を超えると拒否される() {
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(EmailAddress::new(&long_local).is_err());
    }

    // ===== Passcode =====

    #[rstest]
    #[case("123456")]
    #[case("000000")]
    #[case("012345")]
    fn test_6桁の数字は受理され先頭のゼロも保持される(#[case] input: &str) {
        let passcode = Passcode::new(input).unwrap();
        assert_eq!(passcode.expose(), input);
    }

    #[rstest]
    #[case("12345")]
    #[case("1234567")]
    #[case("12a456")]
    #[case(" 12345")]
    #[case("１２３４５６")]
    #[case("-12345")]
    fn test_6桁の数字以外は拒否される(#[case] input: &str) {
        let err = Passcode::new(input).unwrap_err();
        assert_eq!(err.field, "otp");
        assert_eq!(err.message, "OTP must be exactly 6 digits");
    }

    #[test]
    fn test_passcodeのdebugは値を出力しない() {
        let passcode = Passcode::new("987654").unwrap();
        let debug = format!("{passcode:?}");
        assert!(!debug.contains("987654"));
    }

    #[test]
    fn test_raw_requestのdebugはotpを出力しない() {
        let debug = format!("{:?}", raw("a@b.com", "987654"));
        assert!(debug.contains("a@b.com"));
        assert!(!debug.contains("987654"));
    }

    // ===== OtpRequest::parse =====

    #[test]
    fn test_parse_有効な要求を受理する() {
        let request = OtpRequest::parse(&raw("user@example.com", "123456")).unwrap();

        assert_eq!(request.email.as_str(), "user@example.com");
        assert_eq!(request.passcode.expose(), "123456");
    }

    #[test]
    fn test_parse_両フィールド不正なら2件のエラーを返す() {
        let err = OtpRequest::parse(&raw("bad", "1")).unwrap_err();

        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "otp"]);
    }

    #[test]
    fn test_parse_片方のみ不正ならそのフィールドだけ返す() {
        let err = OtpRequest::parse(&raw("user@example.com", "12a456")).unwrap_err();

        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "otp");
    }

    #[test]
    fn test_raw_requestは欠落フィールドを空文字列として受け取る() {
        let raw: RawOtpRequest = serde_json::from_str("{}").unwrap();
        let err = OtpRequest::parse(&raw).unwrap_err();

        assert_eq!(err.field_errors().len(), 2);
    }
}
