//! # テスト用モック送信
//!
//! ユースケース・ハンドラテストで使用するインメモリの `NotificationSender`。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! otp-relay-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
   sync::{
      Arc,
      Mutex,
      atomic::{AtomicUsize, Ordering},
   },
   time::Duration,
};

use async_trait::async_trait;
use otp_relay_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};

use crate::notification::NotificationSender;

#[derive(Debug, Clone)]
enum Behavior {
   Succeed,
   Fail(String),
   Hang(Duration),
}

// ===== MockNotificationSender =====

/// 送信したメールを記録するモック
///
/// `Clone` しても記録先は共有される。テストでは 1 つをアプリに渡し、
/// もう 1 つで [`MockNotificationSender::sent`] / [`MockNotificationSender::attempts`] を確認する。
#[derive(Debug, Clone)]
pub struct MockNotificationSender {
   sent:     Arc<Mutex<Vec<EmailMessage>>>,
   attempts: Arc<AtomicUsize>,
   behavior: Behavior,
}

impl Default for MockNotificationSender {
   fn default() -> Self {
      Self::new()
   }
}

impl MockNotificationSender {
   /// 常に送信に成功するモック
   pub fn new() -> Self {
      Self {
         sent:     Arc::new(Mutex::new(Vec::new())),
         attempts: Arc::new(AtomicUsize::new(0)),
         behavior: Behavior::Succeed,
      }
   }

   /// 常に `NotificationError::Transport(message)` を返すモック
   pub fn failing(message: impl Into<String>) -> Self {
      Self {
         behavior: Behavior::Fail(message.into()),
         ..Self::new()
      }
   }

   /// `delay` だけ待ってから成功するモック（タイムアウト検証用）
   pub fn hanging(delay: Duration) -> Self {
      Self {
         behavior: Behavior::Hang(delay),
         ..Self::new()
      }
   }

   /// 送信に成功したメールの一覧
   pub fn sent(&self) -> Vec<EmailMessage> {
      self.sent.lock().unwrap().clone()
   }

   /// 成否にかかわらず `send_email` が呼ばれた回数
   pub fn attempts(&self) -> usize {
      self.attempts.load(Ordering::SeqCst)
   }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
   async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
      self.attempts.fetch_add(1, Ordering::SeqCst);

      match &self.behavior {
         Behavior::Succeed => {}
         Behavior::Fail(message) => return Err(NotificationError::Transport(message.clone())),
         Behavior::Hang(delay) => tokio::time::sleep(*delay).await,
      }

      let mut sent = self.sent.lock().unwrap();
      sent.push(email.clone());
      Ok(DeliveryReceipt {
         message_id: format!("<mock-{}@localhost>", sent.len()),
      })
   }

   async fn verify_connection(&self) -> Result<(), NotificationError> {
      match &self.behavior {
         Behavior::Fail(message) => Err(NotificationError::Transport(message.clone())),
         _ => Ok(()),
      }
   }
}
