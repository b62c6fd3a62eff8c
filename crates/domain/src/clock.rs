//! # Clock（時刻プロバイダ）
//!
//! `Utc::now()` の直接呼び出しを置き換え、
//! テストで時刻を前進させられるようにするための抽象化。

use chrono::{DateTime, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
   fn now(&self) -> DateTime<Utc>;
}

/// 実際のシステム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
   fn now(&self) -> DateTime<Utc> {
      Utc::now()
   }
}

/// 手動で前進させるテスト用実装
///
/// レート制限のウィンドウ経過を待たずに検証するために使う。
#[cfg(any(test, feature = "test-support"))]
pub struct ManualClock {
   now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-support"))]
impl ManualClock {
   pub fn new(now: DateTime<Utc>) -> Self {
      Self {
         now: std::sync::Mutex::new(now),
      }
   }

   /// 時刻を `delta` だけ進める
   pub fn advance(&self, delta: chrono::TimeDelta) {
      let mut now = self.now.lock().unwrap();
      *now += delta;
   }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for ManualClock {
   fn now(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
   }
}
