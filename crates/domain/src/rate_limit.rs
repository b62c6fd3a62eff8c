//! # レート制限
//!
//! クライアント識別子ごとに固定ウィンドウでリクエスト数を数え、許可/拒否を判定する。
//!
//! ## アルゴリズム（固定ウィンドウ）
//!
//! 1. ウィンドウが無い、または `now > window_reset_at` → `count = 1`、
//!    `window_reset_at = now + window` として許可
//! 2. `count < max_requests` → `count += 1` して許可
//! 3. それ以外 → `ceil((window_reset_at - now) / 1s)` 秒後の再試行を指示して拒否
//!
//! 固定ウィンドウのため、ウィンドウ境界をまたぐと最大 `2 × max_requests` の
//! バーストを許す。スライディングウィンドウには変更しない（外部から観測できる
//! スロットリング挙動が変わるため）。
//!
//! ## 並行性
//!
//! テーブル全体を 1 つの `Mutex` で保護し、`check` の read-check-write は
//! ロック内で完結する（ロック保持中に await しない）。同一クライアントからの
//! 同時リクエストが上限を超えて許可されることはない。
//!
//! ## テーブルの上限
//!
//! 期限切れエントリは次回アクセス時に上書きされるほか、[`RateLimiter::sweep_expired`]
//! で一括削除する。さらに `max_tracked_clients` を超える場合は、期限切れを先に、
//! 次に最も早く期限切れになるエントリを追い出す。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;

/// レート制限ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// ウィンドウの長さ
    pub window:       Duration,
    /// ウィンドウあたりの最大リクエスト数
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub const fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    /// 緩いプリセット（開発環境向け）: 60 秒あたり 5 リクエスト
    pub const fn permissive() -> Self {
        Self::new(Duration::from_secs(60), 5)
    }

    /// 厳しいプリセット（本番環境向け）: 15 分あたり 10 リクエスト
    pub const fn strict() -> Self {
        Self::new(Duration::from_secs(15 * 60), 10)
    }
}

/// レート制限の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// 許可。`remaining` は現ウィンドウで残り何回許可されるか
    Allowed { remaining: u32 },
    /// 拒否。`retry_after_secs` 秒後に再試行可能（1 以上）
    Denied { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// クライアントごとのウィンドウ状態
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count:           u32,
    window_reset_at: DateTime<Utc>,
}

impl ClientWindow {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_reset_at
    }
}

/// 固定ウィンドウ方式のレート制限器
///
/// プロセス内で共有するため `Arc<RateLimiter>` として保持する。
pub struct RateLimiter {
    policy:              RateLimitPolicy,
    window:              TimeDelta,
    max_tracked_clients: usize,
    clock:               Arc<dyn Clock>,
    windows:             Mutex<HashMap<String, ClientWindow>>,
}

impl RateLimiter {
    /// 新しいレート制限器を作成する
    ///
    /// `max_tracked_clients` は 1 未満を指定しても 1 として扱う。
    pub fn new(policy: RateLimitPolicy, max_tracked_clients: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            window: TimeDelta::from_std(policy.window).unwrap_or(TimeDelta::MAX),
            max_tracked_clients: max_tracked_clients.max(1),
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// クライアントのリクエストを 1 件数え、許可/拒否を判定する
    pub fn check(&self, client_id: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let max = self.policy.max_requests;
        let mut windows = self.lock_windows();

        match windows.get_mut(client_id) {
            Some(window) if !window.is_expired(now) => {
                if window.count < max {
                    window.count += 1;
                    RateLimitDecision::Allowed {
                        remaining: max - window.count,
                    }
                } else {
                    RateLimitDecision::Denied {
                        retry_after_secs: retry_after_secs(window.window_reset_at - now),
                    }
                }
            }
            Some(window) => {
                *window = self.fresh_window(now);
                RateLimitDecision::Allowed {
                    remaining: max.saturating_sub(1),
                }
            }
            None => {
                if windows.len() >= self.max_tracked_clients {
                    evict_one(&mut windows, now);
                }
                windows.insert(client_id.to_string(), self.fresh_window(now));
                RateLimitDecision::Allowed {
                    remaining: max.saturating_sub(1),
                }
            }
        }
    }

    /// 期限切れのエントリを削除し、削除した件数を返す
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.lock_windows();
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now));
        before - windows.len()
    }

    /// 現在追跡しているクライアント数
    pub fn tracked_clients(&self) -> usize {
        self.lock_windows().len()
    }

    fn fresh_window(&self, now: DateTime<Utc>) -> ClientWindow {
        ClientWindow {
            count:           1,
            window_reset_at: now.checked_add_signed(self.window).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    // 保持中にパニックしても状態は整合しているため、poison は無視して続行する
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 残り時間を秒に切り上げる（最低 1 秒）
fn retry_after_secs(remaining: TimeDelta) -> u64 {
    let millis = remaining.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

/// テーブルが上限に達したときに 1 件以上の空きを作る
fn evict_one(windows: &mut HashMap<String, ClientWindow>, now: DateTime<Utc>) {
    let before = windows.len();
    windows.retain(|_, window| !window.is_expired(now));
    if windows.len() < before {
        return;
    }

    let oldest = windows
        .iter()
        .min_by_key(|(_, window)| window.window_reset_at)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        windows.remove(&key);
    }
}
