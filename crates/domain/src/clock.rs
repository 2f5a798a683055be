//! # Clock
//!
//! 案件の作成・更新日時、通知ログの送信日時、送信スケジュールの次回発火時刻は
//! すべてこのトレイト経由で現在時刻を得る。テストでは固定時刻や tokio の仮想時刻に差し替える。

use chrono::{DateTime, Utc};

/// 現在時刻（UTC）の取得元
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// システム時刻
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 常に同じ時刻を返す
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_system_clockはutcの現在時刻を返す() {
        let before = Utc::now();

        let now = SystemClock.now();

        assert!(before <= now && now <= Utc::now());
    }

    #[test]
    fn test_fixed_clockは渡した時刻を返し続ける() {
        // 月曜 09:00（Weekly の発火時刻）
        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let clock = FixedClock::new(monday);

        assert_eq!(clock.now(), monday);
        assert_eq!(clock.now(), monday);
    }
}
