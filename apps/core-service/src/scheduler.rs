//! # スケジューラ
//!
//! 通知設定の送信頻度に従って定期ステータスバッチを起動するタイマーを管理する。
//!
//! ## 設計方針
//!
//! - **単一スロット**: 稼働中のタイマーは常に高々 1 つ。スロットは
//!   [`ScheduleController`] だけが所有し、非同期 Mutex で保護する
//! - **停止してから差し替え**: 再設定時は旧タイマーに停止を通知し、終了（実行中の
//!   バッチを含む）を待ってから新しいタイマーを起動する
//! - **バッチはタイマータスク内で実行**: 同じタイマーのバッチが重なることはない
//! - **基準時刻**: UTC に固定オフセットを加えた時刻で cron 式を評価する
//!
//! ## 送信頻度と cron 式
//!
//! | 送信頻度 | cron 式（秒 分 時 日 月 曜日） |
//! |---------|------------------------------|
//! | Every 2 Minutes | `0 */2 * * * *` |
//! | Daily | `0 0 9 * * *` |
//! | Weekly | `0 0 9 * * Mon` |
//! | Monthly | `0 0 9 1 * *` |

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use sgfman_domain::{clock::Clock, notification_settings::EmailFrequency};
use sgfman_shared::{event_log::event, log_business_event};
use thiserror::Error;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};

/// スケジュールエラー
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// cron 式の解析に失敗
    #[error("cron 式が不正です: {expression}: {message}")]
    InvalidExpression {
        expression: &'static str,
        message:    String,
    },
}

/// タイマーから起動されるバッチ
#[async_trait]
pub trait ScheduledBatch: Send + Sync {
    /// バッチを 1 回実行する。失敗はバッチ側でログ出力する。
    async fn run_batch(&self);
}

/// 送信頻度に対応する繰り返しルール
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    frequency: EmailFrequency,
    schedule:  Schedule,
}

impl RecurrenceRule {
    pub fn for_frequency(frequency: EmailFrequency) -> Result<Self, ScheduleError> {
        let expression = Self::cron_expression(frequency);
        let schedule =
            Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidExpression {
                expression,
                message: e.to_string(),
            })?;

        Ok(Self {
            frequency,
            schedule,
        })
    }

    /// 送信頻度に対応する cron 式
    pub fn cron_expression(frequency: EmailFrequency) -> &'static str {
        match frequency {
            EmailFrequency::EveryTwoMinutes => "0 */2 * * * *",
            EmailFrequency::Daily => "0 0 9 * * *",
            EmailFrequency::Weekly => "0 0 9 * * Mon",
            EmailFrequency::Monthly => "0 0 9 1 * *",
        }
    }

    pub fn frequency(&self) -> EmailFrequency {
        self.frequency
    }

    /// `after` より後の最初の発火時刻（`after` 自身は含まない）
    pub fn next_after(&self, after: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&offset))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// 稼働中のタイマー
struct ScheduledTask {
    rule:    RecurrenceRule,
    stop_tx: watch::Sender<bool>,
    handle:  JoinHandle<()>,
}

impl ScheduledTask {
    /// 停止を通知し、タスクの終了を待つ
    async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "タイマータスクが異常終了しました");
        }
    }
}

/// スケジュールコントローラ
///
/// タイマーの唯一の所有者。`reschedule` が同時に呼ばれても Mutex で直列化される。
pub struct ScheduleController {
    batch:  Arc<dyn ScheduledBatch>,
    clock:  Arc<dyn Clock>,
    offset: FixedOffset,
    slot:   Mutex<Option<ScheduledTask>>,
}

impl ScheduleController {
    pub fn new(
        batch: Arc<dyn ScheduledBatch>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            batch,
            clock,
            offset,
            slot: Mutex::new(None),
        }
    }

    /// 送信頻度に合わせてタイマーを差し替える
    ///
    /// cron 式の解析に失敗した場合は旧タイマーを残したままエラーを返す。
    pub async fn reschedule(&self, frequency: EmailFrequency) -> Result<(), ScheduleError> {
        let rule = RecurrenceRule::for_frequency(frequency)?;

        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.take() {
            old.stop().await;
        }

        let next_run = rule.next_after(self.clock.now(), self.offset);
        *slot = Some(self.spawn_timer(rule));

        log_business_event!(
            event.category = event::category::SCHEDULE,
            event.action = event::action::SCHEDULE_REPLACED,
            event.entity_type = event::entity_type::SCHEDULED_TASK,
            event.result = event::result::SUCCESS,
            schedule.frequency = frequency.as_str(),
            schedule.cron = RecurrenceRule::cron_expression(frequency),
            schedule.next_run = ?next_run,
            "送信スケジュールを更新"
        );

        Ok(())
    }

    /// 稼働中のタイマーの送信頻度
    pub async fn active_rule(&self) -> Option<EmailFrequency> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|task| task.rule.frequency())
    }

    /// タイマーを停止する（差し替えなし）
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(task) = slot.take() {
            let frequency = task.rule.frequency();
            task.stop().await;

            log_business_event!(
                event.category = event::category::SCHEDULE,
                event.action = event::action::SCHEDULE_STOPPED,
                event.entity_type = event::entity_type::SCHEDULED_TASK,
                event.result = event::result::SUCCESS,
                schedule.frequency = frequency.as_str(),
                "送信スケジュールを停止"
            );
        }
    }

    fn spawn_timer(&self, rule: RecurrenceRule) -> ScheduledTask {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_timer(
            rule.clone(),
            self.offset,
            self.batch.clone(),
            self.clock.clone(),
            stop_rx,
        ));

        ScheduledTask {
            rule,
            stop_tx,
            handle,
        }
    }
}

async fn run_timer(
    rule: RecurrenceRule,
    offset: FixedOffset,
    batch: Arc<dyn ScheduledBatch>,
    clock: Arc<dyn Clock>,
    mut stop_rx: watch::Receiver<bool>,
) {
    // 発火直後に同じ時刻を再度拾わないよう、直前の発火時刻を起点にする
    let mut last_fired: Option<DateTime<Utc>> = None;

    loop {
        let now = clock.now();
        let from = last_fired.map_or(now, |fired| fired.max(now));
        let Some(next) = rule.next_after(from, offset) else {
            tracing::warn!(
                schedule.frequency = rule.frequency().as_str(),
                "次回実行時刻を算出できないためタイマーを終了します"
            );
            break;
        };

        let wait = (next - now).to_std().unwrap_or_default();
        tracing::debug!(next_run = %next, "次回のバッチ実行を待機");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                batch.run_batch().await;
                last_fired = Some(next);
            }
            _ = stop_rx.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tokio::time::Instant;

    use super::*;

    /// tokio の仮想時間に連動する時計
    struct TokioClock {
        base:  DateTime<Utc>,
        start: Instant,
    }

    impl TokioClock {
        fn starting_at(base: DateTime<Utc>) -> Self {
            Self {
                base,
                start: Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + chrono::Duration::from_std(self.start.elapsed()).unwrap()
        }
    }

    #[derive(Default)]
    struct CountingBatch {
        runs: AtomicUsize,
    }

    impl CountingBatch {
        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScheduledBatch for CountingBatch {
        async fn run_batch(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn make_controller(base: DateTime<Utc>) -> (ScheduleController, Arc<CountingBatch>) {
        let batch = Arc::new(CountingBatch::default());
        let controller = ScheduleController::new(
            batch.clone(),
            Arc::new(TokioClock::starting_at(base)),
            FixedOffset::east_opt(0).unwrap(),
        );
        (controller, batch)
    }

    #[rstest]
    #[case(EmailFrequency::EveryTwoMinutes)]
    #[case(EmailFrequency::Daily)]
    #[case(EmailFrequency::Weekly)]
    #[case(EmailFrequency::Monthly)]
    fn test_全ての送信頻度のcron式を解析できる(#[case] frequency: EmailFrequency) {
        let rule = RecurrenceRule::for_frequency(frequency).unwrap();

        assert_eq!(rule.frequency(), frequency);
    }

    #[rstest]
    // 2026-03-02 は月曜日
    #[case(EmailFrequency::EveryTwoMinutes, utc(2026, 3, 2, 9, 0, 30), utc(2026, 3, 2, 9, 2, 0))]
    #[case(EmailFrequency::Daily, utc(2026, 3, 2, 9, 0, 0), utc(2026, 3, 3, 9, 0, 0))]
    #[case(EmailFrequency::Weekly, utc(2026, 3, 3, 10, 0, 0), utc(2026, 3, 9, 9, 0, 0))]
    #[case(EmailFrequency::Monthly, utc(2026, 3, 2, 9, 0, 0), utc(2026, 4, 1, 9, 0, 0))]
    fn test_next_afterの結果(
        #[case] frequency: EmailFrequency,
        #[case] after: DateTime<Utc>,
        #[case] expected: DateTime<Utc>,
    ) {
        let rule = RecurrenceRule::for_frequency(frequency).unwrap();

        let next = rule.next_after(after, FixedOffset::east_opt(0).unwrap());

        assert_eq!(next, Some(expected));
    }

    #[test]
    fn test_オフセット付きの基準時刻で評価する() {
        let rule = RecurrenceRule::for_frequency(EmailFrequency::Daily).unwrap();

        // UTC+10 の 09:00 は UTC の前日 23:00
        let next = rule.next_after(
            utc(2026, 3, 2, 0, 0, 0),
            FixedOffset::east_opt(10 * 3600).unwrap(),
        );

        assert_eq!(next, Some(utc(2026, 3, 2, 23, 0, 0)));
    }

    #[test]
    fn test_未知のラベルはweeklyのルールになる() {
        let frequency = EmailFrequency::from_label_or_default("Fortnightly");

        assert_eq!(
            RecurrenceRule::cron_expression(frequency),
            "0 0 9 * * Mon"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_2分ごとの設定で2分おきにバッチが走る() {
        let (controller, batch) = make_controller(utc(2026, 3, 2, 9, 0, 30));

        controller
            .reschedule(EmailFrequency::EveryTwoMinutes)
            .await
            .unwrap();
        // 09:02:00 と 09:04:00 に発火
        tokio::time::sleep(Duration::from_secs(250)).await;

        assert_eq!(batch.runs(), 2);
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dailyに切り替えると旧タイマーは止まり翌朝9時に走る() {
        let (controller, batch) = make_controller(utc(2026, 3, 3, 10, 0, 30));

        controller
            .reschedule(EmailFrequency::EveryTwoMinutes)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(250)).await;
        assert_eq!(batch.runs(), 2);

        // 10:04:40 に Daily へ切り替え
        controller.reschedule(EmailFrequency::Daily).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(batch.runs(), 2);

        // 翌日 09:04:40 まで進める
        tokio::time::sleep(Duration::from_secs(22 * 3600)).await;
        assert_eq!(batch.runs(), 3);
        assert_eq!(controller.active_rule().await, Some(EmailFrequency::Daily));
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_同じ頻度で2回設定してもタイマーは1つ() {
        // 火曜日 10:00:30 開始
        let (controller, batch) = make_controller(utc(2026, 3, 3, 10, 0, 30));

        controller.reschedule(EmailFrequency::Weekly).await.unwrap();
        controller.reschedule(EmailFrequency::Weekly).await.unwrap();
        // 翌週月曜 10:00:30 まで進める
        tokio::time::sleep(Duration::from_secs(6 * 24 * 3600)).await;

        assert_eq!(batch.runs(), 1);
        assert_eq!(controller.active_rule().await, Some(EmailFrequency::Weekly));
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown後はバッチが走らない() {
        let (controller, batch) = make_controller(utc(2026, 3, 2, 9, 0, 30));

        controller
            .reschedule(EmailFrequency::EveryTwoMinutes)
            .await
            .unwrap();
        controller.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(batch.runs(), 0);
        assert_eq!(controller.active_rule().await, None);
    }

    #[tokio::test]
    async fn test_起動前はactive_ruleがnone() {
        let (controller, _) = make_controller(utc(2026, 3, 2, 9, 0, 0));

        assert_eq!(controller.active_rule().await, None);
    }
}
