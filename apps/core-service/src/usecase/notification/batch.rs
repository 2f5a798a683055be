//! # 定期ステータスバッチ
//!
//! タイマーの発火ごとに全案件へ定期ステータスメール（status）を送る。
//!
//! ## 処理の流れ
//!
//! 1. 通知設定を読み込む（行がなければ既定値）
//! 2. 全案件を読み込む
//! 3. 案件ごとに送信可否判定 → レンダリング → 送信（逐次）
//!
//! 1・2 のどちらかが失敗した場合は 1 通も送らずに打ち切る。
//! 個々の送信失敗は他の案件に影響しない。

use std::sync::Arc;

use async_trait::async_trait;
use sgfman_domain::notification::NotificationType;
use sgfman_infra::repository::{JobRepository, NotificationSettingsRepository};
use sgfman_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::{DispatchOutcome, NotificationService};
use crate::{error::CoreError, scheduler::ScheduledBatch, usecase::settings::current_settings};

/// 1 回のバッチの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 対象案件数
    pub total:   usize,
    pub sent:    usize,
    pub failed:  usize,
    pub skipped: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        self.total += 1;
        match outcome {
            DispatchOutcome::Sent => self.sent += 1,
            DispatchOutcome::Failed(_) => self.failed += 1,
            DispatchOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// 定期ステータスバッチ
pub struct BatchRunner {
    job_repo:      Arc<dyn JobRepository>,
    settings_repo: Arc<dyn NotificationSettingsRepository>,
    notification:  Arc<NotificationService>,
}

impl BatchRunner {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        settings_repo: Arc<dyn NotificationSettingsRepository>,
        notification: Arc<NotificationService>,
    ) -> Self {
        Self {
            job_repo,
            settings_repo,
            notification,
        }
    }

    /// バッチを 1 回実行する
    ///
    /// 設定・案件の読み込みに失敗した場合のみエラーを返す。
    pub async fn run(&self) -> Result<BatchSummary, CoreError> {
        let settings = current_settings(self.settings_repo.as_ref()).await?;
        let jobs = self.job_repo.find_all().await?;

        let mut summary = BatchSummary::default();
        for job in &jobs {
            let outcome = self
                .notification
                .notify(job, &settings, NotificationType::Status)
                .await;
            summary.record(&outcome);
        }

        Ok(summary)
    }
}

#[async_trait]
impl ScheduledBatch for BatchRunner {
    async fn run_batch(&self) {
        match self.run().await {
            Ok(summary) => {
                log_business_event!(
                    event.category = event::category::SCHEDULE,
                    event.action = event::action::BATCH_COMPLETED,
                    event.entity_type = event::entity_type::SCHEDULED_TASK,
                    event.result = event::result::SUCCESS,
                    batch.total = summary.total,
                    batch.sent = summary.sent,
                    batch.failed = summary.failed,
                    batch.skipped = summary.skipped,
                    "定期ステータスバッチ完了"
                );
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::SCHEDULE,
                    event.action = event::action::BATCH_ABORTED,
                    event.entity_type = event::entity_type::SCHEDULED_TASK,
                    event.result = event::result::FAILURE,
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    error = %e,
                    "定期ステータスバッチを中断"
                );
            }
        }
    }
}
