//! # 案件ユースケース
//!
//! 案件の一覧・取得・作成・更新・削除を扱う。
//!
//! 作成時のみ、保存が完了した直後に新規案件メール（new）を 1 通送る。
//! 送信結果は作成結果に影響しない。

use std::sync::Arc;

use sgfman_domain::{
    DomainError,
    clock::Clock,
    job::{Job, JobFields, JobId},
    notification::NotificationType,
    notification_settings::NotificationSettings,
};
use sgfman_infra::repository::{JobRepository, NotificationSettingsRepository};
use sgfman_shared::{event_log::event, log_business_event};

use super::{notification::NotificationService, settings::current_settings};
use crate::error::CoreError;

/// 案件ユースケース実装
pub struct JobUseCaseImpl {
    job_repo:      Arc<dyn JobRepository>,
    settings_repo: Arc<dyn NotificationSettingsRepository>,
    notification:  Arc<NotificationService>,
    clock:         Arc<dyn Clock>,
}

impl JobUseCaseImpl {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        settings_repo: Arc<dyn NotificationSettingsRepository>,
        notification: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            job_repo,
            settings_repo,
            notification,
            clock,
        }
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, CoreError> {
        Ok(self.job_repo.find_all().await?)
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Job, CoreError> {
        self.job_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// 案件を作成し、新規案件メールを送る
    pub async fn create_job(&self, fields: JobFields) -> Result<Job, CoreError> {
        let job = Job::new(JobId::new(), fields, self.clock.now());
        self.job_repo.insert(&job).await?;

        log_business_event!(
            event.category = event::category::JOB,
            event.action = event::action::JOB_CREATED,
            event.entity_type = event::entity_type::JOB,
            event.entity_id = %job.id(),
            event.result = event::result::SUCCESS,
            "案件作成"
        );

        let settings = match current_settings(self.settings_repo.as_ref()).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    job_id = %job.id(),
                    "通知設定の読み込みに失敗したため既定値で送信します"
                );
                NotificationSettings::default()
            }
        };
        self.notification
            .notify(&job, &settings, NotificationType::New)
            .await;

        Ok(job)
    }

    /// 案件を更新する（通知は送らない）
    pub async fn update_job(&self, id: &JobId, fields: JobFields) -> Result<Job, CoreError> {
        let job = self.get_job(id).await?.updated(fields, self.clock.now());

        if !self.job_repo.update(&job).await? {
            return Err(not_found(id));
        }

        log_business_event!(
            event.category = event::category::JOB,
            event.action = event::action::JOB_UPDATED,
            event.entity_type = event::entity_type::JOB,
            event.entity_id = %job.id(),
            event.result = event::result::SUCCESS,
            "案件更新"
        );

        Ok(job)
    }

    /// 案件を削除する（通知は送らない）
    pub async fn delete_job(&self, id: &JobId) -> Result<JobId, CoreError> {
        if !self.job_repo.delete(id).await? {
            return Err(not_found(id));
        }

        log_business_event!(
            event.category = event::category::JOB,
            event.action = event::action::JOB_DELETED,
            event.entity_type = event::entity_type::JOB,
            event.entity_id = %id,
            event.result = event::result::SUCCESS,
            "案件削除"
        );

        Ok(id.clone())
    }
}

fn not_found(id: &JobId) -> CoreError {
    DomainError::NotFound {
        entity_type: "Job",
        id:          id.to_string(),
    }
    .into()
}
