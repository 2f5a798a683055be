//! # 通知設定ユースケース
//!
//! 通知設定の取得・更新と、更新に伴うタイマーの差し替えを扱う。

use std::sync::Arc;

use sgfman_domain::notification_settings::{EmailFrequency, NotificationSettings};
use sgfman_infra::repository::NotificationSettingsRepository;
use sgfman_shared::{event_log::event, log_business_event};
use tokio::sync::Mutex;

use crate::{error::CoreError, scheduler::ScheduleController};

/// 通知設定更新の入力
///
/// テンプレートが `None` の場合は現在の値を維持する。
#[derive(Debug, Clone, Default)]
pub struct UpdateSettingsInput {
    /// 送信頻度のラベル（"Every 2 Minutes" / "Daily" / "Weekly" / "Monthly"）
    pub email_frequency:  String,
    pub status_template:  Option<String>,
    pub new_job_template: Option<String>,
}

/// 保存済みの設定を読み込む。行がなければ既定値を返す。
pub async fn current_settings(
    repo: &dyn NotificationSettingsRepository,
) -> Result<NotificationSettings, CoreError> {
    Ok(repo.find().await?.unwrap_or_default())
}

/// 通知設定ユースケース実装
pub struct SettingsUseCaseImpl {
    settings_repo: Arc<dyn NotificationSettingsRepository>,
    scheduler:     Arc<ScheduleController>,
    /// 読み込みから差し替えまでを 1 件ずつ直列化する
    update_lock:   Mutex<()>,
}

impl SettingsUseCaseImpl {
    pub fn new(
        settings_repo: Arc<dyn NotificationSettingsRepository>,
        scheduler: Arc<ScheduleController>,
    ) -> Self {
        Self {
            settings_repo,
            scheduler,
            update_lock: Mutex::new(()),
        }
    }

    /// 現在の通知設定を取得する
    pub async fn get_settings(&self) -> Result<NotificationSettings, CoreError> {
        current_settings(self.settings_repo.as_ref()).await
    }

    /// 通知設定を保存し、タイマーを差し替える
    ///
    /// 未知の送信頻度は Weekly として保存する。保存に失敗した場合は
    /// タイマーに触れずにエラーを返す。差し替えが終わるまで戻らない。
    /// 同時に更新された場合も、保存された送信頻度と稼働中のタイマーは一致する。
    pub async fn update_settings(
        &self,
        input: UpdateSettingsInput,
    ) -> Result<NotificationSettings, CoreError> {
        let email_frequency = match EmailFrequency::parse_label(&input.email_frequency) {
            Some(frequency) => frequency,
            None => {
                tracing::warn!(
                    email_frequency = %input.email_frequency,
                    "未知の送信頻度のため Weekly として扱います"
                );
                EmailFrequency::Weekly
            }
        };

        let _guard = self.update_lock.lock().await;

        let current = current_settings(self.settings_repo.as_ref()).await?;
        let settings = NotificationSettings {
            email_frequency,
            status_template: input.status_template.unwrap_or(current.status_template),
            new_job_template: input.new_job_template.unwrap_or(current.new_job_template),
        };

        self.settings_repo.save(&settings).await?;
        self.scheduler.reschedule(settings.email_frequency).await?;

        log_business_event!(
            event.category = event::category::SETTINGS,
            event.action = event::action::SETTINGS_UPDATED,
            event.entity_type = event::entity_type::NOTIFICATION_SETTINGS,
            event.result = event::result::SUCCESS,
            settings.email_frequency = settings.email_frequency.as_str(),
            "通知設定を更新"
        );

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;
    use sgfman_domain::clock::SystemClock;
    use sgfman_infra::{InfraError, mock::MockNotificationSettingsRepository};

    use super::*;
    use crate::scheduler::ScheduledBatch;

    struct NoopBatch;

    #[async_trait]
    impl ScheduledBatch for NoopBatch {
        async fn run_batch(&self) {}
    }

    /// Daily の保存応答だけが遅れるリポジトリ
    struct SlowDailySaveRepository {
        inner: MockNotificationSettingsRepository,
    }

    #[async_trait]
    impl NotificationSettingsRepository for SlowDailySaveRepository {
        async fn find(&self) -> Result<Option<NotificationSettings>, InfraError> {
            self.inner.find().await
        }

        async fn ensure_default(&self) -> Result<(), InfraError> {
            self.inner.ensure_default().await
        }

        async fn save(&self, settings: &NotificationSettings) -> Result<(), InfraError> {
            self.inner.save(settings).await?;
            if settings.email_frequency == EmailFrequency::Daily {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(())
        }
    }

    fn make_sut(
        repo: MockNotificationSettingsRepository,
    ) -> (SettingsUseCaseImpl, Arc<ScheduleController>) {
        let scheduler = Arc::new(ScheduleController::new(
            Arc::new(NoopBatch),
            Arc::new(SystemClock),
            FixedOffset::east_opt(0).unwrap(),
        ));
        (
            SettingsUseCaseImpl::new(Arc::new(repo), scheduler.clone()),
            scheduler,
        )
    }

    #[tokio::test]
    async fn test_設定行がなければ既定値を返す() {
        let (sut, _) = make_sut(MockNotificationSettingsRepository::new());

        let settings = sut.get_settings().await.unwrap();

        assert_eq!(settings, NotificationSettings::default());
    }

    #[tokio::test]
    async fn test_更新すると保存されタイマーが差し替わる() {
        let repo = MockNotificationSettingsRepository::new();
        let (sut, scheduler) = make_sut(repo.clone());

        let settings = sut
            .update_settings(UpdateSettingsInput {
                email_frequency:  "Daily".to_string(),
                status_template:  Some("Slab poured.".to_string()),
                new_job_template: None,
            })
            .await
            .unwrap();

        assert_eq!(settings.email_frequency, EmailFrequency::Daily);
        assert_eq!(settings.status_template, "Slab poured.");
        assert_eq!(
            settings.new_job_template,
            NotificationSettings::default().new_job_template
        );
        assert_eq!(repo.stored(), Some(settings));
        assert_eq!(scheduler.active_rule().await, Some(EmailFrequency::Daily));
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_未知の送信頻度はweeklyで保存される() {
        let repo = MockNotificationSettingsRepository::new();
        let (sut, scheduler) = make_sut(repo.clone());

        let settings = sut
            .update_settings(UpdateSettingsInput {
                email_frequency: "Fortnightly".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(settings.email_frequency, EmailFrequency::Weekly);
        assert_eq!(
            repo.stored().map(|s| s.email_frequency),
            Some(EmailFrequency::Weekly)
        );
        assert_eq!(scheduler.active_rule().await, Some(EmailFrequency::Weekly));
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_テンプレート未指定なら現在の値を維持する() {
        let repo = MockNotificationSettingsRepository::with_settings(NotificationSettings {
            email_frequency:  EmailFrequency::Monthly,
            status_template:  "Existing status text".to_string(),
            new_job_template: "Existing new job text".to_string(),
        });
        let (sut, scheduler) = make_sut(repo);

        let settings = sut
            .update_settings(UpdateSettingsInput {
                email_frequency: "Every 2 Minutes".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(settings.status_template, "Existing status text");
        assert_eq!(settings.new_job_template, "Existing new job text");
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_読み込みに失敗したらタイマーに触れない() {
        let repo = MockNotificationSettingsRepository::new();
        repo.fail_reads();
        let (sut, scheduler) = make_sut(repo);

        let result = sut
            .update_settings(UpdateSettingsInput {
                email_frequency: "Daily".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(CoreError::Database(_))));
        assert_eq!(scheduler.active_rule().await, None);
    }

    #[tokio::test]
    async fn test_保存に失敗したらタイマーに触れない() {
        let repo = MockNotificationSettingsRepository::new();
        repo.fail_writes();
        let (sut, scheduler) = make_sut(repo.clone());

        let result = sut
            .update_settings(UpdateSettingsInput {
                email_frequency: "Daily".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(CoreError::Database(_))));
        assert_eq!(repo.stored(), None);
        assert_eq!(scheduler.active_rule().await, None);
    }

    #[tokio::test]
    async fn test_同時に更新しても保存値と稼働中のタイマーが一致する() {
        let repo = MockNotificationSettingsRepository::new();
        let scheduler = Arc::new(ScheduleController::new(
            Arc::new(NoopBatch),
            Arc::new(SystemClock),
            FixedOffset::east_opt(0).unwrap(),
        ));
        let sut = SettingsUseCaseImpl::new(
            Arc::new(SlowDailySaveRepository {
                inner: repo.clone(),
            }),
            scheduler.clone(),
        );

        let daily = sut.update_settings(UpdateSettingsInput {
            email_frequency: "Daily".to_string(),
            ..Default::default()
        });
        let monthly = async {
            tokio::task::yield_now().await;
            sut.update_settings(UpdateSettingsInput {
                email_frequency: "Monthly".to_string(),
                ..Default::default()
            })
            .await
        };
        let (daily, monthly) = tokio::join!(daily, monthly);
        daily.unwrap();
        monthly.unwrap();

        let persisted = repo.stored().map(|s| s.email_frequency);
        assert_eq!(persisted, Some(EmailFrequency::Monthly));
        assert_eq!(scheduler.active_rule().await, persisted);
        scheduler.shutdown().await;
    }
}
