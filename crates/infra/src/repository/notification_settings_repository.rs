//! # NotificationSettingsRepository
//!
//! 通知設定（シングルトン行 `id = 1`）の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **行が無いことを許容**: [`find`](NotificationSettingsRepository::find) は `Option` を返し、
//!   呼び出し側が既定値で補う
//! - **起動時に補完**: [`ensure_default`](NotificationSettingsRepository::ensure_default) は
//!   既存の行を上書きしない

use async_trait::async_trait;
use sgfman_domain::notification_settings::{
    DEFAULT_NEW_JOB_TEMPLATE,
    DEFAULT_STATUS_TEMPLATE,
    EmailFrequency,
    NotificationSettings,
};
use sqlx::PgPool;

use crate::error::InfraError;

/// 通知設定リポジトリトレイト
#[async_trait]
pub trait NotificationSettingsRepository: Send + Sync {
    /// 設定を取得する（行が無ければ `None`）
    async fn find(&self) -> Result<Option<NotificationSettings>, InfraError>;

    /// 設定行が無ければ既定値で作成する
    async fn ensure_default(&self) -> Result<(), InfraError>;

    /// 設定を保存する（行が無ければ作成する）
    async fn save(&self, settings: &NotificationSettings) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    email_frequency: String,
    status_template: String,
    new_job_template: String,
}

impl From<SettingsRow> for NotificationSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            email_frequency: EmailFrequency::from_label_or_default(&row.email_frequency),
            status_template: row.status_template,
            new_job_template: row.new_job_template,
        }
    }
}

/// PostgreSQL 実装の NotificationSettingsRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationSettingsRepository {
    pool: PgPool,
}

impl PostgresNotificationSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSettingsRepository for PostgresNotificationSettingsRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find(&self) -> Result<Option<NotificationSettings>, InfraError> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT email_frequency, status_template, new_job_template
            FROM notification_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(NotificationSettings::from))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn ensure_default(&self) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notification_settings (id, email_frequency, status_template, new_job_template)
            VALUES (1, $1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(EmailFrequency::default().as_str())
        .bind(DEFAULT_STATUS_TEMPLATE)
        .bind(DEFAULT_NEW_JOB_TEMPLATE)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(frequency = %settings.email_frequency))]
    async fn save(&self, settings: &NotificationSettings) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notification_settings (id, email_frequency, status_template, new_job_template)
            VALUES (1, $1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                email_frequency = EXCLUDED.email_frequency,
                status_template = EXCLUDED.status_template,
                new_job_template = EXCLUDED.new_job_template,
                updated_at = now()
            "#,
        )
        .bind(settings.email_frequency.as_str())
        .bind(&settings.status_template)
        .bind(&settings.new_job_template)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
