//! # NotificationLogRepository
//!
//! 通知ログの永続化を担当するリポジトリ。
//!
//! 送信成功・失敗どちらも記録する。記録自体の失敗は呼び出し側でログ出力するだけで、
//! 送信結果には影響させない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sgfman_domain::{
    job::JobId,
    notification::{NotificationLogId, NotificationType},
};
use sqlx::PgPool;
use strum::IntoStaticStr;

use crate::error::InfraError;

/// 送信結果（`notification_logs.status` の値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// 通知ログ（リポジトリ INSERT 用データ型）
#[derive(Debug, Clone)]
pub struct NotificationLog {
    pub id: NotificationLogId,
    /// 手動送信（診断用）の場合は `None`
    pub job_id: Option<JobId>,
    pub notification_type: NotificationType,
    pub recipient_email: String,
    pub subject: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// 通知ログリポジトリトレイト
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    /// 通知ログを挿入する
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の NotificationLogRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationLogRepository {
    pool: PgPool,
}

impl PostgresNotificationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for PostgresNotificationLogRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notification_logs (
                id, job_id, notification_type, recipient_email,
                subject, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.job_id.as_ref().map(JobId::as_uuid))
        .bind(log.notification_type.as_str())
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
