//! # 通知サービス
//!
//! 送信可否判定 → テンプレートレンダリング → メール送信 → ログ記録を統合するサービス。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: `notify()` は送信失敗してもエラーを返さない。結果は
//!   [`DispatchOutcome`] として返し、呼び出し側はログ・集計にのみ使う
//! - **ログ記録**: 成功・失敗どちらも `notification_logs` テーブルに記録
//! - **依存性注入**: `NotificationSender` と `NotificationLogRepository` は trait で抽象化

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sgfman_domain::{
    clock::Clock,
    job::{Job, JobFields, JobId, ProjectStatus},
    notification::{
        Eligibility,
        EmailMessage,
        NotificationLogId,
        NotificationType,
        SkipReason,
        check_eligibility,
    },
    notification_settings::NotificationSettings,
};
use sgfman_infra::{
    notification::NotificationSender,
    repository::{DeliveryStatus, NotificationLog, NotificationLogRepository},
};
use sgfman_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::TemplateRenderer;

/// 1 通分の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 送信成功
    Sent,
    /// 送信・レンダリング失敗（エラーメッセージ）
    Failed(String),
    /// 送信対象外
    Skipped(SkipReason),
}

/// 通知サービス
///
/// 案件ごとのメール通知の全体フローを統合する。
pub struct NotificationService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
    log_repo:          Arc<dyn NotificationLogRepository>,
    clock:             Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        template_renderer: TemplateRenderer,
        log_repo: Arc<dyn NotificationLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sender,
            template_renderer,
            log_repo,
            clock,
        }
    }

    /// 1 案件に通知を送る（fire-and-forget）
    ///
    /// 送信可否判定 → レンダリング → 送信の順に進み、途中で見送り・失敗した場合も
    /// エラーは返さない。
    pub async fn notify(
        &self,
        job: &Job,
        settings: &NotificationSettings,
        notification_type: NotificationType,
    ) -> DispatchOutcome {
        self.run(job, settings, notification_type, Some(job.id()))
            .await
    }

    /// 診断用の手動送信
    ///
    /// 架空の案件を組み立て、現在の設定で同じパイプラインを通す。
    /// 架空案件は保存されていないため、通知ログには案件を紐付けない。
    pub async fn send_test_notification(
        &self,
        to: &str,
        notification_type: NotificationType,
        settings: &NotificationSettings,
    ) -> DispatchOutcome {
        let job = test_job(to, self.clock.now());
        self.run(&job, settings, notification_type, None).await
    }

    async fn run(
        &self,
        job: &Job,
        settings: &NotificationSettings,
        notification_type: NotificationType,
        log_job_id: Option<&JobId>,
    ) -> DispatchOutcome {
        if let Eligibility::Skip(reason) = check_eligibility(job, notification_type) {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SKIPPED,
                event.entity_type = event::entity_type::JOB,
                event.entity_id = %job.id(),
                event.result = event::result::SKIPPED,
                notification.kind = notification_type.as_str(),
                notification.skip_reason = %reason,
                "通知送信を見送り"
            );
            return DispatchOutcome::Skipped(reason);
        }

        let text = match self
            .template_renderer
            .render(job, settings, notification_type)
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    error.kind = log_error::kind::TEMPLATE,
                    error = %e,
                    job_id = %job.id(),
                    notification.kind = notification_type.as_str(),
                    "通知テンプレートのレンダリングに失敗"
                );
                return DispatchOutcome::Failed(e.to_string());
            }
        };

        self.dispatch(job, text, notification_type, log_job_id).await
    }

    /// レンダリング済み本文を `email1` 宛に送信し、結果を記録する
    ///
    /// 送信エラーは捕捉してログ出力するだけで、リトライも伝播もしない。
    /// `log_job_id` が `None` の場合、通知ログに案件を紐付けない。
    async fn dispatch(
        &self,
        job: &Job,
        text_body: String,
        notification_type: NotificationType,
        log_job_id: Option<&JobId>,
    ) -> DispatchOutcome {
        let Some(recipient) = job.email1() else {
            return DispatchOutcome::Skipped(SkipReason::MissingEmail);
        };

        let email = EmailMessage {
            to: recipient.to_string(),
            subject: notification_type.subject().to_string(),
            text_body,
        };

        let log_id = NotificationLogId::new();
        let (status, error_message) = match self.sender.send_email(&email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.entity_id = %log_id,
                    event.result = event::result::SUCCESS,
                    notification.kind = notification_type.as_str(),
                    notification.recipient = %email.to,
                    "通知メール送信成功"
                );
                (DeliveryStatus::Sent, None)
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.entity_id = %log_id,
                    event.result = event::result::FAILURE,
                    notification.kind = notification_type.as_str(),
                    notification.recipient = %email.to,
                    error.category = log_error::category::EXTERNAL_SERVICE,
                    error.kind = log_error::kind::MAIL_TRANSPORT,
                    error = %e,
                    "通知メール送信失敗"
                );
                (DeliveryStatus::Failed, Some(e.to_string()))
            }
        };

        let log = NotificationLog {
            id: log_id,
            job_id: log_job_id.cloned(),
            notification_type,
            recipient_email: email.to,
            subject: email.subject,
            status,
            error_message: error_message.clone(),
            sent_at: self.clock.now(),
        };

        if let Err(e) = self.log_repo.insert(&log).await {
            tracing::error!(
                error = %e,
                "通知ログの記録に失敗"
            );
        }

        match error_message {
            None => DispatchOutcome::Sent,
            Some(message) => DispatchOutcome::Failed(message),
        }
    }
}

fn test_job(to: &str, now: DateTime<Utc>) -> Job {
    Job::new(
        JobId::new(),
        JobFields {
            address: "123 Example St".to_string(),
            name1: Some("Test Client".to_string()),
            email1: Some(to.to_string()),
            status: ProjectStatus::DesignPhase,
            ..Default::default()
        },
        now,
    )
}
