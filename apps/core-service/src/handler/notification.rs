//! # 手動通知ハンドラ
//!
//! 診断用に、任意の宛先へ架空案件の通知メールを 1 通送る。
//!
//! ## エンドポイント
//!
//! - `POST /api/notifications/test` - `{ "to": "...", "type": "status" | "new" }`

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sgfman_domain::notification::NotificationType;
use sgfman_infra::repository::NotificationSettingsRepository;
use sgfman_shared::ApiResponse;

use crate::{
    error::CoreError,
    usecase::{
        notification::{DispatchOutcome, NotificationService},
        settings::current_settings,
    },
};

/// 手動通知 API の共有状態
pub struct NotificationState {
    pub notification:  Arc<NotificationService>,
    pub settings_repo: Arc<dyn NotificationSettingsRepository>,
}

/// 手動通知リクエスト
#[derive(Debug, Deserialize)]
pub struct TestNotificationRequest {
    pub to:                String,
    #[serde(rename = "type", default = "default_notification_type")]
    pub notification_type: NotificationType,
}

fn default_notification_type() -> NotificationType {
    NotificationType::Status
}

/// 手動通知の結果 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationDto {
    /// `sent` / `failed` / `skipped`
    pub outcome: &'static str,
    /// 失敗時のエラー、見送り時の理由
    pub detail:  Option<String>,
}

impl From<DispatchOutcome> for TestNotificationDto {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Sent => Self {
                outcome: "sent",
                detail:  None,
            },
            DispatchOutcome::Failed(message) => Self {
                outcome: "failed",
                detail:  Some(message),
            },
            DispatchOutcome::Skipped(reason) => Self {
                outcome: "skipped",
                detail:  Some(reason.to_string()),
            },
        }
    }
}

/// POST /api/notifications/test
///
/// 送信失敗もエラーにはせず、結果を `outcome` として返す。
#[tracing::instrument(skip_all)]
pub async fn send_test_notification(
    State(state): State<Arc<NotificationState>>,
    Json(req): Json<TestNotificationRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let settings = current_settings(state.settings_repo.as_ref()).await?;
    let outcome = state
        .notification
        .send_test_notification(&req.to, req.notification_type, &settings)
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(TestNotificationDto::from(outcome))),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::post,
    };
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use sgfman_domain::clock::FixedClock;
    use sgfman_infra::mock::{
        MockNotificationLogRepository,
        MockNotificationSender,
        MockNotificationSettingsRepository,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::usecase::notification::TemplateRenderer;

    fn create_test_app(sender: MockNotificationSender) -> Router {
        let notification = Arc::new(NotificationService::new(
            Arc::new(sender),
            TemplateRenderer::new().unwrap(),
            Arc::new(MockNotificationLogRepository::new()),
            Arc::new(FixedClock::new(Utc::now())),
        ));
        let state = Arc::new(NotificationState {
            notification,
            settings_repo: Arc::new(MockNotificationSettingsRepository::new()),
        });
        Router::new()
            .route("/api/notifications/test", post(send_test_notification))
            .with_state(state)
    }

    async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/notifications/test")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_newの手動送信は新規案件の件名で送られる() {
        let sender = MockNotificationSender::new();
        let app = create_test_app(sender.clone());

        let (status, body) =
            post_json(app, json!({ "to": "office@example.com", "type": "new" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "sent");
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Superior Granny Flats - New Project");
        assert!(sent[0].text_body.starts_with("Hi Test Client,\n"));
    }

    #[tokio::test]
    async fn test_送信失敗はfailedとして返る() {
        let sender = MockNotificationSender::new();
        sender.fail_for("office@example.com");
        let app = create_test_app(sender);

        let (status, body) = post_json(app, json!({ "to": "office@example.com" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "failed");
        assert!(body["data"]["detail"].is_string());
    }

    #[tokio::test]
    async fn test_宛先が空ならskipped() {
        let sender = MockNotificationSender::new();
        let app = create_test_app(sender.clone());

        let (_, body) = post_json(app, json!({ "to": "  ", "type": "status" })).await;

        assert_eq!(body["data"]["outcome"], "skipped");
        assert_eq!(body["data"]["detail"], "missing_email");
        assert!(sender.sent_emails().is_empty());
    }
}
