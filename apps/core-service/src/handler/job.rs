//! # 案件ハンドラ
//!
//! 案件管理 API を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /api/jobs` - 案件一覧
//! - `GET /api/jobs/{id}` - 案件詳細
//! - `POST /api/jobs` - 案件作成（新規案件メールを送信）
//! - `PUT /api/jobs/{id}` - 案件更新
//! - `DELETE /api/jobs/{id}` - 案件削除

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sgfman_domain::{
    DomainError,
    job::{Job, JobFields, JobId, ProjectStatus, YesNo},
};
use sgfman_shared::ApiResponse;
use uuid::Uuid;

use crate::{error::CoreError, usecase::JobUseCaseImpl};

/// 案件 API の共有状態
pub struct JobState {
    pub usecase: JobUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 金額入力
///
/// 数値のほか、フォームから送られる数字文字列・空文字も受け付ける。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(i64),
    Text(String),
}

/// 案件作成・更新リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub address: String,
    pub finish: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub name1: Option<String>,
    pub name2: Option<String>,
    pub email1: Option<String>,
    pub email2: Option<String>,
    pub notes: Option<String>,
    pub price: Option<AmountInput>,
    /// 目標日（`YYYY-MM-DD`）
    pub date: Option<String>,
    pub colors: Option<String>,
    pub windows: Option<String>,
    pub contract: Option<String>,
    pub status: Option<String>,
    pub deposit_amount: Option<AmountInput>,
    pub concept_drawings_confirmed: Option<String>,
    pub working_drawings_confirmed: Option<String>,
    pub energy_report: Option<String>,
}

impl JobRequest {
    /// リクエストを案件フィールドに変換する
    ///
    /// ステータスは未指定・空文字なら既定値、未知のラベルはエラー。
    fn into_fields(self) -> Result<JobFields, DomainError> {
        Ok(JobFields {
            price: parse_amount("price", self.price)?,
            target_date: parse_date(self.date)?,
            status: parse_status(self.status)?,
            deposit_amount: parse_amount("depositAmount", self.deposit_amount)?,
            concept_drawings_confirmed: YesNo::normalize(
                self.concept_drawings_confirmed.as_deref(),
            ),
            working_drawings_confirmed: YesNo::normalize(
                self.working_drawings_confirmed.as_deref(),
            ),
            energy_report: YesNo::normalize(self.energy_report.as_deref()),
            address: self.address,
            finish: self.finish,
            class_name: self.class_name,
            name1: self.name1,
            name2: self.name2,
            email1: self.email1,
            email2: self.email2,
            notes: self.notes,
            colors: self.colors,
            windows: self.windows,
            contract: self.contract,
        })
    }
}

fn parse_status(value: Option<String>) -> Result<ProjectStatus, DomainError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(ProjectStatus::default()),
        Some(label) => label
            .parse()
            .map_err(|_| DomainError::Validation(format!("不明なステータスです: {label}"))),
    }
}

fn parse_amount(field: &str, value: Option<AmountInput>) -> Result<Option<i64>, DomainError> {
    match value {
        None => Ok(None),
        Some(AmountInput::Number(n)) => Ok(Some(n)),
        Some(AmountInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse().map(Some).map_err(|_| {
                DomainError::Validation(format!("{field} は整数で指定してください: {text}"))
            })
        }
    }
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>, DomainError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| DomainError::Validation(format!("date の形式が不正です: {text}"))),
    }
}

/// 案件 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
    pub id: Uuid,
    pub address: String,
    pub finish: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub name1: Option<String>,
    pub name2: Option<String>,
    pub email1: Option<String>,
    pub email2: Option<String>,
    pub notes: Option<String>,
    pub price: Option<i64>,
    pub date: Option<String>,
    pub colors: Option<String>,
    pub windows: Option<String>,
    pub contract: Option<String>,
    pub status: &'static str,
    pub deposit_amount: Option<i64>,
    pub concept_drawings_confirmed: &'static str,
    pub working_drawings_confirmed: &'static str,
    pub energy_report: &'static str,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Job> for JobDto {
    fn from(job: &Job) -> Self {
        let fields = job.fields();
        Self {
            id: *job.id().as_uuid(),
            address: fields.address.clone(),
            finish: fields.finish.clone(),
            class_name: fields.class_name.clone(),
            name1: fields.name1.clone(),
            name2: fields.name2.clone(),
            email1: fields.email1.clone(),
            email2: fields.email2.clone(),
            notes: fields.notes.clone(),
            price: fields.price,
            date: fields.target_date.map(|d| d.format("%Y-%m-%d").to_string()),
            colors: fields.colors.clone(),
            windows: fields.windows.clone(),
            contract: fields.contract.clone(),
            status: fields.status.as_str(),
            deposit_amount: fields.deposit_amount,
            concept_drawings_confirmed: fields.concept_drawings_confirmed.as_str(),
            working_drawings_confirmed: fields.working_drawings_confirmed.as_str(),
            energy_report: fields.energy_report.as_str(),
            created_at: job.created_at().to_rfc3339(),
            updated_at: job.updated_at().to_rfc3339(),
        }
    }
}

/// 削除結果 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedJobDto {
    pub deleted_id: Uuid,
}

// --- ハンドラ ---

/// GET /api/jobs
#[tracing::instrument(skip_all)]
pub async fn list_jobs(
    State(state): State<Arc<JobState>>,
) -> Result<impl IntoResponse, CoreError> {
    let jobs = state.usecase.list_jobs().await?;
    let items: Vec<JobDto> = jobs.iter().map(JobDto::from).collect();

    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /api/jobs/{id}
#[tracing::instrument(skip_all)]
pub async fn get_job(
    State(state): State<Arc<JobState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let job = state.usecase.get_job(&JobId::from_uuid(id)).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(JobDto::from(&job)))))
}

/// POST /api/jobs
///
/// 案件を作成し、新規案件メールを送る。
///
/// ## レスポンス
///
/// - `201 Created`: 作成された案件（メール送信の成否に関わらない）
/// - `400 Bad Request`: 不明なステータス、金額・日付の形式不正
#[tracing::instrument(skip_all)]
pub async fn create_job(
    State(state): State<Arc<JobState>>,
    Json(req): Json<JobRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let fields = req.into_fields()?;
    let job = state.usecase.create_job(fields).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(JobDto::from(&job)))))
}

/// PUT /api/jobs/{id}
///
/// ## レスポンス
///
/// - `200 OK`: 更新後の案件
/// - `400 Bad Request`: 不明なステータス、金額・日付の形式不正
/// - `404 Not Found`: 案件が見つからない
#[tracing::instrument(skip_all)]
pub async fn update_job(
    State(state): State<Arc<JobState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<JobRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let fields = req.into_fields()?;
    let job = state
        .usecase
        .update_job(&JobId::from_uuid(id), fields)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(JobDto::from(&job)))))
}

/// DELETE /api/jobs/{id}
#[tracing::instrument(skip_all)]
pub async fn delete_job(
    State(state): State<Arc<JobState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, CoreError> {
    let deleted = state.usecase.delete_job(&JobId::from_uuid(id)).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(DeletedJobDto {
            deleted_id: *deleted.as_uuid(),
        })),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
        routing::get,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};
    use sgfman_domain::clock::FixedClock;
    use sgfman_infra::mock::{
        MockJobRepository,
        MockNotificationLogRepository,
        MockNotificationSender,
        MockNotificationSettingsRepository,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::usecase::notification::{NotificationService, TemplateRenderer};

    fn create_test_app(job_repo: MockJobRepository, sender: MockNotificationSender) -> Router {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap(),
        ));
        let notification = Arc::new(NotificationService::new(
            Arc::new(sender),
            TemplateRenderer::new().unwrap(),
            Arc::new(MockNotificationLogRepository::new()),
            clock.clone(),
        ));
        let usecase = JobUseCaseImpl::new(
            Arc::new(job_repo),
            Arc::new(MockNotificationSettingsRepository::new()),
            notification,
            clock,
        );
        let state = Arc::new(JobState { usecase });

        Router::new()
            .route("/api/jobs", get(list_jobs).post(create_job))
            .route(
                "/api/jobs/{id}",
                get(get_job).put(update_job).delete(delete_job),
            )
            .with_state(state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_作成は201で既定ステータスを返し新規案件メールを送る() {
        let sender = MockNotificationSender::new();
        let app = create_test_app(MockJobRepository::new(), sender.clone());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/jobs",
                json!({
                    "address": "12 Wattle Rd, Kellyville",
                    "class": "1A",
                    "name1": "Jordan",
                    "email1": "jordan@example.com",
                    "price": "185000",
                    "date": "2026-09-30",
                    "depositAmount": "",
                    "energyReport": "Yes"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "Design Phase");
        assert_eq!(body["data"]["class"], "1A");
        assert_eq!(body["data"]["price"], 185000);
        assert_eq!(body["data"]["date"], "2026-09-30");
        assert_eq!(body["data"]["depositAmount"], Value::Null);
        assert_eq!(body["data"]["energyReport"], "Yes");
        assert_eq!(body["data"]["conceptDrawingsConfirmed"], "No");

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Superior Granny Flats - New Project");
    }

    #[tokio::test]
    async fn test_送信に失敗しても作成は201() {
        let sender = MockNotificationSender::new();
        sender.fail_for("jordan@example.com");
        let app = create_test_app(MockJobRepository::new(), sender);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/jobs",
                json!({ "address": "12 Wattle Rd", "email1": "jordan@example.com" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[case(json!({ "address": "1 A St", "status": "On Hold" }))]
    #[case(json!({ "address": "1 A St", "price": "lots" }))]
    #[case(json!({ "address": "1 A St", "date": "30/09/2026" }))]
    #[tokio::test]
    async fn test_不正な入力は400(#[case] body: Value) {
        let app = create_test_app(MockJobRepository::new(), MockNotificationSender::new());

        let response = app
            .oneshot(json_request(Method::POST, "/api/jobs", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_存在しない案件の取得は404() {
        let app = create_test_app(MockJobRepository::new(), MockNotificationSender::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/jobs/{}", Uuid::now_v7()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_更新はステータスを反映し通知を送らない() {
        let job = Job::new(
            JobId::new(),
            JobFields {
                address: "3 Gum St".to_string(),
                email1: Some("pat@example.com".to_string()),
                ..Default::default()
            },
            Utc::now(),
        );
        let id = *job.id().as_uuid();
        let sender = MockNotificationSender::new();
        let app = create_test_app(MockJobRepository::with_jobs(vec![job]), sender.clone());

        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/jobs/{id}"),
                json!({
                    "address": "3 Gum St",
                    "email1": "pat@example.com",
                    "status": "In Construction"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "In Construction");
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_削除はdeleted_idを返す() {
        let job = Job::new(JobId::new(), JobFields::default(), Utc::now());
        let id = *job.id().as_uuid();
        let job_repo = MockJobRepository::with_jobs(vec![job]);
        let app = create_test_app(job_repo.clone(), MockNotificationSender::new());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/jobs/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "data": { "deletedId": id.to_string() } }));
        assert!(job_repo.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_一覧のストレージ障害は500() {
        let job_repo = MockJobRepository::new();
        job_repo.fail_reads();
        let app = create_test_app(job_repo, MockNotificationSender::new());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/jobs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
