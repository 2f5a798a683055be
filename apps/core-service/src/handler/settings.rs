//! # 通知設定ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/settings` - 現在の通知設定（未保存なら既定値）
//! - `PUT /api/settings` - 通知設定を保存し、送信スケジュールを差し替える

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sgfman_domain::notification_settings::NotificationSettings;
use sgfman_shared::ApiResponse;

use crate::{
    error::CoreError,
    usecase::{SettingsUseCaseImpl, UpdateSettingsInput},
};

/// 通知設定 API の共有状態
pub struct SettingsState {
    pub usecase: SettingsUseCaseImpl,
}

/// 通知設定更新リクエスト
///
/// 旧フィールド名 `emailTemplate` は `statusTemplate` として受け付ける。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub email_frequency:  String,
    #[serde(alias = "emailTemplate")]
    pub status_template:  Option<String>,
    pub new_job_template: Option<String>,
}

/// 通知設定 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDto {
    pub email_frequency:  &'static str,
    pub status_template:  String,
    pub new_job_template: String,
}

impl From<NotificationSettings> for SettingsDto {
    fn from(settings: NotificationSettings) -> Self {
        Self {
            email_frequency:  settings.email_frequency.as_str(),
            status_template:  settings.status_template,
            new_job_template: settings.new_job_template,
        }
    }
}

/// GET /api/settings
#[tracing::instrument(skip_all)]
pub async fn get_settings(
    State(state): State<Arc<SettingsState>>,
) -> Result<impl IntoResponse, CoreError> {
    let settings = state.usecase.get_settings().await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(SettingsDto::from(settings)))))
}

/// PUT /api/settings
///
/// 保存とスケジュールの差し替えが終わってから応答する。
/// 未知の送信頻度は Weekly として保存される。
#[tracing::instrument(skip_all)]
pub async fn update_settings(
    State(state): State<Arc<SettingsState>>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let settings = state
        .usecase
        .update_settings(UpdateSettingsInput {
            email_frequency:  req.email_frequency,
            status_template:  req.status_template,
            new_job_template: req.new_job_template,
        })
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(SettingsDto::from(settings)))))
}
