//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンス（RFC 9457）への変換を定義する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sgfman_domain::DomainError;
use sgfman_infra::InfraError;
use sgfman_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

use crate::scheduler::ScheduleError;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// データベースエラー（ストレージ利用不可）
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// タイマーの再構築に失敗
    #[error("スケジュールエラー: {0}")]
    Schedule(#[from] ScheduleError),
}

impl From<DomainError> for CoreError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { .. } => Self::NotFound(error.to_string()),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = match &self {
            CoreError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            CoreError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            CoreError::Database(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            CoreError::Schedule(e) => {
                tracing::error!(
                    error.kind = log_error::kind::INTERNAL,
                    "スケジュールエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
