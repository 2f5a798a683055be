//! # ヘルスチェックハンドラ
//!
//! Core Service の稼働状態を確認するためのエンドポイント。
//!
//! ## エンドポイント
//!
//! - `GET /health` - Liveness（プロセスが応答できるか）
//! - `GET /health/ready` - Readiness（DB 疎通と送信スケジュールの稼働状況）
//!
//! ## レスポンス例
//!
//! ```json
//! {
//!   "status": "ready",
//!   "checks": { "database": "ok" },
//!   "schedule": "Weekly"
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sgfman_infra::db;
use sgfman_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
use sqlx::PgPool;

use crate::scheduler::ScheduleController;

/// Readiness チェックの共有状態
pub struct ReadinessState {
    pub pool:      PgPool,
    pub scheduler: Arc<ScheduleController>,
}

/// ヘルスチェックエンドポイント
///
/// サーバーが正常に稼働していることを確認するためのエンドポイント。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness チェックエンドポイント
///
/// DB に到達できない場合は 503 を返す。タイマーが未起動でも DB が応答すれば ready。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let database = match db::ping(&state.pool).await {
        Ok(()) => CheckStatus::Ok,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: データベースに接続できません");
            CheckStatus::Error
        }
    };

    let schedule = state
        .scheduler
        .active_rule()
        .await
        .map(|frequency| frequency.as_str().to_string());

    let response = ReadinessResponse::from_checks(
        HashMap::from([("database".to_string(), database)]),
        schedule,
    );
    let status = match &response.status {
        ReadinessStatus::Ready => StatusCode::OK,
        ReadinessStatus::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_health_checkはhealthyを返す() {
        let app = Router::new().route("/health", get(health_check));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
