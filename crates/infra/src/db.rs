//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成、マイグレーション実行、疎通確認を行う。
//!
//! ## 設計方針
//!
//! - **接続プール**: 起動時に一度だけ作成し、全リポジトリで共有する
//! - **マイグレーション埋め込み**: `migrations/` を `sqlx::migrate!` でバイナリに埋め込む

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::InfraError;

/// データベースマイグレーションを実行する
///
/// 適用済みのマイグレーションはスキップされる。
/// sqlx が advisory lock を取るため、複数プロセスから同時に呼んでも安全。
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL 接続プールを作成する
///
/// # 設定値
///
/// - `max_connections(10)`: 定期バッチは逐次処理のため小さめで十分
/// - `acquire_timeout(5秒)`: 超過時はエラー（バッチはその回を中断する）
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// 疎通確認（Readiness Check 用）
#[tracing::instrument(skip_all, level = "debug")]
pub async fn ping(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
