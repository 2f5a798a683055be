//! # JobRepository
//!
//! 案件の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み込み時に正規化**: 行 → [`Job`] の変換は必ず `Job::from_db` を通し、
//!   未知のステータスや空メールをここで既定値に倒す
//! - **一括読み込み**: 定期バッチは毎回 [`find_all`](JobRepository::find_all) で全件を読む

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sgfman_domain::job::{Job, JobFields, JobId, ProjectStatus, YesNo};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// 案件リポジトリトレイト
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 全案件を作成日時順で取得する
    async fn find_all(&self) -> Result<Vec<Job>, InfraError>;

    /// ID で案件を検索する
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, InfraError>;

    /// 案件を挿入する
    async fn insert(&self, job: &Job) -> Result<(), InfraError>;

    /// 案件を更新する（存在しなければ `false`）
    async fn update(&self, job: &Job) -> Result<bool, InfraError>;

    /// 案件を削除する（存在しなければ `false`）
    async fn delete(&self, id: &JobId) -> Result<bool, InfraError>;
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, address, finish, class, name1, name2, email1, email2, notes,
        price, target_date, colors, windows, contract, status, deposit_amount,
        concept_drawings_confirmed, working_drawings_confirmed, energy_report,
        created_at, updated_at
    FROM jobs
"#;

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    address: String,
    finish: Option<String>,
    #[sqlx(rename = "class")]
    class_name: Option<String>,
    name1: Option<String>,
    name2: Option<String>,
    email1: Option<String>,
    email2: Option<String>,
    notes: Option<String>,
    price: Option<i64>,
    target_date: Option<NaiveDate>,
    colors: Option<String>,
    windows: Option<String>,
    contract: Option<String>,
    status: Option<String>,
    deposit_amount: Option<i64>,
    concept_drawings_confirmed: String,
    working_drawings_confirmed: String,
    energy_report: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let fields = JobFields {
            address: row.address,
            finish: row.finish,
            class_name: row.class_name,
            name1: row.name1,
            name2: row.name2,
            email1: row.email1,
            email2: row.email2,
            notes: row.notes,
            price: row.price,
            target_date: row.target_date,
            colors: row.colors,
            windows: row.windows,
            contract: row.contract,
            status: ProjectStatus::normalize(row.status.as_deref()),
            deposit_amount: row.deposit_amount,
            concept_drawings_confirmed: YesNo::normalize(Some(&row.concept_drawings_confirmed)),
            working_drawings_confirmed: YesNo::normalize(Some(&row.working_drawings_confirmed)),
            energy_report: YesNo::normalize(Some(&row.energy_report)),
        };
        Job::from_db(
            JobId::from_uuid(row.id),
            fields,
            row.created_at,
            row.updated_at,
        )
    }
}

/// PostgreSQL 実装の JobRepository
#[derive(Debug, Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<Job>, InfraError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Job::from).collect())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, InfraError> {
        let row: Option<JobRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Job::from))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %job.id()))]
    async fn insert(&self, job: &Job) -> Result<(), InfraError> {
        let f = job.fields();
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, address, finish, class, name1, name2, email1, email2, notes,
                price, target_date, colors, windows, contract, status, deposit_amount,
                concept_drawings_confirmed, working_drawings_confirmed, energy_report,
                created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            "#,
        )
        .bind(job.id().as_uuid())
        .bind(&f.address)
        .bind(&f.finish)
        .bind(&f.class_name)
        .bind(&f.name1)
        .bind(&f.name2)
        .bind(&f.email1)
        .bind(&f.email2)
        .bind(&f.notes)
        .bind(f.price)
        .bind(f.target_date)
        .bind(&f.colors)
        .bind(&f.windows)
        .bind(&f.contract)
        .bind(f.status.as_str())
        .bind(f.deposit_amount)
        .bind(f.concept_drawings_confirmed.as_str())
        .bind(f.working_drawings_confirmed.as_str())
        .bind(f.energy_report.as_str())
        .bind(job.created_at())
        .bind(job.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %job.id()))]
    async fn update(&self, job: &Job) -> Result<bool, InfraError> {
        let f = job.fields();
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                address = $2, finish = $3, class = $4, name1 = $5, name2 = $6,
                email1 = $7, email2 = $8, notes = $9, price = $10, target_date = $11,
                colors = $12, windows = $13, contract = $14, status = $15,
                deposit_amount = $16, concept_drawings_confirmed = $17,
                working_drawings_confirmed = $18, energy_report = $19, updated_at = $20
            WHERE id = $1
            "#,
        )
        .bind(job.id().as_uuid())
        .bind(&f.address)
        .bind(&f.finish)
        .bind(&f.class_name)
        .bind(&f.name1)
        .bind(&f.name2)
        .bind(&f.email1)
        .bind(&f.email2)
        .bind(&f.notes)
        .bind(f.price)
        .bind(f.target_date)
        .bind(&f.colors)
        .bind(&f.windows)
        .bind(&f.contract)
        .bind(f.status.as_str())
        .bind(f.deposit_amount)
        .bind(f.concept_drawings_confirmed.as_str())
        .bind(f.working_drawings_confirmed.as_str())
        .bind(f.energy_report.as_str())
        .bind(job.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &JobId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
