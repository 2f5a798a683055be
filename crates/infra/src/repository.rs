//! # リポジトリ実装
//!
//! 案件・通知設定・通知ログの永続化を担当する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: ユースケース層は `Arc<dyn Trait>` で受け取り、
//!   テストでは [`crate::mock`] のインメモリ実装に差し替える
//! - **実行時クエリ**: `sqlx::query_as` + `FromRow` で行を読み、ドメイン型へは `From` で変換する

pub mod job_repository;
pub mod notification_log_repository;
pub mod notification_settings_repository;

pub use job_repository::{JobRepository, PostgresJobRepository};
pub use notification_log_repository::{
    DeliveryStatus,
    NotificationLog,
    NotificationLogRepository,
    PostgresNotificationLogRepository,
};
pub use notification_settings_repository::{
    NotificationSettingsRepository,
    PostgresNotificationSettingsRepository,
};
