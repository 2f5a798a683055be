//! # sgfman インフラ層
//!
//! 外部システム（PostgreSQL、SMTP、Amazon SES）との接続を担当する。
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - 案件・通知設定・通知ログのリポジトリ
//! - [`notification`] - メール送信（SMTP / SES / Noop）
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
