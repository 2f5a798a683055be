//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・送信実装・時計を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `job`: 案件 CRUD と新規案件メール
//! - `settings`: 通知設定とタイマーの差し替え
//! - `notification`: 通知パイプラインと定期バッチ

pub mod job;
pub mod notification;
pub mod settings;

pub use job::JobUseCaseImpl;
pub use settings::{SettingsUseCaseImpl, UpdateSettingsInput};
