//! # sgfman ドメイン層
//!
//! 案件管理と顧客通知のビジネスルールを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、メール送信）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`job`] - 案件エンティティとステータス
//! - [`notification_settings`] - 送信頻度とテンプレート本文のシングルトン設定
//! - [`notification`] - 通知種別・送信可否判定・メールメッセージ
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメイン層エラー

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod job;
pub mod notification;
pub mod notification_settings;

pub use error::DomainError;
