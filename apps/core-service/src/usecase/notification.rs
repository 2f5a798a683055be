//! # 通知ユースケース
//!
//! 案件に対するメール通知の生成・送信・ログ記録と、定期バッチを統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによる本文生成
//! - [`service`] - 送信可否判定 + レンダリング + 送信 + ログ記録の統合サービス
//! - [`batch`] - 全案件へ定期ステータスメールを送るバッチ

pub mod batch;
pub mod service;
pub mod template_renderer;

pub use batch::{BatchRunner, BatchSummary};
pub use service::{DispatchOutcome, NotificationService};
pub use template_renderer::TemplateRenderer;
