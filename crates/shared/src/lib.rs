//! # sgfman 共有ユーティリティ
//!
//! 全クレートで使用される、ビジネスロジックを含まない共通部品。
//!
//! ## 設計方針
//!
//! - API エンベロープ・エラーボディ・ヘルスチェック型などの純粋なデータ構造
//! - ログ出力の規約（ビジネスイベント、トレーシング初期化）
//! - axum など Web フレームワークには依存しない

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod health;
#[cfg(feature = "observability")]
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
