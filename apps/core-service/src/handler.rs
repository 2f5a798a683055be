//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲

pub mod health;
pub mod job;
pub mod notification;
pub mod settings;

pub use health::{ReadinessState, health_check, readiness_check};
pub use job::{JobState, create_job, delete_job, get_job, list_jobs, update_job};
pub use notification::{NotificationState, send_test_notification};
pub use settings::{SettingsState, get_settings, update_settings};
