//! # 通知送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（リレー / Mailpit）、SES（本番）、Noop（送信無効化）
//! - **送信元は送信実装が保持**: 起動時に設定から注入し、メッセージ側では持たない
//! - **認証情報は注入のみ**: SMTP のユーザー名・パスワードは環境変数から渡される

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use sgfman_domain::notification::{EmailMessage, NotificationError};
pub use ses::SesNotificationSender;
pub use smtp::{SmtpCredentials, SmtpNotificationSender, SmtpSecurity};

/// メール送信トレイト
///
/// 1 回の呼び出しで 1 通を送る。リトライはしない。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
