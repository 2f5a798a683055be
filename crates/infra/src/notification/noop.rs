//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! `NOTIFICATION_BACKEND` 未設定時の既定値。

use async_trait::async_trait;
use sgfman_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.text_body.len(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
