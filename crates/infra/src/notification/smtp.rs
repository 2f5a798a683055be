//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に平文で、認証付きのリレーには
//! STARTTLS または TLS で接続する。

use std::fmt;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Message, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use sgfman_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// SMTP 接続の暗号化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SmtpSecurity {
    /// 平文（Mailpit 向け。認証情報とは併用しない）
    None,
    /// 平文で接続後に STARTTLS で昇格（例: ポート 587）
    StartTls,
    /// 接続時から TLS（例: ポート 465）
    Tls,
}

/// SMTP 認証情報
///
/// 環境変数から注入する。`Debug` 出力ではパスワードをマスクする。
#[derive(Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpNotificationSender {
    transport:    AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host` / `port`: SMTP サーバー（例: Mailpit の `localhost:1025`）
    /// - `security`: 暗号化方式
    /// - `credentials`: 認証が必要なリレーの場合に指定
    /// - `from_address`: 送信元メールアドレス
    ///
    /// 平文接続に認証情報を渡した場合はエラーを返す。
    pub fn new(
        host: &str,
        port: u16,
        security: SmtpSecurity,
        credentials: Option<SmtpCredentials>,
        from_address: String,
    ) -> Result<Self, NotificationError> {
        let builder = match security {
            SmtpSecurity::None => {
                if credentials.is_some() {
                    return Err(NotificationError::SendFailed(
                        "平文の SMTP 接続では認証情報を使用できません".to_string(),
                    ));
                }
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            }
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotificationError::SendFailed(format!("SMTP TLS 設定失敗: {e}")))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| NotificationError::SendFailed(format!("SMTP TLS 設定失敗: {e}")))?,
        };

        let mut builder = builder.port(port);
        if let Some(credentials) = credentials {
            builder =
                builder.credentials(Credentials::new(credentials.username, credentials.password));
        }

        Ok(Self {
            transport: builder.build(),
            from_address,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotificationError> {
        Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone())
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}
