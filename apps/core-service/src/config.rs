//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。
//!
//! 値の取得元は関数で受け取る（[`CoreConfig::from_lookup`]）。
//! 本番は `std::env::var`、テストは固定のマップを渡す。

use std::{env, str::FromStr};

use chrono::FixedOffset;
use sgfman_infra::notification::{SmtpCredentials, SmtpSecurity};
use thiserror::Error;

/// 送信元アドレスの既定値
pub const DEFAULT_FROM_ADDRESS: &str = "info@superiorgrannyflats.com.au";

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// スケジュールの基準時刻（UTC からの固定オフセット）
    pub schedule_offset: FixedOffset,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationBackend {
    /// Mailpit（開発）/ SMTP リレー経由で送信
    Smtp,
    /// Amazon SES v2 経由で送信（本番）
    Ses,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 通知機能の設定
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:          NotificationBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:        String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:        u16,
    /// SMTP 接続の暗号化方式（未指定なら認証情報の有無で決まる）
    pub smtp_security:    SmtpSecurity,
    /// SMTP 認証情報（ユーザー名・パスワードの両方が設定された場合のみ）
    pub smtp_credentials: Option<SmtpCredentials>,
    /// 送信元メールアドレス
    pub from_address:     String,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の取得関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let offset_hours: i32 = parse_or(&lookup, "SCHEDULE_UTC_OFFSET_HOURS", 0)?;
        let schedule_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ConfigError::Invalid {
                name:  "SCHEDULE_UTC_OFFSET_HOURS",
                value: offset_hours.to_string(),
            }
        })?;

        Ok(Self {
            host: lookup("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "CORE_PORT", 5000)?,
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            schedule_offset,
            notification: NotificationConfig::from_lookup(&lookup)?,
        })
    }
}

impl NotificationConfig {
    fn from_lookup(lookup: &impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let smtp_credentials = match (lookup("SMTP_USERNAME"), lookup("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpCredentials { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("SMTP_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("SMTP_USERNAME")),
        };

        // 認証情報は平文では送らない
        let default_security = if smtp_credentials.is_some() {
            SmtpSecurity::StartTls
        } else {
            SmtpSecurity::None
        };
        let smtp_security = parse_or(lookup, "SMTP_SECURITY", default_security)?;
        if smtp_security == SmtpSecurity::None && smtp_credentials.is_some() {
            return Err(ConfigError::Invalid {
                name:  "SMTP_SECURITY",
                value: smtp_security.to_string(),
            });
        }

        Ok(Self {
            backend: parse_or(lookup, "NOTIFICATION_BACKEND", NotificationBackend::Noop)?,
            smtp_host: lookup("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
            smtp_port: parse_or(lookup, "SMTP_PORT", 1025)?,
            smtp_security,
            smtp_credentials,
            from_address: lookup("NOTIFICATION_FROM_ADDRESS")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
