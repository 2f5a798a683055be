//! # 通知
//!
//! 顧客向けメール通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`NotificationType`] | 通知種別 | 定期ステータス（status）と新規案件（new）の 2 種類 |
//! | [`Eligibility`] | 送信可否 | 案件と通知種別から送信すべきかを判定した結果 |
//! | [`EmailMessage`] | メールメッセージ | 送信直前の宛先・件名・本文 |
//!
//! ## 設計方針
//!
//! - **判定は純粋関数**: [`check_eligibility`] は副作用を持たない
//! - **fire-and-forget**: 通知送信の失敗は案件操作やバッチ全体に影響しない

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::job::Job;

define_uuid_id! {
    /// 通知ログ ID（一意識別子）
    ///
    /// notification_logs テーブルの主キー。UUID v7 を使用。
    pub struct NotificationLogId;
}

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// 通知種別
///
/// notification_logs テーブルの `notification_type` カラムと
/// 手動送信 API の `type` に使われる値（小文字）。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// 定期ステータス更新
    Status,
    /// 新規案件の受付
    New,
}

impl NotificationType {
    /// 件名
    pub fn subject(self) -> &'static str {
        match self {
            Self::Status => "Superior Granny Flats - Project Update",
            Self::New => "Superior Granny Flats - New Project",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
/// 送信元アドレスは送信実装側が保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// プレーンテキスト本文
    pub text_body: String,
}

/// 送信を見送る理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// 主連絡先メールアドレスが未設定
    MissingEmail,
    /// 案件が完了済み（定期ステータスのみ）
    ProjectComplete,
}

/// 送信可否の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// 案件と通知種別から送信可否を判定する
///
/// - status: `email1` 未設定、またはステータスが Complete なら見送り
/// - new: `email1` 未設定のときだけ見送り（ステータスは見ない）
pub fn check_eligibility(job: &Job, notification_type: NotificationType) -> Eligibility {
    if job.email1().is_none() {
        return Eligibility::Skip(SkipReason::MissingEmail);
    }

    match notification_type {
        NotificationType::Status if job.status().is_complete() => {
            Eligibility::Skip(SkipReason::ProjectComplete)
        }
        NotificationType::Status | NotificationType::New => Eligibility::Eligible,
    }
}

/// [`check_eligibility`] の bool 版
pub fn is_eligible(job: &Job, notification_type: NotificationType) -> bool {
    check_eligibility(job, notification_type).is_eligible()
}
