//! # 通知設定
//!
//! 定期ステータスメールの頻度と本文テンプレートを保持するシングルトン設定。
//!
//! ## 設計方針
//!
//! - **常に 1 行**: 設定が存在しない場合は [`NotificationSettings::default`] を使う
//! - **頻度は閉じた集合**: 未知のラベルはエラーにせず Weekly に倒す
//!   （[`EmailFrequency::from_label_or_default`]）

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// 既定の定期ステータスメール本文
pub const DEFAULT_STATUS_TEMPLATE: &str = "This is the default status update email.";

/// 既定の新規案件メール本文
pub const DEFAULT_NEW_JOB_TEMPLATE: &str = "This is the default new job email.";

/// 定期ステータスメールの送信頻度
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
pub enum EmailFrequency {
    #[strum(serialize = "Every 2 Minutes")]
    #[serde(rename = "Every 2 Minutes")]
    EveryTwoMinutes,
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl EmailFrequency {
    /// ラベルを厳密にパースする（未知のラベルは `None`）
    pub fn parse_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    /// ラベルをパースし、未知のラベルは Weekly に倒す
    pub fn from_label_or_default(label: &str) -> Self {
        Self::parse_label(label).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// 通知設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub email_frequency: EmailFrequency,
    /// 定期ステータスメールの末尾に差し込む本文
    pub status_template: String,
    /// 新規案件メールの末尾に差し込む本文
    pub new_job_template: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_frequency: EmailFrequency::default(),
            status_template: DEFAULT_STATUS_TEMPLATE.to_string(),
            new_job_template: DEFAULT_NEW_JOB_TEMPLATE.to_string(),
        }
    }
}
