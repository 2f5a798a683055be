//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで顧客向けメール本文（プレーンテキスト）を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **固定の骨格 + 設定本文**: 挨拶・案件情報・署名は固定。設定画面で編集した本文は
//!   変数として差し込むだけで、中の `{{ ... }}` は展開しない
//! - **エスケープなし**: 自動エスケープを無効化し、値をそのまま出力する

use sgfman_domain::{
    job::Job,
    notification::{NotificationError, NotificationType},
    notification_settings::NotificationSettings,
};
use tera::{Context, Tera};

/// 顧客名が未設定の場合の呼びかけ
const FALLBACK_CLIENT_NAME: &str = "Client";

/// テンプレートレンダラー
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);

        engine
            .add_raw_templates(vec![
                (
                    template_name(NotificationType::Status),
                    include_str!("../../../templates/notifications/status_update.txt"),
                ),
                (
                    template_name(NotificationType::New),
                    include_str!("../../../templates/notifications/new_job.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// 案件・設定・通知種別から本文を生成する
    pub fn render(
        &self,
        job: &Job,
        settings: &NotificationSettings,
        notification_type: NotificationType,
    ) -> Result<String, NotificationError> {
        let custom_text = match notification_type {
            NotificationType::Status => &settings.status_template,
            NotificationType::New => &settings.new_job_template,
        };

        let mut context = Context::new();
        context.insert("client_name", job.name1().unwrap_or(FALLBACK_CLIENT_NAME));
        context.insert("address", job.address());
        context.insert("status", job.status().as_str());
        context.insert("custom_text", custom_text);

        self.engine
            .render(template_name(notification_type), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))
    }
}

fn template_name(notification_type: NotificationType) -> &'static str {
    match notification_type {
        NotificationType::Status => "status_update.txt",
        NotificationType::New => "new_job.txt",
    }
}
