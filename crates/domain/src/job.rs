//! # 案件（Job）
//!
//! グラニーフラット建築案件の記録を定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`Job`] | 案件 | 1 件の建築プロジェクトとその顧客情報 |
//! | [`ProjectStatus`] | 進捗ステータス | 設計 → 都市計画 → 建築確認 → 着工 → 完了 |
//! | [`YesNo`] | 確認フラグ | 図面・エネルギーレポートの確認状態 |
//!
//! ## 設計方針
//!
//! - **正規化は 1 箇所に集約**: `Job::new` / `Job::updated` / `Job::from_db` は
//!   すべて [`JobFields::normalized`] を通す。利用側でデフォルト値を再計算しない
//! - **空メールは「未設定」**: 空文字・空白のみのメールアドレスは `None` に正規化する
//! - **ステータスは常に 6 値のいずれか**: 未設定・未知の保存値は `Design Phase` に倒す

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

define_uuid_id! {
    /// 案件 ID（一意識別子）
    ///
    /// 作成時に UUID v7 で採番され、以後変更されない。
    pub struct JobId;
}

/// 案件の進捗ステータス
///
/// 表示ラベル（`"Design Phase"` 等）がそのまま永続化・API の値になる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum ProjectStatus {
    #[default]
    #[strum(serialize = "Design Phase")]
    #[serde(rename = "Design Phase")]
    DesignPhase,
    #[strum(serialize = "Town Planning")]
    #[serde(rename = "Town Planning")]
    TownPlanning,
    #[strum(serialize = "With Building Surveyor")]
    #[serde(rename = "With Building Surveyor")]
    WithBuildingSurveyor,
    #[strum(serialize = "Building Permit Issued")]
    #[serde(rename = "Building Permit Issued")]
    BuildingPermitIssued,
    #[strum(serialize = "In Construction")]
    #[serde(rename = "In Construction")]
    InConstruction,
    Complete,
}

impl ProjectStatus {
    /// 保存値を正規化する
    ///
    /// 未設定・空文字・未知のラベルはすべて [`ProjectStatus::DesignPhase`] になる。
    pub fn normalize(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// 表示ラベルを返す
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Yes / No の確認フラグ（既定は No）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    /// 保存値を正規化する（`"Yes"` 以外はすべて No）
    pub fn normalize(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// 案件の可変フィールド一式
///
/// 作成・更新リクエストと DB 行の両方からこの型を組み立て、
/// [`Job`] に渡す前に [`normalized`](JobFields::normalized) で正規化する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFields {
    pub address: String,
    pub finish: Option<String>,
    pub class_name: Option<String>,
    pub name1: Option<String>,
    pub name2: Option<String>,
    pub email1: Option<String>,
    pub email2: Option<String>,
    pub notes: Option<String>,
    /// 価格（ドル単位の整数）
    pub price: Option<i64>,
    /// 目標日
    pub target_date: Option<NaiveDate>,
    pub colors: Option<String>,
    pub windows: Option<String>,
    pub contract: Option<String>,
    pub status: ProjectStatus,
    /// 手付金（ドル単位の整数）
    pub deposit_amount: Option<i64>,
    pub concept_drawings_confirmed: YesNo,
    pub working_drawings_confirmed: YesNo,
    pub energy_report: YesNo,
}

impl JobFields {
    /// テキスト項目を trim し、空になった項目を `None` に倒す
    pub fn normalized(self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            finish: non_blank(self.finish),
            class_name: non_blank(self.class_name),
            name1: non_blank(self.name1),
            name2: non_blank(self.name2),
            email1: non_blank(self.email1),
            email2: non_blank(self.email2),
            notes: non_blank(self.notes),
            colors: non_blank(self.colors),
            windows: non_blank(self.windows),
            contract: non_blank(self.contract),
            ..self
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 案件エンティティ
///
/// ID は作成時に確定し不変。フィールドは常に正規化済み。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id:         JobId,
    fields:     JobFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Job {
    /// 新しい案件を作成する
    pub fn new(id: JobId, fields: JobFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fields: fields.normalized(),
            created_at: now,
            updated_at: now,
        }
    }

    /// DB から復元する
    pub fn from_db(
        id: JobId,
        fields: JobFields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields: fields.normalized(),
            created_at,
            updated_at,
        }
    }

    /// フィールドを置き換えた新しい状態を返す（ID・作成日時は維持）
    pub fn updated(self, fields: JobFields, now: DateTime<Utc>) -> Self {
        Self {
            fields: fields.normalized(),
            updated_at: now,
            ..self
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn fields(&self) -> &JobFields {
        &self.fields
    }

    pub fn address(&self) -> &str {
        &self.fields.address
    }

    pub fn name1(&self) -> Option<&str> {
        self.fields.name1.as_deref()
    }

    /// 主連絡先メールアドレス（通知の宛先）
    pub fn email1(&self) -> Option<&str> {
        self.fields.email1.as_deref()
    }

    pub fn status(&self) -> ProjectStatus {
        self.fields.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Some("Design Phase"), ProjectStatus::DesignPhase)]
    #[case(Some("Town Planning"), ProjectStatus::TownPlanning)]
    #[case(Some("With Building Surveyor"), ProjectStatus::WithBuildingSurveyor)]
    #[case(Some("Building Permit Issued"), ProjectStatus::BuildingPermitIssued)]
    #[case(Some("In Construction"), ProjectStatus::InConstruction)]
    #[case(Some("Complete"), ProjectStatus::Complete)]
    #[case(Some(" Complete "), ProjectStatus::Complete)]
    #[case(None, ProjectStatus::DesignPhase)]
    #[case(Some(""), ProjectStatus::DesignPhase)]
    #[case(Some("Demolished"), ProjectStatus::DesignPhase)]
    fn test_project_status_normalizeの結果(
        #[case] input: Option<&str>,
        #[case] expected: ProjectStatus,
    ) {
        assert_eq!(ProjectStatus::normalize(input), expected);
    }

    #[test]
    fn test_project_statusのラベルがserdeとstrumで一致する() {
        use strum::IntoEnumIterator;

        for status in ProjectStatus::iter() {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::json!(status.as_str()));
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[rstest]
    #[case(Some("Yes"), YesNo::Yes)]
    #[case(Some("No"), YesNo::No)]
    #[case(Some("yes"), YesNo::No)]
    #[case(None, YesNo::No)]
    fn test_yes_no_normalizeの結果(#[case] input: Option<&str>, #[case] expected: YesNo) {
        assert_eq!(YesNo::normalize(input), expected);
    }

    #[test]
    fn test_newで空白のみのメールがnoneに正規化される() {
        let fields = JobFields {
            address: "  1 Test St  ".to_string(),
            email1: Some("   ".to_string()),
            email2: Some("".to_string()),
            name1: Some(" Jane ".to_string()),
            ..Default::default()
        };

        let job = Job::new(JobId::new(), fields, Utc::now());

        assert_eq!(job.email1(), None);
        assert_eq!(job.fields().email2, None);
        assert_eq!(job.name1(), Some("Jane"));
        assert_eq!(job.address(), "1 Test St");
    }

    #[test]
    fn test_newでステータス未指定ならdesign_phaseになる() {
        let job = Job::new(JobId::new(), JobFields::default(), Utc::now());

        assert_eq!(job.status(), ProjectStatus::DesignPhase);
        assert_eq!(job.fields().energy_report, YesNo::No);
    }

    #[test]
    fn test_updatedでidと作成日時が維持される() {
        let created = Utc::now();
        let job = Job::new(JobId::new(), JobFields::default(), created);
        let id = job.id().clone();
        let later = created + chrono::Duration::minutes(5);

        let updated = job.updated(
            JobFields {
                status: ProjectStatus::Complete,
                ..Default::default()
            },
            later,
        );

        assert_eq!(updated.id(), &id);
        assert_eq!(updated.created_at(), created);
        assert_eq!(updated.updated_at(), later);
        assert_eq!(updated.status(), ProjectStatus::Complete);
    }
}
