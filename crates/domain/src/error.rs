//! # ドメイン層エラー定義
//!
//! 入力値の検証失敗や存在しない案件の参照を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗（未知のステータス等） |
//! | `NotFound` | 404 Not Found | 案件が存在しない |

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Job" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}
