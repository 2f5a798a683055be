//! # API レスポンスエンベロープ
//!
//! 公開 API の統一レスポンス形式 `{ "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 公開 API の統一レスポンス型
///
/// 案件・設定・手動通知のすべてのエンドポイントは `{ "data": T }` 形式で返す。
///
/// ```
/// use sgfman_shared::ApiResponse;
///
/// let response = ApiResponse::new(vec!["12 Wattle Rd"]);
/// assert_eq!(response.data.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
