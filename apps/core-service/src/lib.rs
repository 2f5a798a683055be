//! # Core Service ライブラリ
//!
//! Core Service の設定・ユースケース・スケジューラ・ハンドラを公開する。
//! 統合テストからルーターを組み立てられるようにするため、バイナリとは別に公開する。

pub mod config;
pub mod error;
pub mod handler;
pub mod scheduler;
pub mod usecase;
