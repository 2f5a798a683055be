//! # テスト用モック
//!
//! ユースケース・スケジューラ・ハンドラのテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! sgfman-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashSet,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use sgfman_domain::{
    job::{Job, JobId},
    notification::{EmailMessage, NotificationError},
    notification_settings::NotificationSettings,
};

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::{
        JobRepository,
        NotificationLog,
        NotificationLogRepository,
        NotificationSettingsRepository,
    },
};

// ===== MockJobRepository =====

#[derive(Clone, Default)]
pub struct MockJobRepository {
    jobs:        Arc<Mutex<Vec<Job>>>,
    fail_reads:  Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let repo = Self::new();
        *repo.jobs.lock().unwrap() = jobs;
        repo
    }

    /// 以降の読み込み（find_all / find_by_id）をすべて失敗させる
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// 以降の書き込み（insert / update / delete）をすべて失敗させる
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    fn check(flag: &AtomicBool) -> Result<(), InfraError> {
        if flag.load(Ordering::SeqCst) {
            return Err(InfraError::from(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn find_all(&self) -> Result<Vec<Job>, InfraError> {
        Self::check(&self.fail_reads)?;
        Ok(self.jobs())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, InfraError> {
        Self::check(&self.fail_reads)?;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id() == id)
            .cloned())
    }

    async fn insert(&self, job: &Job) -> Result<(), InfraError> {
        Self::check(&self.fail_writes)?;
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn update(&self, job: &Job) -> Result<bool, InfraError> {
        Self::check(&self.fail_writes)?;
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.iter_mut().find(|j| j.id() == job.id()) {
            Some(existing) => {
                *existing = job.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &JobId) -> Result<bool, InfraError> {
        Self::check(&self.fail_writes)?;
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|j| j.id() != id);
        Ok(jobs.len() < before)
    }
}

// ===== MockNotificationSettingsRepository =====

/// 初期状態は「行なし」。`ensure_default` か `save` で行が作られる。
#[derive(Clone, Default)]
pub struct MockNotificationSettingsRepository {
    settings:    Arc<Mutex<Option<NotificationSettings>>>,
    fail_reads:  Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockNotificationSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: NotificationSettings) -> Self {
        let repo = Self::new();
        *repo.settings.lock().unwrap() = Some(settings);
        repo
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<NotificationSettings> {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSettingsRepository for MockNotificationSettingsRepository {
    async fn find(&self) -> Result<Option<NotificationSettings>, InfraError> {
        MockJobRepository::check(&self.fail_reads)?;
        Ok(self.stored())
    }

    async fn ensure_default(&self) -> Result<(), InfraError> {
        MockJobRepository::check(&self.fail_writes)?;
        self.settings
            .lock()
            .unwrap()
            .get_or_insert_with(NotificationSettings::default);
        Ok(())
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<(), InfraError> {
        MockJobRepository::check(&self.fail_writes)?;
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

// ===== MockNotificationLogRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationLogRepository {
    logs: Arc<Mutex<Vec<NotificationLog>>>,
}

impl MockNotificationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<NotificationLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationLogRepository for MockNotificationLogRepository {
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

// ===== MockNotificationSender =====

/// 送信したメールを記録するモック
///
/// [`fail_for`](MockNotificationSender::fail_for) で指定した宛先への送信は失敗させる。
/// 失敗した送信は `sent_emails` に含まれない。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:          Arc<Mutex<Vec<EmailMessage>>>,
    failing_rcpts: Arc<Mutex<HashSet<String>>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, to: impl Into<String>) {
        self.failing_rcpts.lock().unwrap().insert(to.into());
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing_rcpts.lock().unwrap().contains(&email.to) {
            return Err(NotificationError::SendFailed(format!(
                "SMTP 送信失敗: {} への接続が拒否されました",
                email.to
            )));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
