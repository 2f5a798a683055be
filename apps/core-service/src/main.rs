//! # Core Service サーバー
//!
//! 案件管理 API と、顧客への定期ステータスメール送信を担うサービス。
//!
//! ## 役割
//!
//! - **案件管理**: 案件の一覧・作成・更新・削除（作成時に新規案件メールを送信）
//! - **通知設定**: 送信頻度と本文の管理
//! - **定期送信**: 送信頻度に従って全案件へステータスメールを送るタイマー
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | No | ポート番号（デフォルト: `5000`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | SMTP リレー（デフォルト: `localhost:1025`） |
//! | `SMTP_USERNAME` / `SMTP_PASSWORD` | No | SMTP 認証情報（両方指定した場合のみ使用） |
//! | `SMTP_SECURITY` | No | `none` / `starttls` / `tls`（デフォルト: 認証情報ありなら `starttls`） |
//! | `NOTIFICATION_FROM_ADDRESS` | No | 送信元アドレス |
//! | `SCHEDULE_UTC_OFFSET_HOURS` | No | 送信スケジュールの基準時刻オフセット（デフォルト: `0`） |
//! | `LOG_FORMAT` | No | `json` / `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（Mailpit 宛に送信）
//! NOTIFICATION_BACKEND=smtp cargo run -p sgfman-core-service
//!
//! # 本番環境
//! NOTIFICATION_BACKEND=ses DATABASE_URL=postgres://... cargo run -p sgfman-core-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use sgfman_core_service::{
    config::{CoreConfig, NotificationBackend, NotificationConfig},
    handler::{
        JobState,
        NotificationState,
        ReadinessState,
        SettingsState,
        create_job,
        delete_job,
        get_job,
        get_settings,
        health_check,
        list_jobs,
        readiness_check,
        send_test_notification,
        update_job,
        update_settings,
    },
    scheduler::ScheduleController,
    usecase::{
        JobUseCaseImpl,
        SettingsUseCaseImpl,
        notification::{BatchRunner, NotificationService, TemplateRenderer},
        settings::current_settings,
    },
};
use sgfman_domain::clock::{Clock, SystemClock};
use sgfman_infra::{
    db,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    repository::{
        JobRepository,
        NotificationSettingsRepository,
        PostgresJobRepository,
        PostgresNotificationLogRepository,
        PostgresNotificationSettingsRepository,
    },
};
use sgfman_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Core Service サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込み
/// 4. DB 接続・マイグレーション・設定行の作成
/// 5. 保存済みの送信頻度でタイマーを起動
/// 6. HTTP サーバーの起動（終了シグナルでタイマーも停止）
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    let tracing_config = TracingConfig::from_env("core-service");
    let _tracing_guard = init_tracing(tracing_config).entered();

    // 設定読み込み
    let config = CoreConfig::from_env()?;

    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("データベースに接続しました");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let job_repo: Arc<dyn JobRepository> = Arc::new(PostgresJobRepository::new(pool.clone()));
    let settings_repo: Arc<dyn NotificationSettingsRepository> =
        Arc::new(PostgresNotificationSettingsRepository::new(pool.clone()));
    let log_repo = Arc::new(PostgresNotificationLogRepository::new(pool.clone()));

    settings_repo.ensure_default().await?;

    // 通知パイプライン
    let sender = build_notification_sender(&config.notification).await?;
    let notification = Arc::new(NotificationService::new(
        sender,
        TemplateRenderer::new()?,
        log_repo,
        clock.clone(),
    ));

    // 定期送信タイマー
    let batch = Arc::new(BatchRunner::new(
        job_repo.clone(),
        settings_repo.clone(),
        notification.clone(),
    ));
    let scheduler = Arc::new(ScheduleController::new(
        batch,
        clock.clone(),
        config.schedule_offset,
    ));
    let initial = current_settings(settings_repo.as_ref()).await?;
    scheduler.reschedule(initial.email_frequency).await?;

    // ハンドラの共有状態
    let job_state = Arc::new(JobState {
        usecase: JobUseCaseImpl::new(
            job_repo,
            settings_repo.clone(),
            notification.clone(),
            clock,
        ),
    });
    let settings_state = Arc::new(SettingsState {
        usecase: SettingsUseCaseImpl::new(settings_repo.clone(), scheduler.clone()),
    });
    let notification_state = Arc::new(NotificationState {
        notification,
        settings_repo,
    });
    let readiness_state = Arc::new(ReadinessState {
        pool,
        scheduler: scheduler.clone(),
    });

    // ルーター構築
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state)
        .route("/api/jobs", get(list_jobs).post(create_job))
        .route(
            "/api/jobs/{id}",
            get(get_job).put(update_job).delete(delete_job),
        )
        .with_state(job_state)
        .route("/api/settings", get(get_settings).put(update_settings))
        .with_state(settings_state)
        .route("/api/notifications/test", post(send_test_notification))
        .with_state(notification_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    tracing::info!("Core Service サーバーを停止しました");

    Ok(())
}

/// 設定に応じてメール送信実装を選ぶ
async fn build_notification_sender(
    config: &NotificationConfig,
) -> anyhow::Result<Arc<dyn NotificationSender>> {
    let sender: Arc<dyn NotificationSender> = match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                "SMTP 経由でメールを送信します: {}:{} ({})",
                config.smtp_host,
                config.smtp_port,
                config.smtp_security
            );
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.smtp_security,
                config.smtp_credentials.clone(),
                config.from_address.clone(),
            )?)
        }
        NotificationBackend::Ses => {
            tracing::info!("Amazon SES 経由でメールを送信します");
            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await;
            Arc::new(SesNotificationSender::new(
                aws_sdk_sesv2::Client::new(&aws_config),
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Noop => {
            tracing::warn!("メール送信は無効です（NOTIFICATION_BACKEND=noop）");
            Arc::new(NoopNotificationSender)
        }
    };
    Ok(sender)
}

/// Ctrl+C（SIGINT）を待つ
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "終了シグナルの待機に失敗しました");
    }
}
