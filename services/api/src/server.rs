use crate::cli::ServeArgs;
use crate::infra::{AppState, LocalBlobStore, LogNotifier, SmtpNotifier};
use crate::routes::{cors_layer, ops_routes};
use axum::extract::DefaultBodyLimit;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Duration;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tenant_exit::config::{AppConfig, ConfigError};
use tenant_exit::error::AppError;
use tenant_exit::telemetry;
use tenant_exit::workflows::moveout::{
    moveout_router, InMemoryRecordStore, MoveOutState, Notifier, ServiceError, SessionManager,
    UserRegistry,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let users = load_users(&config)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let files = Arc::new(LocalBlobStore::new(
        config.storage.blob_root.clone(),
        config.storage.public_base_url.clone(),
    ));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };
    let notifier = build_notifier(&config)?;

    let sessions = SessionManager::new(
        config.session.secret.clone(),
        Duration::minutes(config.session.ttl_minutes),
    )
    .with_secure_cookie(config.session.cookie_secure);
    let ops = ops_routes(files.root());
    let moveout = MoveOutState::new(
        Arc::new(InMemoryRecordStore::new()),
        files,
        notifier,
        users,
        Arc::new(sessions),
    );

    let app = moveout_router(moveout)
        .merge(ops)
        .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(cors_layer(config.server.cors_origins.clone()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tenant exit service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn load_users(config: &AppConfig) -> Result<UserRegistry, AppError> {
    match &config.users_file {
        Some(path) => {
            let users = UserRegistry::from_path(path)?;
            info!(path = %path.display(), accounts = users.len(), "loaded user registry");
            Ok(users)
        }
        None if config.environment.is_production() => Err(ConfigError::MissingUsersFile.into()),
        None => {
            warn!("APP_USERS_FILE not set; using built-in demo accounts");
            Ok(UserRegistry::demo())
        }
    }
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>, AppError> {
    let sender = &config.notifications.sender;
    match &config.notifications.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(sender, smtp).map_err(ServiceError::from)?;
            info!(
                host = %smtp.host,
                port = smtp.port,
                security = ?smtp.security,
                "mail goes through smtp relay"
            );
            Ok(Arc::new(notifier))
        }
        None => {
            if config.environment.is_production() {
                warn!("APP_SMTP_HOST not set; emails are logged and never delivered");
            }
            Ok(Arc::new(LogNotifier::new(sender.clone())))
        }
    }
}
