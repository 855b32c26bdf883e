use std::sync::Arc;

use illustra_chat::{
    bot_dispatcher, ChatNotifier, ChatOutbound, IntakeBot, NoopOutbound, NoopUpdateSource,
    PollingRunner, ReconnectPolicy,
};
use illustra_core::access::{AccessLedger, LedgerError};
use illustra_core::config::{AppConfig, ConfigError};
use illustra_core::flows::FlowEngine;
use illustra_core::intake::{IntakeService, StatusBridge, SubmissionDispatcher};
use illustra_core::ports::{IntakeNotifier, RequestSheet};
use illustra_db::{connect_with_settings, migrations, DbPool, JsonFileLedgerStore, SqlRequestSheet};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub ledger: Arc<AccessLedger>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("authorization ledger could not be opened: {0}")]
    Ledger(#[from] LedgerError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    // A corrupt ledger file stops startup here; only missing files are seeded.
    let store = Arc::new(JsonFileLedgerStore::new(
        config.access.authorized_users_path.clone(),
        config.access.pending_requests_path.clone(),
    ));
    let ledger = Arc::new(AccessLedger::open(store, &config.access.initial_admin_ids).await?);
    info!(
        event_name = "system.bootstrap.ledger_opened",
        correlation_id = "bootstrap",
        authorized_users_path = %config.access.authorized_users_path.display(),
        pending_requests_path = %config.access.pending_requests_path.display(),
        "authorization ledger opened"
    );

    let outbound: Arc<dyn ChatOutbound> = Arc::new(NoopOutbound);
    let sheet: Arc<dyn RequestSheet> = Arc::new(SqlRequestSheet::new(db_pool.clone()));
    let notifier: Arc<dyn IntakeNotifier> = Arc::new(ChatNotifier::new(outbound.clone()));
    let intake = Arc::new(IntakeService::new(
        FlowEngine::default(),
        SubmissionDispatcher::new(sheet.clone(), notifier.clone(), config.chat.operations_chat()),
    ));
    let status = Arc::new(StatusBridge::new(sheet.clone(), notifier));
    let bot = Arc::new(IntakeBot::new(ledger.clone(), intake, status, sheet, outbound));

    let runner = PollingRunner::new(
        Arc::new(NoopUpdateSource),
        bot_dispatcher(bot),
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, ledger, runner })
}
