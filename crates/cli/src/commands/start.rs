use std::sync::Arc;

use crate::commands::{load_config, runtime, CommandResult};
use illustra_core::access::AccessLedger;
use illustra_db::{connect_with_settings, migrations, JsonFileLedgerStore};

/// Everything the server does before it starts polling, without polling.
pub fn run() -> CommandResult {
    let config = match load_config("start") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("start") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;

        let store = JsonFileLedgerStore::new(
            config.access.authorized_users_path.clone(),
            config.access.pending_requests_path.clone(),
        );
        let ledger = AccessLedger::open(Arc::new(store), &config.access.initial_admin_ids)
            .await
            .map_err(|error| ("ledger", error.to_string(), 6u8))?;
        let record =
            ledger.authorizations().await.map_err(|error| ("ledger", error.to_string(), 6u8))?;
        Ok::<usize, (&'static str, String, u8)>(record.admins.len())
    });

    match result {
        Ok(0) => CommandResult::success(
            "start",
            "preflight passed; no admins configured, set access.initial_admin_ids to manage access",
        ),
        Ok(admins) => CommandResult::success(
            "start",
            format!(
                "preflight passed; operations chat {} with {admins} admin(s)",
                config.chat.operations_chat_id
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}
