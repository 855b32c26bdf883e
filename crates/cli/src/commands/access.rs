use std::sync::Arc;

use crate::commands::{load_config, runtime, CommandResult};
use illustra_core::access::{AccessLedger, LedgerError};
use illustra_core::domain::user::UserId;
use illustra_db::JsonFileLedgerStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessAction {
    List,
    Pending,
    AddUser(UserId),
    RemoveUser(UserId),
    AddAdmin(UserId),
}

impl AccessAction {
    fn command_name(self) -> &'static str {
        match self {
            Self::List => "access list",
            Self::Pending => "access pending",
            Self::AddUser(_) => "access add-user",
            Self::RemoveUser(_) => "access remove-user",
            Self::AddAdmin(_) => "access add-admin",
        }
    }
}

/// Works on the same ledger files the running bot reads, so changes apply on the next message.
pub fn run(action: AccessAction) -> CommandResult {
    let command = action.command_name();
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let store = JsonFileLedgerStore::new(
            config.access.authorized_users_path.clone(),
            config.access.pending_requests_path.clone(),
        );
        let ledger = AccessLedger::open(Arc::new(store), &config.access.initial_admin_ids).await?;
        apply(&ledger, action).await
    });

    match result {
        Ok(message) => CommandResult::success(command, message),
        Err(error) => CommandResult::failure(command, "ledger", error.to_string(), 6),
    }
}

async fn apply(ledger: &AccessLedger, action: AccessAction) -> Result<String, LedgerError> {
    let message = match action {
        AccessAction::List => {
            let record = ledger.authorizations().await?;
            format!("admins: [{}]; users: [{}]", join_ids(&record.admins), join_ids(&record.users))
        }
        AccessAction::Pending => {
            let pending = ledger.pending_requests().await?;
            if pending.is_empty() {
                "no pending requests".to_string()
            } else {
                pending
                    .iter()
                    .map(|request| {
                        format!(
                            "{} {} ({}) requested {}",
                            request.user_id,
                            request.user_name,
                            request.handle(),
                            request.timestamp.to_rfc3339()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
        AccessAction::AddUser(user) => {
            if ledger.add_user(user).await? {
                format!("user {user} authorized")
            } else {
                ledger.remove_pending_request(user).await?;
                format!("user {user} is already authorized")
            }
        }
        AccessAction::RemoveUser(user) => {
            if ledger.remove_user(user).await? {
                format!("user {user} removed")
            } else {
                format!("user {user} was not in the authorized list")
            }
        }
        AccessAction::AddAdmin(user) => {
            if ledger.add_admin(user).await? {
                format!("user {user} is now an admin")
            } else {
                format!("user {user} is already an admin")
            }
        }
    };
    Ok(message)
}

fn join_ids(ids: &[UserId]) -> String {
    ids.iter().map(UserId::to_string).collect::<Vec<_>>().join(", ")
}
