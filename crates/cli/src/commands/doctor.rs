use std::path::Path;
use std::sync::Arc;

use crate::commands::CommandResult;
use illustra_core::access::AccessLedger;
use illustra_core::config::{AppConfig, LoadOptions};
use illustra_db::{connect_with_settings, JsonFileLedgerStore};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 3] =
    ["bot_token_readiness", "ledger_files", "database_connectivity"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 7 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bot_token(&config));
            checks.push(check_ledger_files(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// The config contract already rejects malformed tokens; this reports which bot is configured.
fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    let token = config.chat.bot_token.expose_secret();
    let bot_id = token.split_once(':').map_or("<unknown>", |(bot_id, _)| bot_id);
    DoctorCheck {
        name: "bot_token_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "token for bot {bot_id} is well formed; alerts go to chat {}",
            config.chat.operations_chat_id
        ),
    }
}

/// Missing files are fine (they are seeded on open); unreadable ones are not.
fn check_ledger_files(config: &AppConfig) -> DoctorCheck {
    let name = "ledger_files";
    for path in [&config.access.authorized_users_path, &config.access.pending_requests_path] {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return DoctorCheck {
                    name,
                    status: CheckStatus::Fail,
                    details: format!("directory `{}` does not exist", parent.display()),
                };
            }
        }
    }

    let result = block_on(async {
        let store = JsonFileLedgerStore::new(
            config.access.authorized_users_path.clone(),
            config.access.pending_requests_path.clone(),
        );
        let ledger = AccessLedger::open(Arc::new(store), &config.access.initial_admin_ids)
            .await
            .map_err(|error| error.to_string())?;
        let record = ledger.authorizations().await.map_err(|error| error.to_string())?;
        let pending = ledger.pending_requests().await.map_err(|error| error.to_string())?;
        Ok::<String, String>(format!(
            "{} admin(s), {} user(s), {} pending request(s) in `{}`",
            record.admins.len(),
            record.users.len(),
            pending.len(),
            display_dir(&config.access.authorized_users_path)
        ))
    });

    match result {
        Ok(details) => DoctorCheck { name, status: CheckStatus::Pass, details },
        Err(details) => DoctorCheck { name, status: CheckStatus::Fail, details },
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn block_on<T>(future: impl std::future::Future<Output = Result<T, String>>) -> Result<T, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))?;
    runtime.block_on(future)
}

fn display_dir(path: &Path) -> String {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => parent.display().to_string(),
        None => ".".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
