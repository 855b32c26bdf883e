use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use illustra_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let admin_ids = config
        .access
        .initial_admin_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "database.url",
            &config.database.url,
            source("database.url", &["ILLUSTRA_DATABASE_URL"]),
        ),
        render_line(
            "database.max_connections",
            &config.database.max_connections.to_string(),
            source("database.max_connections", &["ILLUSTRA_DATABASE_MAX_CONNECTIONS"]),
        ),
        render_line(
            "database.timeout_secs",
            &config.database.timeout_secs.to_string(),
            source("database.timeout_secs", &["ILLUSTRA_DATABASE_TIMEOUT_SECS"]),
        ),
        render_line(
            "chat.bot_token",
            &redact_token(config.chat.bot_token.expose_secret()),
            source("chat.bot_token", &["ILLUSTRA_CHAT_BOT_TOKEN"]),
        ),
        render_line(
            "chat.operations_chat_id",
            &config.chat.operations_chat_id.to_string(),
            source("chat.operations_chat_id", &["ILLUSTRA_CHAT_OPERATIONS_CHAT_ID"]),
        ),
        render_line(
            "access.authorized_users_path",
            &config.access.authorized_users_path.display().to_string(),
            source("access.authorized_users_path", &["ILLUSTRA_ACCESS_AUTHORIZED_USERS_PATH"]),
        ),
        render_line(
            "access.pending_requests_path",
            &config.access.pending_requests_path.display().to_string(),
            source("access.pending_requests_path", &["ILLUSTRA_ACCESS_PENDING_REQUESTS_PATH"]),
        ),
        render_line(
            "access.initial_admin_ids",
            if admin_ids.is_empty() { "<unset>" } else { admin_ids.as_str() },
            source(
                "access.initial_admin_ids",
                &["ILLUSTRA_ACCESS_INITIAL_ADMIN_IDS", "INITIAL_ADMIN_ID"],
            ),
        ),
        render_line(
            "server.bind_address",
            &config.server.bind_address,
            source("server.bind_address", &["ILLUSTRA_SERVER_BIND_ADDRESS"]),
        ),
        render_line(
            "server.health_check_port",
            &config.server.health_check_port.to_string(),
            source("server.health_check_port", &["ILLUSTRA_SERVER_HEALTH_CHECK_PORT"]),
        ),
        render_line(
            "server.graceful_shutdown_secs",
            &config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", &["ILLUSTRA_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["ILLUSTRA_LOGGING_LEVEL", "ILLUSTRA_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", &["ILLUSTRA_LOGGING_FORMAT", "ILLUSTRA_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("illustra.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/illustra.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the public bot id and hides the secret half.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}
