use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::user::{ChatId, UserId};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
    pub access: AccessConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
    pub operations_chat_id: i64,
}

#[derive(Clone, Debug)]
pub struct AccessConfig {
    pub authorized_users_path: PathBuf,
    pub pending_requests_path: PathBuf,
    pub initial_admin_ids: Vec<UserId>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub chat_bot_token: Option<String>,
    pub operations_chat_id: Option<i64>,
    pub authorized_users_path: Option<PathBuf>,
    pub pending_requests_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://illustra.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            chat: ChatConfig { bot_token: String::new().into(), operations_chat_id: 0 },
            access: AccessConfig {
                authorized_users_path: PathBuf::from("authorized-users.json"),
                pending_requests_path: PathBuf::from("pending-requests.json"),
                initial_admin_ids: Vec::new(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl ChatConfig {
    pub fn operations_chat(&self) -> ChatId {
        ChatId(self.operations_chat_id)
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("illustra.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(bot_token) = chat.bot_token {
                self.chat.bot_token = bot_token.into();
            }
            if let Some(operations_chat_id) = chat.operations_chat_id {
                self.chat.operations_chat_id = operations_chat_id;
            }
        }

        if let Some(access) = patch.access {
            if let Some(path) = access.authorized_users_path {
                self.access.authorized_users_path = path;
            }
            if let Some(path) = access.pending_requests_path {
                self.access.pending_requests_path = path;
            }
            if let Some(ids) = access.initial_admin_ids {
                self.access.initial_admin_ids = ids.into_iter().map(UserId).collect();
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ILLUSTRA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ILLUSTRA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("ILLUSTRA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ILLUSTRA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ILLUSTRA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ILLUSTRA_CHAT_BOT_TOKEN") {
            self.chat.bot_token = value.into();
        }
        if let Some(value) = read_env("ILLUSTRA_CHAT_OPERATIONS_CHAT_ID") {
            self.chat.operations_chat_id = parse_i64("ILLUSTRA_CHAT_OPERATIONS_CHAT_ID", &value)?;
        }

        if let Some(value) = read_env("ILLUSTRA_ACCESS_AUTHORIZED_USERS_PATH") {
            self.access.authorized_users_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("ILLUSTRA_ACCESS_PENDING_REQUESTS_PATH") {
            self.access.pending_requests_path = PathBuf::from(value);
        }
        let admin_ids =
            read_env("ILLUSTRA_ACCESS_INITIAL_ADMIN_IDS").or_else(|| read_env("INITIAL_ADMIN_ID"));
        if let Some(value) = admin_ids {
            self.access.initial_admin_ids = parse_admin_ids(&value);
        }

        if let Some(value) = read_env("ILLUSTRA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ILLUSTRA_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("ILLUSTRA_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("ILLUSTRA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ILLUSTRA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("ILLUSTRA_LOGGING_LEVEL").or_else(|| read_env("ILLUSTRA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ILLUSTRA_LOGGING_FORMAT").or_else(|| read_env("ILLUSTRA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.chat_bot_token {
            self.chat.bot_token = bot_token.into();
        }
        if let Some(operations_chat_id) = overrides.operations_chat_id {
            self.chat.operations_chat_id = operations_chat_id;
        }
        if let Some(path) = overrides.authorized_users_path {
            self.access.authorized_users_path = path;
        }
        if let Some(path) = overrides.pending_requests_path {
            self.access.pending_requests_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_chat(&self.chat)?;
        validate_access(&self.access)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("illustra.toml"), PathBuf::from("config/illustra.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

/// Comma separated ids; entries that are not numbers are skipped.
fn parse_admin_ids(value: &str) -> Vec<UserId> {
    let mut ids = Vec::new();
    for id in value.split(',').filter_map(|part| part.trim().parse::<UserId>().ok()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    let bot_token = chat.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "chat.bot_token is required. Ask @BotFather for the token of your bot".to_string(),
        ));
    }
    let well_formed = match bot_token.split_once(':') {
        Some((bot_id, secret)) => {
            !bot_id.is_empty()
                && bot_id.bytes().all(|byte| byte.is_ascii_digit())
                && !secret.trim().is_empty()
        }
        None => false,
    };
    if !well_formed {
        return Err(ConfigError::Validation(
            "chat.bot_token must look like `<bot id>:<secret>`".to_string(),
        ));
    }

    if chat.operations_chat_id == 0 {
        return Err(ConfigError::Validation(
            "chat.operations_chat_id is required. Use the id of the operations group chat"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_access(access: &AccessConfig) -> Result<(), ConfigError> {
    if access.authorized_users_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "access.authorized_users_path must not be empty".to_string(),
        ));
    }
    if access.pending_requests_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "access.pending_requests_path must not be empty".to_string(),
        ));
    }
    if access.authorized_users_path == access.pending_requests_path {
        return Err(ConfigError::Validation(
            "access.authorized_users_path and access.pending_requests_path must differ"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    chat: Option<ChatPatch>,
    access: Option<AccessPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    bot_token: Option<String>,
    operations_chat_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessPatch {
    authorized_users_path: Option<PathBuf>,
    pending_requests_path: Option<PathBuf>,
    initial_admin_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::user::UserId;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const BASE_VARS: [&str; 2] = ["ILLUSTRA_CHAT_BOT_TOKEN", "ILLUSTRA_CHAT_OPERATIONS_CHAT_ID"];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn set_base_vars() {
        env::set_var("ILLUSTRA_CHAT_BOT_TOKEN", "123456:test-secret");
        env::set_var("ILLUSTRA_CHAT_OPERATIONS_CHAT_ID", "-1001234");
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_BOT_TOKEN", "777:from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("illustra.toml");
            fs::write(
                &path,
                r#"
[chat]
bot_token = "${TEST_BOT_TOKEN}"
operations_chat_id = -100555

[access]
initial_admin_ids = [11, 22]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.chat.bot_token.expose_secret() == "777:from-env",
                "bot token should be interpolated from the environment",
            )?;
            ensure(config.chat.operations_chat_id == -100555, "operations chat from file")?;
            ensure(
                config.access.initial_admin_ids == vec![UserId(11), UserId(22)],
                "initial admins should be read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_BOT_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_base_vars();
        env::set_var("ILLUSTRA_LOG_LEVEL", "warn");
        env::set_var("ILLUSTRA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&BASE_VARS);
        clear_vars(&["ILLUSTRA_LOG_LEVEL", "ILLUSTRA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn legacy_admin_variable_is_honoured() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_base_vars();
        env::set_var("INITIAL_ADMIN_ID", "42, abc, 43,42");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.access.initial_admin_ids == vec![UserId(42), UserId(43)],
                "numeric admin ids should be kept once each",
            )
        })();

        clear_vars(&BASE_VARS);
        clear_vars(&["INITIAL_ADMIN_ID"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ILLUSTRA_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("ILLUSTRA_CHAT_BOT_TOKEN", "1:from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("illustra.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[chat]
bot_token = "1:from-file"
operations_chat_id = -42

[access]
authorized_users_path = "data/users.json"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    pending_requests_path: Some(PathBuf::from("data/pending.json")),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.chat.bot_token.expose_secret() == "1:from-env",
                "env bot token should win over file and defaults",
            )?;
            ensure(
                config.access.authorized_users_path == PathBuf::from("data/users.json"),
                "file path should win over defaults",
            )?;
            ensure(
                config.access.pending_requests_path == PathBuf::from("data/pending.json"),
                "override path should win",
            )?;
            Ok(())
        })();

        clear_vars(&["ILLUSTRA_DATABASE_URL", "ILLUSTRA_CHAT_BOT_TOKEN"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ILLUSTRA_CHAT_BOT_TOKEN", "not-a-token");
        env::set_var("ILLUSTRA_CHAT_OPERATIONS_CHAT_ID", "-1");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("chat.bot_token")
            );
            ensure(has_message, "validation failure should mention chat.bot_token")
        })();

        clear_vars(&BASE_VARS);
        result
    }

    #[test]
    fn missing_operations_chat_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ILLUSTRA_CHAT_BOT_TOKEN", "123:abc");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default()).err();
            ensure(
                matches!(
                    error,
                    Some(ConfigError::Validation(ref message)) if message.contains("operations_chat_id")
                ),
                "validation failure should mention chat.operations_chat_id",
            )
        })();

        clear_vars(&BASE_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ILLUSTRA_CHAT_BOT_TOKEN", "987654:super-secret-value");
        env::set_var("ILLUSTRA_CHAT_OPERATIONS_CHAT_ID", "-1009");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-value"),
                "debug output should not contain the bot token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&BASE_VARS);
        result
    }
}
