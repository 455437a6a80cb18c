use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub username: String,
    /// When unset every login attempt is rejected.
    pub password: Option<SecretString>,
    pub session_days: u32,
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub utc_offset_minutes: i32,
    pub filename_prefix: String,
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
    pub server_port: Option<u16>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub session_days: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
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
                url: "sqlite://salesbook.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5002,
                graceful_shutdown_secs: 15,
            },
            auth: AuthConfig { username: "admin".to_string(), password: None, session_days: 30 },
            export: ExportConfig {
                utc_offset_minutes: 330,
                filename_prefix: "sales_export".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl ExportConfig {
    /// Local clock used for export file names and the current-month snapshot.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

impl AuthConfig {
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        let Some(expected) = &self.password else {
            return false;
        };
        let expected = expected.expose_secret();
        !expected.is_empty() && username.trim() == self.username && password == expected
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("salesbook.toml"));
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

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(username) = auth.username {
                self.auth.username = username;
            }
            if let Some(password) = auth.password {
                self.auth.password = Some(secret_value(password));
            }
            if let Some(session_days) = auth.session_days {
                self.auth.session_days = session_days;
            }
        }

        if let Some(export) = patch.export {
            if let Some(utc_offset_minutes) = export.utc_offset_minutes {
                self.export.utc_offset_minutes = utc_offset_minutes;
            }
            if let Some(filename_prefix) = export.filename_prefix {
                self.export.filename_prefix = filename_prefix;
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
        if let Some(value) = read_env("SALESBOOK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SALESBOOK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("SALESBOOK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SALESBOOK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("SALESBOOK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SALESBOOK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SALESBOOK_SERVER_PORT") {
            self.server.port = parse_env("SALESBOOK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SALESBOOK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("SALESBOOK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SALESBOOK_AUTH_USERNAME") {
            self.auth.username = value;
        }
        if let Some(value) = read_env("SALESBOOK_AUTH_PASSWORD") {
            self.auth.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESBOOK_AUTH_SESSION_DAYS") {
            self.auth.session_days = parse_env("SALESBOOK_AUTH_SESSION_DAYS", &value)?;
        }

        if let Some(value) = read_env("SALESBOOK_EXPORT_UTC_OFFSET_MINUTES") {
            self.export.utc_offset_minutes =
                parse_env("SALESBOOK_EXPORT_UTC_OFFSET_MINUTES", &value)?;
        }
        if let Some(value) = read_env("SALESBOOK_EXPORT_FILENAME_PREFIX") {
            self.export.filename_prefix = value;
        }

        let log_level =
            read_env("SALESBOOK_LOGGING_LEVEL").or_else(|| read_env("SALESBOOK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SALESBOOK_LOGGING_FORMAT").or_else(|| read_env("SALESBOOK_LOG_FORMAT"));
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
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(username) = overrides.auth_username {
            self.auth.username = username;
        }
        if let Some(password) = overrides.auth_password {
            self.auth.password = Some(secret_value(password));
        }
        if let Some(session_days) = overrides.session_days {
            self.auth.session_days = session_days;
        }
        if let Some(utc_offset_minutes) = overrides.utc_offset_minutes {
            self.export.utc_offset_minutes = utc_offset_minutes;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_auth(&self.auth)?;
        validate_export(&self.export)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("salesbook.toml"), PathBuf::from("config/salesbook.toml")]
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

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    if auth.username.trim().is_empty() {
        return Err(ConfigError::Validation("auth.username must not be empty".to_string()));
    }

    if auth.session_days == 0 || auth.session_days > 365 {
        return Err(ConfigError::Validation(
            "auth.session_days must be in range 1..=365".to_string(),
        ));
    }

    Ok(())
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if !(-720..=840).contains(&export.utc_offset_minutes) {
        return Err(ConfigError::Validation(
            "export.utc_offset_minutes must be in range -720..=840".to_string(),
        ));
    }

    let prefix = export.filename_prefix.trim();
    let safe = !prefix.is_empty()
        && prefix.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !safe {
        return Err(ConfigError::Validation(
            "export.filename_prefix must be non-empty and use only [A-Za-z0-9_-]".to_string(),
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

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    auth: Option<AuthPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    username: Option<String>,
    password: Option<String>,
    session_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    utc_offset_minutes: Option<i32>,
    filename_prefix: Option<String>,
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
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
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

        env::set_var("TEST_SALESBOOK_PASSWORD", "from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salesbook.toml");
            fs::write(
                &path,
                r#"
[auth]
username = "owner"
password = "${TEST_SALESBOOK_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.auth.username == "owner", "username should come from the file")?;
            ensure(
                config.auth.password.as_ref().map(|p| p.expose_secret() == "from-env")
                    == Some(true),
                "password should be interpolated from the environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SALESBOOK_PASSWORD"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("salesbook.toml");
        fs::write(&path, "[auth]\npassword = \"${SALESBOOK_TEST_UNSET_VAR}\"\n")
            .map_err(|err| err.to_string())?;

        let result = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                result,
                Err(ConfigError::MissingEnvInterpolation { ref var }) if var == "SALESBOOK_TEST_UNSET_VAR"
            ),
            "unset interpolation variable should fail the load",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESBOOK_LOG_LEVEL", "warn");
        env::set_var("SALESBOOK_LOG_FORMAT", "pretty");

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

        clear_vars(&["SALESBOOK_LOG_LEVEL", "SALESBOOK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESBOOK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SALESBOOK_AUTH_SESSION_DAYS", "7");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salesbook.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[auth]
session_days = 90

[export]
utc_offset_minutes = 60

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
            ensure(config.auth.session_days == 7, "env session days should win over the file")?;
            ensure(config.export.utc_offset_minutes == 60, "file offset should win over default")?;
            Ok(())
        })();

        clear_vars(&["SALESBOOK_DATABASE_URL", "SALESBOOK_AUTH_SESSION_DAYS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESBOOK_AUTH_SESSION_DAYS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("auth.session_days")
            );
            ensure(has_message, "validation failure should mention auth.session_days")
        })();

        clear_vars(&["SALESBOOK_AUTH_SESSION_DAYS"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESBOOK_SERVER_PORT", "not-a-port");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["SALESBOOK_SERVER_PORT"]);

        ensure(
            matches!(result, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "SALESBOOK_SERVER_PORT"),
            "non-numeric port should be reported as an invalid override",
        )
    }

    #[test]
    fn password_is_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESBOOK_AUTH_PASSWORD", "hunter2-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("hunter2-secret-value"),
                "debug output should not contain the password",
            )?;
            ensure(
                config.auth.credentials_match("admin", "hunter2-secret-value"),
                "configured credentials should match",
            )?;
            ensure(
                !config.auth.credentials_match("admin", "wrong"),
                "a wrong password should not match",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESBOOK_AUTH_PASSWORD"]);
        result
    }

    #[test]
    fn login_is_refused_without_a_configured_password() {
        let config = AppConfig::default();
        assert!(!config.auth.credentials_match("admin", ""));
        assert!(!config.auth.credentials_match("admin", "anything"));
    }

    #[test]
    fn export_offset_follows_configured_minutes() {
        let config = AppConfig::default();
        assert_eq!(config.export.offset().local_minus_utc(), 330 * 60);
    }
}
