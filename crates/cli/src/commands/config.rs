use std::env;
use std::fs;
use std::path::Path;

use salesbook_core::config::{resolve_config_path, AppConfig};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Prints every effective setting with where it came from. The password is never echoed.
pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = config_file_path.as_deref().and_then(load_config_file_doc);

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value) in effective_values(&config) {
        let source = field_source(key_path, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("server.bind_address", config.server.bind_address.clone()),
        ("server.port", config.server.port.to_string()),
        ("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string()),
        ("auth.username", config.auth.username.clone()),
        ("auth.password", redact_password(config)),
        ("auth.session_days", config.auth.session_days.to_string()),
        ("export.utc_offset_minutes", config.export.utc_offset_minutes.to_string()),
        ("export.filename_prefix", config.export.filename_prefix.clone()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format).to_lowercase()),
    ]
}

fn redact_password(config: &AppConfig) -> String {
    match &config.auth.password {
        Some(password) if !password.expose_secret().is_empty() => "<redacted>".to_string(),
        Some(_) => "<empty>".to_string(),
        None => "<unset>".to_string(),
    }
}

/// `database.max_connections` -> `SALESBOOK_DATABASE_MAX_CONNECTIONS`
pub fn env_key(key_path: &str) -> String {
    format!("SALESBOOK_{}", key_path.replace('.', "_").to_uppercase())
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(key_path: &str, config_file_doc: Option<&Value>, config_file_path: Option<&Path>) -> String {
    let env_key = env_key(key_path);
    if env::var_os(&env_key).is_some() {
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
