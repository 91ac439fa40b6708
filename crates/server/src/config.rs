use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::protocol::EventDetails;
use tracing::warn;

const DEFAULT_TOKEN_SECRET: &str = "dev-insecure-secret";
const DAY_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub token_issuer: String,
    pub token_secret: String,
    pub guest_token_ttl_seconds: i64,
    pub admin_token_ttl_seconds: i64,
    pub admin_email: String,
    pub admin_password: Option<String>,
    pub event: EventDetails,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8443".into(),
            database_url: "sqlite://./data/invite.db".into(),
            token_issuer: "invite-server".into(),
            token_secret: DEFAULT_TOKEN_SECRET.into(),
            guest_token_ttl_seconds: 180 * DAY_SECONDS,
            admin_token_ttl_seconds: 12 * 60 * 60,
            admin_email: "owner@example.com".into(),
            admin_password: None,
            event: EventDetails::default(),
        }
    }
}

impl Settings {
    pub fn uses_default_secret(&self) -> bool {
        self.token_secret == DEFAULT_TOKEN_SECRET
    }
}

/// Shape of `server.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<String>,
    database_url: Option<String>,
    token_secret: Option<String>,
    guest_token_ttl_seconds: Option<i64>,
    admin_token_ttl_seconds: Option<i64>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    event: Option<EventDetails>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        match parse_file_config(&raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, file_cfg),
            Err(error) => warn!(%error, "ignoring malformed server.toml"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn parse_file_config(raw: &str) -> anyhow::Result<FileConfig> {
    toml::from_str(raw).context("failed to parse server.toml")
}

fn apply_file_config(settings: &mut Settings, file_cfg: FileConfig) {
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.token_secret {
        settings.token_secret = v;
    }
    if let Some(v) = file_cfg.guest_token_ttl_seconds {
        settings.guest_token_ttl_seconds = v;
    }
    if let Some(v) = file_cfg.admin_token_ttl_seconds {
        settings.admin_token_ttl_seconds = v;
    }
    if let Some(v) = file_cfg.admin_email {
        settings.admin_email = v;
    }
    if let Some(v) = file_cfg.admin_password {
        settings.admin_password = Some(v);
    }
    if let Some(v) = file_cfg.event {
        settings.event = v;
    }
}

/// Environment overrides. Later keys in each list win.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let last = |keys: &[&str]| keys.iter().filter_map(|k| lookup(k)).last();

    if let Some(v) = last(&["SERVER_BIND", "APP__BIND_ADDR"]) {
        settings.server_bind = v;
    }
    if let Some(v) = last(&["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = last(&["APP__TOKEN_SECRET"]) {
        settings.token_secret = v;
    }
    if let Some(v) = last(&["APP__GUEST_TOKEN_TTL_SECONDS"]) {
        match v.parse::<i64>() {
            Ok(parsed) => settings.guest_token_ttl_seconds = parsed,
            Err(_) => warn!(value = %v, "APP__GUEST_TOKEN_TTL_SECONDS is not a number"),
        }
    }
    if let Some(v) = last(&["APP__ADMIN_TOKEN_TTL_SECONDS"]) {
        match v.parse::<i64>() {
            Ok(parsed) => settings.admin_token_ttl_seconds = parsed,
            Err(_) => warn!(value = %v, "APP__ADMIN_TOKEN_TTL_SECONDS is not a number"),
        }
    }
    if let Some(v) = last(&["APP__ADMIN_EMAIL"]) {
        settings.admin_email = v;
    }
    if let Some(v) = last(&["APP__ADMIN_PASSWORD"]) {
        settings.admin_password = Some(v);
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_prefix(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_drive_prefix(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    let path = raw_database_url.replace('\\', "/");
    if has_drive_prefix(&path) {
        return format!("sqlite:{path}");
    }
    format!("sqlite://{path}")
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
