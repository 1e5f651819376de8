//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `"BM_DATABASE_URL"`). Callers
//! resolve once at startup and pass [`ResolvedSecrets`] into constructors.
//! `Debug` output and error messages never carry values, only names.
//!
//! | Mode    | Required                 |
//! |---------|--------------------------|
//! | SERVICE | store connection string  |
//! | OFFLINE | nothing                  |
//!
//! The gateway webhook signing secret is optional in every mode.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::ConfigMode;

pub const DEFAULT_DATABASE_URL_ENV: &str = "BM_DATABASE_URL";
pub const DEFAULT_WEBHOOK_SECRET_ENV: &str = "BM_GATEWAY_WEBHOOK_SECRET";

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Env var the connection string was read from.
    pub database_url_env: String,
    pub database_url: Option<String>,
    pub webhook_secret: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url_env", &self.database_url_env)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl ResolvedSecrets {
    /// Connection string, or an error naming the env var.
    pub fn require_database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "SECRETS_MISSING: env var '{}' (store connection string) is not set or empty",
                self.database_url_env
            ),
        }
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets_for_mode(config_json: &Value, mode: ConfigMode) -> Result<ResolvedSecrets> {
    let database_url_env = read_str_at(config_json, "/store/database_url_env")
        .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string());
    let webhook_secret_env = read_str_at(config_json, "/gateway/webhook_secret_env")
        .unwrap_or_else(|| DEFAULT_WEBHOOK_SECRET_ENV.to_string());

    let database_url = resolve_env(&database_url_env);
    let webhook_secret = resolve_env(&webhook_secret_env);

    if mode == ConfigMode::Service && database_url.is_none() {
        bail!(
            "SECRETS_MISSING mode={}: required env var '{}' (store connection string) \
             is not set or empty",
            mode.as_str(),
            database_url_env,
        );
    }

    Ok(ResolvedSecrets {
        database_url_env,
        database_url,
        webhook_secret,
    })
}
