use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use url::Url;

use crate::view::DEFAULT_PAGE_SIZE;

pub const SETTINGS_FILE: &str = "crm.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub supabase_url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub page_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            anon_key: String::new(),
            access_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// The `/rest/v1/` base every table path is joined onto.
    pub fn rest_base_url(&self) -> anyhow::Result<Url> {
        let raw = self.supabase_url.trim();
        if raw.is_empty() || self.anon_key.trim().is_empty() {
            bail!("missing backend settings: SUPABASE_URL and SUPABASE_ANON_KEY must be defined");
        }

        let mut base =
            Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("backend url '{raw}' must use http or https");
        }

        let path = base.path().trim_end_matches('/').to_string();
        if path.ends_with("/rest/v1") {
            base.set_path(&format!("{path}/"));
        } else {
            base.set_path(&format!("{path}/rest/v1/"));
        }
        Ok(base)
    }
}

/// Defaults, then `crm.toml` in the working directory, then the environment.
pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            apply_file(&mut settings, &file_cfg);
        }
    }

    if let Some(v) = env("SUPABASE_URL") {
        settings.supabase_url = v;
    }
    if let Some(v) = env("APP__SUPABASE_URL") {
        settings.supabase_url = v;
    }

    if let Some(v) = env("SUPABASE_ANON_KEY") {
        settings.anon_key = v;
    }
    if let Some(v) = env("APP__SUPABASE_ANON_KEY") {
        settings.anon_key = v;
    }

    if let Some(v) = env("SUPABASE_ACCESS_TOKEN") {
        settings.access_token = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.page_size = parsed.max(1);
        }
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("supabase_url").and_then(toml::Value::as_str) {
        settings.supabase_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("anon_key").and_then(toml::Value::as_str) {
        settings.anon_key = v.to_string();
    }
    if let Some(v) = file_cfg.get("access_token").and_then(toml::Value::as_str) {
        settings.access_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("page_size").and_then(toml::Value::as_integer) {
        if let Ok(parsed) = usize::try_from(v) {
            settings.page_size = parsed.max(1);
        }
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(parsed) = u64::try_from(v) {
            settings.request_timeout_secs = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
