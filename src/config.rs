use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub router: RouterConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub anon_key: String,
    pub http_timeout_ms: u64,
    pub realtime_poll_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            http_timeout_ms: 10_000,
            realtime_poll_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    pub page_init_timeout_ms: u64,
    pub history_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            page_init_timeout_ms: 15_000,
            history_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    pub redraw_interval_ms: u64,
    pub toast_ttl_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            redraw_interval_ms: 33,
            toast_ttl_ms: 4_000,
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(AppError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            AppError::io_with_context(source, format!("failed to read config: {}", path.display()))
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            AppError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.backend.http_timeout_ms = self.backend.http_timeout_ms.max(1);
        self.backend.realtime_poll_ms = self.backend.realtime_poll_ms.max(100);
        if self.backend.base_url.ends_with('/') {
            let trimmed = self.backend.base_url.trim_end_matches('/').to_string();
            self.backend.base_url = trimmed;
        }
        self.router.page_init_timeout_ms = self.router.page_init_timeout_ms.max(1);
        self.router.history_capacity = self.router.history_capacity.max(1);
        self.ui.redraw_interval_ms = self.ui.redraw_interval_ms.max(1);
        self.ui.toast_ttl_ms = self.ui.toast_ttl_ms.max(1);
        self
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("HAIL_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("hail").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("hail")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("hail").join("config.toml"));
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::Config;

    fn unique_temp_path(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("hail_config_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn load_from_path_returns_defaults_for_missing_file() {
        let missing = unique_temp_path("missing.toml");
        let config = Config::load_from_path(&missing).expect("missing config should fallback");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_from_path_applies_partial_overrides_and_sanitizes() {
        let path = unique_temp_path("custom.toml");
        fs::write(
            &path,
            r#"
            [backend]
            base_url = "https://db.example.com/"
            anon_key = "anon-123"
            http_timeout_ms = 0
            realtime_poll_ms = 10

            [router]
            page_init_timeout_ms = 0
            history_capacity = 0

            [ui]
            redraw_interval_ms = 0
            "#,
        )
        .expect("config file should be written");

        let config = Config::load_from_path(&path).expect("config should parse");
        assert_eq!(config.backend.base_url, "https://db.example.com");
        assert_eq!(config.backend.anon_key, "anon-123");
        assert_eq!(config.backend.http_timeout_ms, 1);
        assert_eq!(config.backend.realtime_poll_ms, 100);
        assert_eq!(config.router.page_init_timeout_ms, 1);
        assert_eq!(config.router.history_capacity, 1);
        assert_eq!(config.ui.redraw_interval_ms, 1);
        assert_eq!(config.ui.toast_ttl_ms, 4_000);

        fs::remove_file(&path).expect("config file should be removed");
    }
}
