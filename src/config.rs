// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use crate::errors::{IdeError, Result};

/// Port the judge's event server listens on.
pub const DEFAULT_WS_PORT: u16 = 15100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub ws_port: u16,
    pub ws_url: Option<String>,
    pub cookies: Option<String>,
    pub request_timeout: Duration,
    pub result_timeout: Option<Duration>,
}

/// Shape of `config.toml`. Every key is optional so the environment can fill gaps.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub ws_port: Option<u16>,

    /// Full endpoint, bypassing the `{ws|wss}://{host}:{port}/` derivation.
    #[serde(default)]
    pub ws_url: Option<String>,

    /// `name=value; name2=value2`, as copied from a browser session.
    #[serde(default)]
    pub cookies: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub result_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Applies `JUDGE_*` variables on top of the file values.
    fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base_url) = lookup("JUDGE_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(port) = lookup("JUDGE_WS_PORT") {
            self.ws_port = Some(parse_number("JUDGE_WS_PORT", &port)?);
        }
        if let Some(ws_url) = lookup("JUDGE_WS_URL") {
            self.ws_url = Some(ws_url);
        }
        if let Some(cookies) = lookup("JUDGE_COOKIES") {
            self.cookies = Some(cookies);
        }
        if let Some(secs) = lookup("JUDGE_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = Some(parse_number("JUDGE_REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = lookup("JUDGE_RESULT_TIMEOUT_SECS") {
            self.result_timeout_secs = Some(parse_number("JUDGE_RESULT_TIMEOUT_SECS", &secs)?);
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| IdeError::Config(format!("{} must be a number, got '{}'", key, raw)))
}

/// `~/.config/judge-ide/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("judge-ide").join("config.toml"))
}

impl AppConfig {
    /// Load the config file (explicit path, else the default location if it exists),
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => FileConfig::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    log::debug!("Loading config from {}", path.display());
                    FileConfig::from_file(&path)?
                }
                None => FileConfig::default(),
            },
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::resolve(FileConfig::default(), |key| std::env::var(key).ok())
    }

    pub fn resolve(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = file.merge_env(lookup)?;

        let raw_base = file.base_url.ok_or_else(|| {
            IdeError::Config(
                "No judge configured. Set JUDGE_BASE_URL or base_url in config.toml.".to_string(),
            )
        })?;
        let base_url = Url::parse(raw_base.trim()).map_err(|e| IdeError::InvalidUrl {
            url: raw_base.clone(),
            reason: e.to_string(),
        })?;
        if base_url.host_str().is_none() {
            return Err(IdeError::Config(format!("base_url '{}' has no host", raw_base)));
        }

        Ok(AppConfig {
            base_url,
            ws_port: file.ws_port.unwrap_or(DEFAULT_WS_PORT),
            ws_url: file.ws_url.filter(|u| !u.trim().is_empty()),
            cookies: file.cookies.filter(|c| !c.trim().is_empty()),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            result_timeout: file
                .result_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }

    /// The real-time endpoint: `wss` when the site is served over https, `ws` otherwise,
    /// always on `ws_port` at the site's host.
    pub fn ws_endpoint(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        let host = self.base_url.host_str().unwrap_or("localhost");
        format!("{}://{}:{}/", scheme, host, self.ws_port)
    }
}
