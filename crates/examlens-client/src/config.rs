//! Client configuration and transport factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examlens_core::reconcile::{Reconciler, DEFAULT_TRUST_WINDOW_SECS};
use examlens_core::store::FileStore;
use examlens_core::transport::Endpoint;

use crate::http::HttpTransport;

pub const CONFIG_FILE_NAME: &str = "examlens.toml";

/// Top-level examlens configuration.
///
/// Note: Custom Debug impl masks the API token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root, e.g. `https://exams.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Supports `${ENV_VAR}` references.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long a locally written attempt is kept without backend confirmation.
    #[serde(default = "default_trust_window_secs")]
    pub trust_window_secs: i64,
    /// Where the attempt index is cached.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Preferred solutions language.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub endpoints: EndpointPaths,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("trust_window_secs", &self.trust_window_secs)
            .field("cache_path", &self.cache_path)
            .field("language", &self.language)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Path templates, relative to `base_url`. `{attempt_id}` and
/// `{exam_set_id}` are substituted per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub attempt_detail: String,
    pub analysis: String,
    pub solutions: String,
    pub user_attempts: String,
    pub user_attempts_fallback: String,
    pub reattempt: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            attempt_detail: "/api/attempts/{attempt_id}".into(),
            analysis: "/api/attempts/{attempt_id}/analysis".into(),
            solutions: "/api/attempts/{attempt_id}/solutions".into(),
            user_attempts: "/api/user/attempts".into(),
            user_attempts_fallback: "/api/attempts/user".into(),
            reattempt: "/api/exam-sets/{exam_set_id}/reattempt".into(),
        }
    }
}

impl EndpointPaths {
    pub fn template(&self, endpoint: &Endpoint) -> &str {
        match endpoint {
            Endpoint::AttemptDetail { .. } => &self.attempt_detail,
            Endpoint::Analysis { .. } => &self.analysis,
            Endpoint::Solutions { .. } => &self.solutions,
            Endpoint::UserAttempts => &self.user_attempts,
            Endpoint::UserAttemptsFallback => &self.user_attempts_fallback,
            Endpoint::Reattempt { .. } => &self.reattempt,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_trust_window_secs() -> i64 {
    DEFAULT_TRUST_WINDOW_SECS
}
fn default_cache_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home)
            .join(".cache")
            .join("examlens")
            .join("attempts.json"),
        Err(_) => PathBuf::from(".examlens").join("attempts.json"),
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            trust_window_secs: default_trust_window_secs(),
            cache_path: default_cache_path(),
            language: None,
            endpoints: EndpointPaths::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(chrono::Duration::seconds(self.trust_window_secs))
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(&self.cache_path)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examlens.toml` in the current directory
/// 2. `~/.config/examlens/config.toml`
///
/// Environment variable overrides: `EXAMLENS_API_TOKEN`, `EXAMLENS_BASE_URL`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(token) = std::env::var("EXAMLENS_API_TOKEN") {
        config.api_token = Some(token);
    }
    if let Ok(url) = std::env::var("EXAMLENS_BASE_URL") {
        config.base_url = url;
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.api_token = config
        .api_token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examlens"))
}

/// Build the HTTP transport described by `config`.
pub fn create_transport(config: &ClientConfig) -> Result<HttpTransport> {
    HttpTransport::new(
        &config.base_url,
        config.api_token.clone(),
        config.endpoints.clone(),
        config.timeout(),
    )
}
