use figment::providers::Env;
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{AircareError, Result};

fn default_app_port() -> u16 {
    8080
}

fn default_ollama_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_ollama_timeout_secs() -> u64 {
    60
}

fn default_memory_path() -> String {
    "data/storage/memory.json".to_string()
}

fn default_max_history() -> usize {
    50
}

/// Process-wide configuration, sourced exclusively from the closed
/// environment-variable list. No file-based layer: every deployment of
/// this service sets these directly, unlike the teacher's TOML+env
/// merge — there is no config file to merge here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircareConfig {
    #[serde(default = "default_app_port")]
    pub app_port: u16,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub node_server_url: Option<String>,

    #[serde(default)]
    pub admin_secret_key: Option<String>,

    #[serde(default)]
    pub qdrant: QdrantConfig,

    #[serde(default = "default_memory_path")]
    pub memory_path: String,

    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fallback_host: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_host(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout_secs(),
            fallback_host: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Default for AircareConfig {
    fn default() -> Self {
        Self {
            app_port: default_app_port(),
            ollama: OllamaConfig::default(),
            node_server_url: None,
            admin_secret_key: None,
            qdrant: QdrantConfig::default(),
            memory_path: default_memory_path(),
            max_history: default_max_history(),
        }
    }
}

impl AircareConfig {
    /// Reproduces the original client's env-resolution order:
    /// OLLAMA_URL → OLLAMA_BASE → OLLAMA_HOST → default.
    ///
    /// `APP_PORT`, `MEMORY_PATH` and `MAX_HISTORY` go through figment's
    /// `Env` provider since they map 1:1 onto struct fields; the
    /// fallback-chain variables (`OLLAMA_*`, `QDRANT_*`) are resolved by
    /// hand first since figment has no built-in "first of these names"
    /// merge, then folded into the extracted struct.
    pub fn load() -> Result<Self> {
        let mut extracted: AircareConfig = Figment::new()
            .merge(Env::raw().only(&["APP_PORT", "MEMORY_PATH", "MAX_HISTORY"]))
            .extract()
            .map_err(|e| AircareError::Config(e.to_string()))?;

        extracted.ollama = OllamaConfig {
            base_url: std::env::var("OLLAMA_URL")
                .or_else(|_| std::env::var("OLLAMA_BASE"))
                .or_else(|_| std::env::var("OLLAMA_HOST"))
                .unwrap_or_else(|_| default_ollama_host()),
            model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| default_ollama_model()),
            timeout_secs: std::env::var("OLLAMA_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ollama_timeout_secs),
            fallback_host: std::env::var("OLLAMA_FALLBACK_HOST").ok(),
        };
        extracted.node_server_url = std::env::var("NODE_SERVER_URL").ok();
        extracted.admin_secret_key = std::env::var("ADMIN_SECRET_KEY").ok();
        extracted.qdrant = QdrantConfig {
            url: std::env::var("QDRANT_URL").ok(),
            host: std::env::var("QDRANT_HOST").ok(),
            port: std::env::var("QDRANT_PORT").ok().and_then(|v| v.parse().ok()),
        };

        Ok(extracted)
    }

    pub fn check_admin_secret(&self, provided: &str) -> Result<()> {
        match &self.admin_secret_key {
            Some(secret) if secret == provided => Ok(()),
            _ => Err(AircareError::AdminAuthFailed),
        }
    }
}
