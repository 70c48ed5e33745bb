use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::LlmProvider;

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    options: GenerateOptions,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// HTTP client over Ollama's `/api/generate`, grounded on
/// `ollama_client.py` for retry/fallback semantics and on the teacher's
/// `skynet-agent::ollama::OllamaProvider` for the reqwest client shape.
///
/// Retries 3 times with a 5s linear backoff; on final failure, makes one
/// attempt against `fallback_host` if configured; otherwise returns an
/// empty string. Never returns an `Err` to the caller — a failed call is
/// indistinguishable from an empty generation, matching the original
/// client's `{"response": ""}` sentinel.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    fallback_host: Option<String>,
    retries: u32,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String, timeout: Duration, fallback_host: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            fallback_host,
            retries: 3,
        }
    }

    async fn post_generate(&self, host: &str, req: &GenerateRequest<'_>) -> Option<String> {
        let url = format!("{host}/api/generate");
        let resp = self.client.post(&url).json(req).send().await.ok()?;
        let resp = resp.error_for_status().ok()?;
        let body: GenerateResponse = resp.json().await.unwrap_or_default();
        Some(body.response)
    }

    async fn post_with_retry(&self, req: &GenerateRequest<'_>) -> String {
        for attempt in 0..=self.retries {
            if let Some(text) = self.post_generate(&self.base_url, req).await {
                return text;
            }
            tracing::warn!(attempt, max = self.retries, "ollama request failed, retrying");
            if attempt < self.retries {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }

        tracing::error!("ollama request failed after {} attempts", self.retries + 1);

        if let Some(fallback) = &self.fallback_host {
            if let Some(text) = self.post_generate(fallback, req).await {
                return text;
            }
            tracing::error!("ollama fallback host also failed");
        }

        String::new()
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> String {
        let text = format!("<|system|>\n{system}\n<|user|>\n{prompt}\n<|assistant|>\n");
        let req = GenerateRequest {
            model: &self.model,
            prompt: text,
            options: GenerateOptions { temperature },
            stream: false,
        };
        self.post_with_retry(&req).await.trim().to_string()
    }
}
