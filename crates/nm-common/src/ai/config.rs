use std::env;
use std::time::Duration;

use super::cache::CacheConfig;

const DEFAULT_PROVIDER: &str = "groq";

#[derive(Debug, Clone)]
pub struct LlmRuntimeConfig {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub api_key: String,
    /// Per-call ceiling; a call exceeding it is `AiUnavailable::Timeout`.
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub cache: CacheConfig,
}

impl Default for LlmRuntimeConfig {
    fn default() -> Self {
        let (model, endpoint) = provider_defaults(DEFAULT_PROVIDER);
        Self {
            enabled: true,
            provider: DEFAULT_PROVIDER.into(),
            model,
            endpoint,
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            temperature: 0.3,
            max_tokens: 1000,
            cache: CacheConfig::default(),
        }
    }
}

/// Model and chat-completions endpoint for an OpenAI-compatible provider.
fn provider_defaults(provider: &str) -> (String, String) {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => (
            "gpt-4o-mini".into(),
            "https://api.openai.com/v1/chat/completions".into(),
        ),
        "mistral" => (
            "mistral-small-latest".into(),
            "https://api.mistral.ai/v1/chat/completions".into(),
        ),
        "xai" => (
            "grok-2-latest".into(),
            "https://api.x.ai/v1/chat/completions".into(),
        ),
        "local" => (
            "llama3".into(),
            "http://localhost:11434/v1/chat/completions".into(),
        ),
        _ => (
            "llama3-8b-8192".into(),
            "https://api.groq.com/openai/v1/chat/completions".into(),
        ),
    }
}

fn provider_api_key(provider: &str) -> Option<String> {
    let var = match provider.to_ascii_lowercase().as_str() {
        "groq" => "GROQ_API_KEY",
        "openai" => "OPENAI_API_KEY",
        "mistral" => "MISTRAL_API_KEY",
        "xai" => "XAI_API_KEY",
        _ => return None,
    };
    env::var(var).ok()
}

fn parse_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(val) => matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(default)
}

impl LlmRuntimeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| DEFAULT_PROVIDER.into());
        let (default_model, default_endpoint) = provider_defaults(&provider);

        let api_key = env::var("LLM_API_KEY")
            .ok()
            .or_else(|| provider_api_key(&provider))
            .map(|key| key.trim().to_string())
            .unwrap_or_default();

        Self {
            enabled: parse_bool("LLM_ENABLED", true),
            model: env::var("LLM_MODEL").unwrap_or(default_model),
            endpoint: env::var("LLM_ENDPOINT").unwrap_or(default_endpoint),
            provider,
            api_key,
            timeout: Duration::from_secs(parse_u64("LLM_TIMEOUT_SECONDS", 30).max(1)),
            temperature: env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|raw| raw.parse::<f32>().ok())
                .filter(|t| t.is_finite() && (0.0..=2.0).contains(t))
                .unwrap_or(defaults.temperature),
            max_tokens: parse_u64("LLM_MAX_TOKENS", u64::from(defaults.max_tokens))
                .try_into()
                .unwrap_or(defaults.max_tokens),
            cache: CacheConfig {
                capacity: parse_u64("LLM_CACHE_CAPACITY", defaults.cache.capacity as u64) as usize,
                ttl: Duration::from_secs(parse_u64(
                    "LLM_CACHE_TTL_SECONDS",
                    defaults.cache.ttl.as_secs(),
                )),
            },
        }
    }

    /// Enabled and holding a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}
