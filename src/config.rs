//! Runtime settings read from the environment (and `.env` via dotenv).
//!
//! API keys are never stored here; only the names of the variables that
//! hold them.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::api_connection::Provider;
use crate::crag::{PipelineLimits, WebSearchLimits};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b";
pub const DEFAULT_LLM_API_KEY_ENV: &str = "CEREBRAS_API_KEY";
pub const DEFAULT_SEARCH_API_KEY_ENV: &str = "TAVILY_API_KEY";
pub const DEFAULT_INDEX_PATH: &str = "recipe_index.json";
pub const DEFAULT_SESSION_FILE: &str = ".crag_session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Cerebras,
    OpenRouter,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cerebras" => Ok(LlmProvider::Cerebras),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_api_key_env: String,
    pub llm_temperature: f32,
    pub search_api_key_env: String,
    pub index_path: PathBuf,
    pub retrieval_top_k: usize,
    pub judge_cap: usize,
    pub web_judge_cap: usize,
    pub web_results: usize,
    pub format_timeout: Duration,
    pub session_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let limits = PipelineLimits::default();
        Self {
            llm_provider: LlmProvider::Cerebras,
            llm_model: DEFAULT_MODEL.to_string(),
            llm_api_key_env: DEFAULT_LLM_API_KEY_ENV.to_string(),
            llm_temperature: 0.3,
            search_api_key_env: DEFAULT_SEARCH_API_KEY_ENV.to_string(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            retrieval_top_k: limits.top_k,
            judge_cap: limits.judge_cap,
            web_judge_cap: limits.web.judge_cap,
            web_results: limits.web.result_count,
            format_timeout: Duration::from_secs(90),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            llm_provider: parsed(&lookup, "CRAG_LLM_PROVIDER", defaults.llm_provider),
            llm_model: text("CRAG_LLM_MODEL", defaults.llm_model),
            llm_api_key_env: text("CRAG_LLM_API_KEY_ENV", defaults.llm_api_key_env),
            llm_temperature: parsed(&lookup, "CRAG_LLM_TEMPERATURE", defaults.llm_temperature),
            search_api_key_env: text("CRAG_SEARCH_API_KEY_ENV", defaults.search_api_key_env),
            index_path: PathBuf::from(text(
                "CRAG_INDEX_PATH",
                defaults.index_path.to_string_lossy().into_owned(),
            )),
            retrieval_top_k: parsed(&lookup, "CRAG_RETRIEVAL_TOP_K", defaults.retrieval_top_k),
            judge_cap: parsed(&lookup, "CRAG_JUDGE_CAP", defaults.judge_cap),
            web_judge_cap: parsed(&lookup, "CRAG_WEB_JUDGE_CAP", defaults.web_judge_cap),
            web_results: parsed(&lookup, "CRAG_WEB_RESULTS", defaults.web_results),
            format_timeout: Duration::from_secs(parsed(
                &lookup,
                "CRAG_FORMAT_TIMEOUT_SECS",
                defaults.format_timeout.as_secs(),
            )),
            session_file: PathBuf::from(text(
                "CRAG_SESSION_FILE",
                defaults.session_file.to_string_lossy().into_owned(),
            )),
        }
    }

    pub fn build_provider(&self) -> Provider {
        let provider = match self.llm_provider {
            LlmProvider::Cerebras => Provider::cerebras(&self.llm_api_key_env, &self.llm_model),
            LlmProvider::OpenRouter => Provider::openrouter(&self.llm_api_key_env, &self.llm_model),
        };
        provider.with_temperature(self.llm_temperature)
    }

    pub fn limits(&self) -> PipelineLimits {
        PipelineLimits {
            top_k: self.retrieval_top_k,
            judge_cap: self.judge_cap,
            web: WebSearchLimits {
                result_count: self.web_results,
                judge_cap: self.web_judge_cap,
                ..WebSearchLimits::default()
            },
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value '{}' for {}; using the default.", raw, key);
            default
        }),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = settings_from(&[]);
        assert_eq!(settings.llm_provider, LlmProvider::Cerebras);
        assert_eq!(settings.llm_model, DEFAULT_MODEL);
        assert_eq!(settings.retrieval_top_k, 30);
        assert_eq!(settings.web_judge_cap, 10);
        assert_eq!(settings.format_timeout, Duration::from_secs(90));
        assert_eq!(settings.session_file, PathBuf::from(".crag_session.json"));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = settings_from(&[
            ("CRAG_LLM_PROVIDER", "OpenRouter"),
            ("CRAG_LLM_MODEL", "google/gemini-2.5-flash"),
            ("CRAG_RETRIEVAL_TOP_K", "12"),
            ("CRAG_WEB_RESULTS", "3"),
            ("CRAG_FORMAT_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(settings.llm_provider, LlmProvider::OpenRouter);
        assert_eq!(settings.build_provider().model(), "google/gemini-2.5-flash");
        let limits = settings.limits();
        assert_eq!(limits.top_k, 12);
        assert_eq!(limits.web.result_count, 3);
        assert_eq!(limits.web.depth, "advanced");
        assert_eq!(settings.format_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let settings = settings_from(&[
            ("CRAG_JUDGE_CAP", "lots"),
            ("CRAG_LLM_TEMPERATURE", "warm"),
            ("CRAG_LLM_PROVIDER", "mystery"),
        ]);
        assert_eq!(settings.judge_cap, 30);
        assert!((settings.llm_temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.llm_provider, LlmProvider::Cerebras);
    }
}
