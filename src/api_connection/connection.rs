use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::env;
use std::future::Future;
use tracing::{debug, warn};

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Provider, RetryPolicy,
    CEREBRAS_CHAT_URL, OPENROUTER_CHAT_URL,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("API error {status}: {error_body}")]
    ApiError {
        status: StatusCode,
        error_body: String,
    },

    #[error("API returned no completion content")]
    EmptyResponse,
}

impl ApiConnectionError {
    /// Failures worth another attempt: dropped connections, timeouts and the
    /// statuses routers emit while a model is briefly unavailable.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiConnectionError::NetworkError(err) => err.is_connect() || err.is_timeout(),
            ApiConnectionError::ApiError { status, .. } => matches!(
                *status,
                StatusCode::NOT_FOUND
                    | StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            _ => false,
        }
    }
}

/// Anything that turns a rendered prompt into completion text.
///
/// Responses are untrusted: callers validate their shape before use.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError>;
}

impl Provider {
    pub fn openrouter(api_key_env: &str, model: &str) -> Self {
        Self::OpenRouter {
            api_key_env: api_key_env.to_string(),
            model: model.to_string(),
            temperature: Some(0.3),
            retry: RetryPolicy::default(),
        }
    }

    pub fn cerebras(api_key_env: &str, model: &str) -> Self {
        Self::Cerebras {
            api_key_env: api_key_env.to_string(),
            model: model.to_string(),
            temperature: Some(0.3),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_temperature(mut self, value: f32) -> Self {
        match &mut self {
            Provider::OpenRouter { temperature, .. } | Provider::Cerebras { temperature, .. } => {
                *temperature = Some(value)
            }
        }
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        match &mut self {
            Provider::OpenRouter { retry, .. } | Provider::Cerebras { retry, .. } => {
                *retry = policy
            }
        }
        self
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenRouter { model, .. } | Provider::Cerebras { model, .. } => model,
        }
    }

    fn api_key_env(&self) -> &str {
        match self {
            Provider::OpenRouter { api_key_env, .. } | Provider::Cerebras { api_key_env, .. } => {
                api_key_env
            }
        }
    }

    fn retry_policy(&self) -> &RetryPolicy {
        match self {
            Provider::OpenRouter { retry, .. } | Provider::Cerebras { retry, .. } => retry,
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Provider::OpenRouter { .. } => OPENROUTER_CHAT_URL,
            Provider::Cerebras { .. } => CEREBRAS_CHAT_URL,
        }
    }

    pub fn request_for(&self, prompt: &str) -> ChatCompletionRequest {
        let temperature = match self {
            Provider::OpenRouter { temperature, .. } | Provider::Cerebras { temperature, .. } => {
                *temperature
            }
        };
        ChatCompletionRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            max_tokens: None,
        }
    }

    /// Sends one request, retrying transient failures with exponential backoff.
    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        let key_name = self.api_key_env();
        let api_key =
            env::var(key_name).map_err(|_| ApiConnectionError::MissingApiKey(key_name.to_string()))?;

        let client = Client::new();
        retry_transient(self.retry_policy(), || self.send_once(&client, &api_key, request)).await
    }

    async fn send_once(
        &self,
        client: &Client,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        let mut builder = client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("Content-Type", "application/json");

        if let Provider::OpenRouter { .. } = self {
            let site_url =
                env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
            let app_name = env::var("APP_NAME").unwrap_or_else(|_| "RecipeCrag".to_string());
            builder = builder
                .header("HTTP-Referer", site_url)
                .header("X-Title", app_name);
        }

        let response = builder.json(request).send().await?;

        if response.status().is_success() {
            let chat_response = response.json::<ChatCompletionResponse>().await?;
            Ok(chat_response)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(ApiConnectionError::ApiError { status, error_body })
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or the policy's attempts
/// are spent. Transient failures wait `delay_for(attempt)` between tries.
pub(crate) async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ApiConnectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiConnectionError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let wait = policy.delay_for(attempt);
                warn!(
                    "Transient completion failure ({}). Retrying in {:?} (attempt {}/{})",
                    err,
                    wait,
                    attempt + 1,
                    policy.max_attempts
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[async_trait]
impl LanguageModel for Provider {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let request = self.request_for(prompt);
        let response = self.call_chat_completion(&request).await?;
        let content = response
            .first_content()
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        debug!(model = %response.model, chars = content.len(), "completion received");
        if content.is_empty() {
            return Err(ApiConnectionError::EmptyResponse);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    fn api_error(status: StatusCode) -> ApiConnectionError {
        ApiConnectionError::ApiError {
            status,
            error_body: status.to_string(),
        }
    }

    #[test]
    fn service_unavailable_is_transient() {
        let err = ApiConnectionError::ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error_body: "Service Temporarily Unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn bad_request_is_not_transient() {
        let err = ApiConnectionError::ApiError {
            status: StatusCode::BAD_REQUEST,
            error_body: "bad".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!ApiConnectionError::EmptyResponse.is_transient());
    }

    #[test]
    fn request_carries_model_and_temperature() {
        let provider = Provider::cerebras("CEREBRAS_API_KEY", "llama-3.3-70b").with_temperature(0.1);
        let request = provider.request_for("expand this");
        assert_eq!(request.model, "llama-3.3-70b");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "expand this");
    }

    #[tokio::test]
    async fn transient_failures_use_every_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&quick_policy(3), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(StatusCode::SERVICE_UNAVAILABLE)) }
        })
        .await;
        assert!(matches!(
            result,
            Err(ApiConnectionError::ApiError { status: StatusCode::SERVICE_UNAVAILABLE, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_stops_after_one_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&quick_policy(5), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(StatusCode::BAD_REQUEST)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_a_retry_is_returned() {
        let attempts = AtomicU32::new(0);
        let result = retry_transient(&quick_policy(5), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(api_error(StatusCode::TOO_MANY_REQUESTS))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_attempt_policy_does_not_retry() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&RetryPolicy::none(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(StatusCode::BAD_GATEWAY)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_api_key_is_reported() {
        let provider = Provider::openrouter("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ", "qwen/qwen3-32b");
        let result = provider.complete("Hello").await;
        match result {
            Err(ApiConnectionError::MissingApiKey(name)) => {
                assert_eq!(name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ")
            }
            other => panic!("expected MissingApiKey, got {:?}", other),
        }
    }
}
