//! Model interaction: send the OCR text plus a schema directive to a
//! language model and turn the answer into an [`ExtractionResult`].
//!
//! [`ModelService`] is the transport seam. [`OllamaClient`] speaks the
//! Ollama `/api/generate` contract; [`ProviderModelService`] routes the same
//! request through an edgequake-llm hosted provider. [`ExtractionClient`]
//! sits on top and owns the parse step, so the "never returns `Err`"
//! contract holds whichever transport is used.
//!
//! A failed call is never retried. The caller sees one outcome per call.

use crate::config::{ExtractionConfig, ModelBackend};
use crate::error::ExtractError;
use crate::output::ExtractionResult;
use crate::pipeline::postprocess::strip_code_fences;
use crate::prompts::document_prompt;
use crate::schema::SchemaTemplate;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
}

/// Response envelope of a non-streaming generate call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

/// One non-streaming text generation. Returns the model's raw text.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError>;
}

// ── Ollama ───────────────────────────────────────────────────────────────

/// Local Ollama server.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

#[async_trait]
impl ModelService for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
        let url = self.generate_url();
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ExtractError::ModelUnreachable {
                endpoint: url.clone(),
                detail: if e.is_timeout() {
                    format!("timed out after {}s", self.timeout_secs)
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::ModelHttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::ModelUnreachable {
                endpoint: url.clone(),
                detail: e.to_string(),
            })?;
        let envelope: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::ModelProtocol {
                detail: format!("{e} in response body"),
            })?;
        Ok(envelope.response)
    }
}

// ── Hosted providers ─────────────────────────────────────────────────────

/// Any provider edgequake-llm knows about (`openai`, `anthropic`, `gemini`, …).
///
/// No JSON mode is requested on the wire; the system directive asks for it.
pub struct ProviderModelService {
    provider_name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModelService {
    /// Create the provider; API keys are read from the environment.
    pub fn new(provider_name: &str, model: &str) -> Result<Self, ExtractError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ExtractError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::from_provider(provider_name, provider))
    }

    pub fn from_provider(provider_name: &str, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            provider,
        }
    }
}

#[async_trait]
impl ModelService for ProviderModelService {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ExtractError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.prompt.as_str()),
        ];
        let options = CompletionOptions {
            temperature: request.options.as_ref().map(|o| o.temperature),
            ..Default::default()
        };
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::ProviderCallFailed {
                provider: self.provider_name.clone(),
                detail: format!("{e}"),
            })?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider_name, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Pick the model service described by the config.
///
/// An injected `service` wins; otherwise the backend decides.
pub fn resolve_service(config: &ExtractionConfig) -> Result<Arc<dyn ModelService>, ExtractError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }
    match &config.backend {
        ModelBackend::Ollama => Ok(Arc::new(OllamaClient::new(
            &config.endpoint,
            config.request_timeout_secs,
        )?)),
        ModelBackend::Provider(name) => Ok(Arc::new(ProviderModelService::new(
            name,
            &config.model,
        )?)),
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────

/// Parse a model answer as JSON.
///
/// Any syntactically valid JSON is accepted. With `strip_fences`, a single
/// outer code fence is removed when the text as a whole does not parse.
/// On failure the raw text is carried unmodified.
pub fn parse_model_output(raw: &str, strip_fences: bool) -> Result<Value, ExtractError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            if strip_fences {
                if let Some(inner) = strip_code_fences(raw) {
                    if let Ok(value) = serde_json::from_str::<Value>(inner) {
                        debug!("Parsed model output after removing code fences");
                        return Ok(value);
                    }
                }
            }
            Err(ExtractError::InvalidJson {
                detail: e.to_string(),
                raw_output: raw.to_string(),
            })
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Sends text + template to a [`ModelService`] and classifies the outcome.
#[derive(Clone)]
pub struct ExtractionClient {
    service: Arc<dyn ModelService>,
    model: String,
    temperature: Option<f32>,
    strip_code_fences: bool,
}

impl ExtractionClient {
    pub fn new(service: Arc<dyn ModelService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            temperature: None,
            strip_code_fences: false,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let service = resolve_service(config)?;
        Ok(Self {
            service,
            model: config.model.clone(),
            temperature: config.temperature,
            strip_code_fences: config.strip_code_fences,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_strip_code_fences(mut self, v: bool) -> Self {
        self.strip_code_fences = v;
        self
    }

    /// The request sent for `text` under `template`.
    pub fn build_request(&self, text: &str, template: &SchemaTemplate) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: document_prompt(text),
            system: template.system_prompt.clone(),
            stream: false,
            format: Some("json".to_string()),
            options: self
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        }
    }

    /// One model call. Every failure becomes an [`ExtractionResult::Failure`].
    pub async fn extract(&self, text: &str, template: &SchemaTemplate) -> ExtractionResult {
        let start = Instant::now();
        let request = self.build_request(text, template);
        info!(
            "Calling {} model '{}' for {} ({} chars)",
            self.service.name(),
            self.model,
            template.document_type,
            text.len()
        );

        let raw = match self.service.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Model call failed: {}", e);
                return e.into();
            }
        };
        debug!(
            "Model answered {} chars in {:?}",
            raw.len(),
            start.elapsed()
        );

        match parse_model_output(&raw, self.strip_code_fences) {
            Ok(value) => {
                let missing = template.missing_top_level_fields(&value);
                if !missing.is_empty() {
                    warn!(
                        "Model output for {} lacks top-level fields: {}",
                        template.document_type,
                        missing.join(", ")
                    );
                }
                ExtractionResult::Success(value)
            }
            Err(e) => {
                warn!("{}", e);
                e.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::schema::{select_template, DocumentType};
    use serde_json::json;

    struct Canned(Result<String, ()>);

    #[async_trait]
    impl ModelService for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<String, ExtractError> {
            self.0.clone().map_err(|_| ExtractError::ModelUnreachable {
                endpoint: "http://127.0.0.1:1/api/generate".into(),
                detail: "connection refused".into(),
            })
        }
    }

    fn client(answer: Result<&str, ()>) -> ExtractionClient {
        ExtractionClient::new(Arc::new(Canned(answer.map(str::to_string))), "llama3")
    }

    #[test]
    fn request_matches_wire_contract() {
        let template = select_template(DocumentType::Invoice);
        let req = client(Ok("{}")).build_request("Invoice #123", template);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "llama3");
        assert_eq!(v["stream"], false);
        assert_eq!(v["format"], "json");
        assert_eq!(v["system"], template.system_prompt.as_str());
        assert!(v["prompt"].as_str().unwrap().contains("Invoice #123"));
        assert!(v.get("options").is_none());
    }

    #[test]
    fn temperature_goes_into_options() {
        let template = select_template(DocumentType::Resume);
        let req = client(Ok("{}"))
            .with_temperature(Some(0.0))
            .build_request("x", template);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["options"], json!({"temperature": 0.0}));
    }

    #[test]
    fn parse_accepts_any_json_shape() {
        assert_eq!(parse_model_output("[1,2]", false).unwrap(), json!([1, 2]));
        assert_eq!(parse_model_output(" {\"x\":1}\n", false).unwrap(), json!({"x": 1}));
        assert_eq!(parse_model_output("42", false).unwrap(), json!(42));
    }

    #[test]
    fn parse_keeps_raw_text_on_failure() {
        let raw = "Sure! Here is the JSON: {\"a\": 1}";
        match parse_model_output(raw, false).unwrap_err() {
            ExtractError::InvalidJson { raw_output, .. } => assert_eq!(raw_output, raw),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fences_only_stripped_when_enabled() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert!(parse_model_output(raw, false).is_err());
        assert_eq!(parse_model_output(raw, true).unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn schema_mismatch_is_still_success() {
        let template = select_template(DocumentType::Invoice);
        let result = client(Ok(r#"{"unexpected": true}"#))
            .extract("text", template)
            .await;
        assert_eq!(result.data(), Some(&json!({"unexpected": true})));
    }

    #[tokio::test]
    async fn transport_error_is_communication() {
        let template = select_template(DocumentType::Invoice);
        let result = client(Err(())).extract("text", template).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Communication);
        assert_eq!(failure.error, "communication failure");
    }

    #[tokio::test]
    async fn non_json_is_decode_with_raw_output() {
        let template = select_template(DocumentType::Resume);
        let result = client(Ok("not json at all")).extract("text", template).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Decode);
        assert_eq!(failure.raw_output.as_deref(), Some("not json at all"));
    }
}
