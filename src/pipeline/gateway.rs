//! Language-model gateway: the only stage with network I/O.
//!
//! [`Gateway`] is the seam between the grading pipeline and the model
//! provider. Production code uses [`LlmGateway`], a thin adapter over an
//! `edgequake-llm` provider; tests inject canned implementations.
//!
//! Calls are made exactly once. A failure is reported as
//! [`SmartMarksError::GatewayFailed`] and the caller decides whether a
//! placeholder makes sense (suggestions) or the request must fail (grading).

use crate::config::ServiceConfig;
use crate::error::SmartMarksError;
use crate::model::Language;
use crate::pipeline::normalize::RawCorrections;
use crate::prompts::{
    correction_request, suggestions_request, CORRECTION_SYSTEM_PROMPT, EXTRACTION_PROMPT,
    LANGUAGE_SYSTEM_PROMPT, SUGGESTIONS_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Everything the service asks of the language model.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Transcribe the handwriting in an image verbatim.
    async fn extract_text(&self, image: ImageData) -> Result<String, SmartMarksError>;

    /// Critique a text; the answer is line-oriented
    /// `incorrect -> correct -> category` triples.
    async fn correct_text(&self, text: &str) -> Result<RawCorrections, SmartMarksError>;

    /// Produce a JSON writing-improvement report in the given language.
    async fn suggest_improvements(
        &self,
        text: &str,
        language: Language,
    ) -> Result<String, SmartMarksError>;

    /// Name the language of a text, ideally as an ISO-639-1 code.
    async fn detect_language(&self, text: &str) -> Result<String, SmartMarksError>;
}

/// [`Gateway`] backed by an `edgequake-llm` chat provider.
pub struct LlmGateway {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    extraction_max_tokens: usize,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            extraction_max_tokens: config.extraction_max_tokens,
        }
    }

    /// Resolve the provider from the config and environment, then wrap it.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, SmartMarksError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    async fn complete(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, SmartMarksError> {
        let start = Instant::now();
        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Gateway {}: {} input tokens, {} output tokens, {:?}",
                    operation,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("Gateway {} failed — {}", operation, e);
                Err(SmartMarksError::GatewayFailed {
                    operation,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl Gateway for LlmGateway {
    async fn extract_text(&self, image: ImageData) -> Result<String, SmartMarksError> {
        let messages = vec![ChatMessage::user_with_images(EXTRACTION_PROMPT, vec![image])];
        let options = CompletionOptions {
            max_tokens: Some(self.extraction_max_tokens),
            ..Default::default()
        };
        self.complete("extract", messages, options).await
    }

    async fn correct_text(&self, text: &str) -> Result<RawCorrections, SmartMarksError> {
        let messages = vec![
            ChatMessage::system(CORRECTION_SYSTEM_PROMPT),
            ChatMessage::user(correction_request(text)),
        ];
        let raw = self
            .complete("correct", messages, self.text_options())
            .await?;
        debug!("Gateway correct raw response:\n{}", raw);
        Ok(RawCorrections::Text(raw.trim().to_string()))
    }

    async fn suggest_improvements(
        &self,
        text: &str,
        language: Language,
    ) -> Result<String, SmartMarksError> {
        let messages = vec![
            ChatMessage::system(SUGGESTIONS_SYSTEM_PROMPT),
            ChatMessage::user(suggestions_request(text, language.name())),
        ];
        self.complete("suggest", messages, self.text_options()).await
    }

    async fn detect_language(&self, text: &str) -> Result<String, SmartMarksError> {
        let messages = vec![
            ChatMessage::system(LANGUAGE_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(5),
            ..Default::default()
        };
        self.complete("detect_language", messages, options).await
    }
}

impl LlmGateway {
    fn text_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`; the
///    factory reads the matching API key from the environment.
/// 3. **OpenAI key present** (`OPENAI_API_KEY`): OpenAI with `config.model`.
/// 4. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>, SmartMarksError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SmartMarksError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SmartMarksError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SmartMarksError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
