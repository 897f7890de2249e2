//! Service configuration.
//!
//! Everything the server needs at runtime lives in [`ServiceConfig`], built
//! via its [`ServiceConfigBuilder`]. The binary maps CLI flags and
//! environment variables onto the builder; tests build configs directly.

use crate::error::SmartMarksError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Longest accepted bearer token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Configuration for the grading service.
///
/// # Example
/// ```rust
/// use smartmarks::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .secret_key("change-me")
///     .upload_dir("/tmp/uploads")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Directory where uploaded images are stored. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Directory where generated PDF reports are written. Default: `generated_pdfs`.
    pub pdf_dir: PathBuf,

    /// HMAC secret used to sign bearer tokens. Required.
    pub secret_key: String,

    /// Bearer token lifetime in hours. Default: 24, at most [`MAX_TOKEN_TTL_HOURS`].
    pub token_ttl_hours: i64,

    /// The single teacher account allowed to log in.
    ///
    /// When `None` every login attempt is rejected.
    pub teacher: Option<TeacherCredentials>,

    /// LLM model identifier. Default: `gpt-4o`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for correction and suggestion calls. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate when transcribing one image. Default: 500.
    pub extraction_max_tokens: usize,

    /// Images of one upload processed concurrently. Default: 4.
    pub concurrency: usize,

    /// How flagged text is annotated. Default: [`AnnotationStrategy::Sequential`].
    pub annotation: AnnotationStrategy,

    /// Path or name of the `wkhtmltopdf` executable. Default: `wkhtmltopdf`.
    pub wkhtmltopdf_path: PathBuf,

    /// Request body limit for uploads in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            pdf_dir: PathBuf::from("generated_pdfs"),
            secret_key: String::new(),
            token_ttl_hours: 24,
            teacher: None,
            model: "gpt-4o".to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.2,
            extraction_max_tokens: 500,
            concurrency: 4,
            annotation: AnnotationStrategy::default(),
            wkhtmltopdf_path: PathBuf::from("wkhtmltopdf"),
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("upload_dir", &self.upload_dir)
            .field("pdf_dir", &self.pdf_dir)
            .field("secret_key", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("teacher", &self.teacher)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("extraction_max_tokens", &self.extraction_max_tokens)
            .field("concurrency", &self.concurrency)
            .field("annotation", &self.annotation)
            .field("wkhtmltopdf_path", &self.wkhtmltopdf_path)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.config.secret_key = secret.into();
        self
    }

    pub fn token_ttl_hours(mut self, hours: i64) -> Self {
        self.config.token_ttl_hours = hours;
        self
    }

    pub fn teacher(mut self, teacher: TeacherCredentials) -> Self {
        self.config.teacher = Some(teacher);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn extraction_max_tokens(mut self, n: usize) -> Self {
        self.config.extraction_max_tokens = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn annotation(mut self, strategy: AnnotationStrategy) -> Self {
        self.config.annotation = strategy;
        self
    }

    pub fn wkhtmltopdf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wkhtmltopdf_path = path.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, SmartMarksError> {
        let c = &self.config;
        if c.secret_key.trim().is_empty() {
            return Err(SmartMarksError::InvalidConfig(
                "A token signing secret is required".into(),
            ));
        }
        if c.token_ttl_hours <= 0 || c.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(SmartMarksError::InvalidConfig(format!(
                "Token lifetime must be between 1 and {}h, got {}h",
                MAX_TOKEN_TTL_HOURS, c.token_ttl_hours
            )));
        }
        if let Some(ref t) = c.teacher {
            if t.email.is_empty() || t.password.is_empty() || t.id.is_empty() {
                return Err(SmartMarksError::InvalidConfig(
                    "Teacher email, password and id must all be non-empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

/// Login credentials of the single teacher account.
#[derive(Clone, Serialize, Deserialize)]
pub struct TeacherCredentials {
    pub id: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for TeacherCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeacherCredentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the annotator applies error-table rows to a text.
///
/// | Strategy | Behaviour |
/// |----------|-----------|
/// | `Sequential` | each row rewrites the output of the previous one; overlapping rows may nest (default, matches existing reports byte for byte) |
/// | `NonOverlapping` | matches are located in the original text only, leftmost-longest, and each character is annotated at most once |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnnotationStrategy {
    #[default]
    Sequential,
    NonOverlapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.token_ttl_hours, 24);
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.extraction_max_tokens, 500);
        assert_eq!(c.annotation, AnnotationStrategy::Sequential);
    }

    #[test]
    fn build_requires_secret() {
        let err = ServiceConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn build_bounds_token_lifetime() {
        for hours in [0, -1, MAX_TOKEN_TTL_HOURS + 1, i64::MAX] {
            let err = ServiceConfig::builder()
                .secret_key("s")
                .token_ttl_hours(hours)
                .build()
                .unwrap_err();
            assert!(matches!(err, SmartMarksError::InvalidConfig(_)), "{hours}h");
        }
        let c = ServiceConfig::builder()
            .secret_key("s")
            .token_ttl_hours(MAX_TOKEN_TTL_HOURS)
            .build()
            .unwrap();
        assert_eq!(c.token_ttl_hours, MAX_TOKEN_TTL_HOURS);
    }

    #[test]
    fn build_rejects_partial_teacher() {
        let err = ServiceConfig::builder()
            .secret_key("s")
            .teacher(TeacherCredentials {
                id: "1".into(),
                email: "t@example.com".into(),
                password: String::new(),
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, SmartMarksError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps() {
        let c = ServiceConfig::builder()
            .secret_key("s")
            .concurrency(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = ServiceConfig::builder()
            .secret_key("top-secret")
            .teacher(TeacherCredentials {
                id: "1".into(),
                email: "t@example.com".into(),
                password: "hunter2".into(),
            })
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("top-secret"));
        assert!(!dbg.contains("hunter2"));
    }
}
