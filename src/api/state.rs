use std::sync::Arc;

use crate::auth::{CredentialStore, StaticCredentialStore, TokenIssuer};
use crate::config::ServiceConfig;
use crate::error::SmartMarksError;
use crate::pipeline::gateway::{Gateway, LlmGateway};
use crate::report::render::{PdfRenderer, WkHtmlToPdf};
use crate::session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,

    /// Language-model backend for OCR, correction, and suggestions
    pub gateway: Arc<dyn Gateway>,

    /// HTML to PDF converter
    pub renderer: Arc<dyn PdfRenderer>,

    /// Latest result batch per teacher
    pub sessions: Arc<SessionStore>,

    pub credentials: Arc<dyn CredentialStore>,

    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    /// Wire the production collaborators from `config`.
    pub fn from_config(config: ServiceConfig) -> Result<Self, SmartMarksError> {
        let gateway = LlmGateway::from_config(&config)?;
        let renderer = WkHtmlToPdf::new(config.wkhtmltopdf_path.clone());
        Ok(Self::with_collaborators(
            config,
            Arc::new(gateway),
            Arc::new(renderer),
        ))
    }

    /// Build state around caller-supplied collaborators (used by tests).
    pub fn with_collaborators(
        config: ServiceConfig,
        gateway: Arc<dyn Gateway>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        let credentials = StaticCredentialStore::new(config.teacher.as_ref());
        let tokens = TokenIssuer::new(&config.secret_key, config.token_ttl_hours);
        Self {
            config: Arc::new(config),
            gateway,
            renderer,
            sessions: Arc::new(SessionStore::new()),
            credentials: Arc::new(credentials),
            tokens: Arc::new(tokens),
        }
    }
}
