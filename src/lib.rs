//! # smartmarks
//!
//! Backend for grading handwritten essays with a Vision Language Model.
//!
//! A teacher photographs essay pages and uploads them. Each page is
//! transcribed by the model, critiqued for spelling and grammar, and returned
//! as an error table plus colour-highlighted text. The teacher can then export
//! a PDF report, or ask for readability metrics and writing suggestions on
//! any text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image upload
//!  │
//!  ├─ 1. Encode     image → base64 ImageData (MIME sniffed)
//!  ├─ 2. Extract    VLM transcription
//!  ├─ 3. Correct    VLM critique: "incorrect -> correct -> category" lines
//!  ├─ 4. Normalize  lines → CorrectionEntry table
//!  ├─ 5. Annotate   coloured spans (screen) / S,G superscripts (PDF)
//!  └─ 6. Report     HTML → PDF via wkhtmltopdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartmarks::{api::{ApiServer, state::AppState}, ServiceConfig, TeacherCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .secret_key("change-me")
//!         .teacher(TeacherCredentials {
//!             id: "1".into(),
//!             email: "teacher@example.com".into(),
//!             password: "secret".into(),
//!         })
//!         .build()?;
//!     let state = AppState::from_config(config)?;
//!     ApiServer::new(state, "127.0.0.1:5000".parse()?).start().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `smartmarks` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod grade;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::{AuthError, CredentialStore, StaticCredentialStore, Teacher, TokenIssuer};
pub use config::{AnnotationStrategy, ServiceConfig, ServiceConfigBuilder, TeacherCredentials};
pub use error::SmartMarksError;
pub use grade::{process_batch, process_image};
pub use model::{
    ComplexityMetrics, CorrectionEntry, ErrorCategory, ExtractionResult, Improvements, Language,
    ResultBatch, Suggestions, VocabularyEnhancement,
};
pub use pipeline::gateway::{Gateway, LlmGateway};
pub use report::render::{PdfRenderer, WkHtmlToPdf};
pub use session::SessionStore;
