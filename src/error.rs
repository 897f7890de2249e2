//! Error types for the smartmarks library.
//!
//! [`SmartMarksError`] covers every failure the grading pipeline, the report
//! composer, and the PDF renderer can surface. The HTTP layer maps these onto
//! status codes in [`crate::api::responses`]; the library itself never knows
//! about HTTP.
//!
//! Gateway failures on the suggestions path never reach this type: the
//! analyzer substitutes a placeholder instead (see
//! [`crate::pipeline::analyze`]).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the smartmarks library.
#[derive(Debug, Error)]
pub enum SmartMarksError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An uploaded image was not found where it was expected.
    #[error("Image not found: '{path}'")]
    ImageNotFound { path: PathBuf },

    /// The image exists but could not be read from disk.
    #[error("Failed to read image '{path}': {source}")]
    ImageUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but does not decode as an image.
    #[error("File is not a valid image: '{path}': {detail}")]
    InvalidImage { path: PathBuf, detail: String },

    /// Every report section was filtered out; nothing left to render.
    #[error("No valid results to generate a report from")]
    EmptyInput,

    // ── Gateway errors ────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A language-model call failed.
    #[error("Gateway {operation} call failed: {message}")]
    GatewayFailed {
        operation: &'static str,
        message: String,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The HTML→PDF converter failed or could not be started.
    #[error("PDF rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
