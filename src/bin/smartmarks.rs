//! CLI binary for smartmarks.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServiceConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use smartmarks::api::{state::AppState, ApiServer};
use smartmarks::{AnnotationStrategy, ServiceConfig, TeacherCredentials};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address with one teacher account
  SMARTMARKS_SECRET_KEY=change-me TEACHER_EMAIL=t@school.org TEACHER_PASSWORD=pw smartmarks

  # Use a specific model and provider
  smartmarks --model gpt-4.1 --provider openai

  # Non-overlapping highlights, larger batches in flight
  smartmarks --annotation non-overlapping --concurrency 8

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (selects the openai provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_PROVIDER      Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, overrides --verbose/--quiet

SETUP:
  1. Install wkhtmltopdf (PDF reports) and set an API key.
  2. Export SMARTMARKS_SECRET_KEY and the TEACHER_* credentials.
  3. Run smartmarks and point the web client at it.
"#;

/// Serve the handwriting grading API.
#[derive(Parser, Debug)]
#[command(
    name = "smartmarks",
    version,
    about = "Handwriting grading backend powered by Vision LLMs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "SMARTMARKS_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Directory for uploaded essay images.
    #[arg(long, env = "SMARTMARKS_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory for generated PDF reports.
    #[arg(long, env = "SMARTMARKS_PDF_DIR", default_value = "generated_pdfs")]
    pdf_dir: PathBuf,

    /// Secret used to sign login tokens.
    #[arg(long, env = "SMARTMARKS_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Token lifetime in hours.
    #[arg(long, env = "SMARTMARKS_TOKEN_TTL_HOURS", default_value_t = 24)]
    token_ttl_hours: i64,

    /// Login email of the teacher account.
    #[arg(long, env = "TEACHER_EMAIL")]
    teacher_email: Option<String>,

    /// Login password of the teacher account.
    #[arg(long, env = "TEACHER_PASSWORD", hide_env_values = true)]
    teacher_password: Option<String>,

    /// Identifier of the teacher account (token subject).
    #[arg(long, env = "TEACHER_ID", default_value = "1")]
    teacher_id: String,

    /// LLM model ID (e.g. gpt-4o, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Images graded concurrently per upload.
    #[arg(short, long, env = "SMARTMARKS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Highlighting strategy.
    #[arg(long, env = "SMARTMARKS_ANNOTATION", value_enum, default_value = "sequential")]
    annotation: AnnotationArg,

    /// Path to the wkhtmltopdf executable.
    #[arg(long, env = "WKHTMLTOPDF_PATH", default_value = "wkhtmltopdf")]
    wkhtmltopdf: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SMARTMARKS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SMARTMARKS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum AnnotationArg {
    Sequential,
    NonOverlapping,
}

impl From<AnnotationArg> for AnnotationStrategy {
    fn from(v: AnnotationArg) -> Self {
        match v {
            AnnotationArg::Sequential => AnnotationStrategy::Sequential,
            AnnotationArg::NonOverlapping => AnnotationStrategy::NonOverlapping,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ServiceConfig::builder()
        .upload_dir(&cli.upload_dir)
        .pdf_dir(&cli.pdf_dir)
        .secret_key(cli.secret_key)
        .token_ttl_hours(cli.token_ttl_hours)
        .concurrency(cli.concurrency)
        .annotation(cli.annotation.into())
        .wkhtmltopdf_path(&cli.wkhtmltopdf);

    match (cli.teacher_email, cli.teacher_password) {
        (Some(email), Some(password)) => {
            builder = builder.teacher(TeacherCredentials {
                id: cli.teacher_id,
                email,
                password,
            });
        }
        (None, None) => {
            tracing::warn!("No teacher credentials configured; every login will be rejected");
        }
        _ => anyhow::bail!("TEACHER_EMAIL and TEACHER_PASSWORD must be set together"),
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    let config = builder.build().context("Invalid configuration")?;

    for dir in [&config.upload_dir, &config.pdf_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    info!(
        "Model {} via {}",
        config.model,
        config.provider_name.as_deref().unwrap_or("auto-detected provider")
    );

    let state = AppState::from_config(config).context("Failed to initialise LLM provider")?;
    ApiServer::new(state, cli.bind)
        .start()
        .await
        .with_context(|| format!("Server on {} failed", cli.bind))?;
    Ok(())
}
