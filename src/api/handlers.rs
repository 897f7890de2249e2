use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};
use tracing::{error, info, warn};

use super::{
    responses::{
        pdf_basename, ErrorResponse, HealthResponse, PdfGeneratedResponse, PdfPathResponse,
        TokenResponse,
    },
    state::AppState,
};
use crate::auth::Teacher;
use crate::error::SmartMarksError;
use crate::grade;
use crate::model::{ExtractionResult, Improvements, ResultBatch};
use crate::pipeline::analyze;
use crate::report::{
    self,
    compose::{is_plain_filename, ReportEntry, StudentInfo},
};

const LOGIN_CHALLENGE: &str = "Basic realm=\"Login required!\"";

/// Health check handler
pub async fn get_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Parse a JSON body leniently; an empty or malformed body is `None`.
fn json_body<T: DeserializeOwned>(body: &Bytes) -> Option<T> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Exchange email and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ErrorResponse> {
    let request: Option<LoginRequest> = json_body(&body);
    let (email, password) = match request {
        Some(LoginRequest {
            email: Some(email),
            password: Some(password),
        }) if !email.is_empty() && !password.is_empty() => (email, password),
        _ => {
            return Err(ErrorResponse::unauthorized("Could not verify").with_challenge(LOGIN_CHALLENGE))
        }
    };

    let teacher = state
        .credentials
        .verify(&email, &password)
        .ok_or_else(|| ErrorResponse::unauthorized("Could not verify! Wrong email or password."))?;

    let token = state.tokens.issue(&teacher.id).map_err(|e| {
        error!("Failed to issue token: {}", e);
        ErrorResponse::internal_error("Failed to issue token", None)
    })?;

    info!("Teacher {} logged in", teacher.id);
    Ok(Json(TokenResponse { token }))
}

/// Store uploaded essay images, grade them, and replace the session batch.
pub async fn upload(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    mut multipart: Multipart,
) -> Result<Json<ResultBatch>, ErrorResponse> {
    // Every upload call starts a fresh session, whatever its outcome.
    state.sessions.clear(&teacher.id).await;

    let mut student_name = None;
    let mut student_class = None;
    let mut subject = None;
    let mut stored = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body: {}", e);
        ErrorResponse::validation_error("Invalid form data")
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "studentName" | "studentClass" | "subject" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ErrorResponse::validation_error("Invalid form data"))?;
                match name.as_str() {
                    "studentName" => student_name = Some(value),
                    "studentClass" => student_class = Some(value),
                    _ => subject = Some(value),
                }
            }
            "images" => {
                let original = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ErrorResponse::validation_error("Invalid form data"))?;
                if data.is_empty() {
                    continue;
                }
                let filename = stored_filename(original.as_deref(), &data);
                save_upload(&state.config.upload_dir, &filename, &data).await?;
                stored.push(filename);
            }
            other => warn!("Ignoring unexpected form field {:?}", other),
        }
    }

    if stored.is_empty() {
        return Err(ErrorResponse::validation_error("No images uploaded"));
    }

    info!("Teacher {} uploaded {} images", teacher.id, stored.len());
    let results = grade::process_batch(state.gateway.as_ref(), &state.config, &stored)
        .await
        .map_err(|e| {
            error!("Grading failed: {}", e);
            ErrorResponse::internal_error("Failed to process images", Some(e.to_string()))
        })?;

    let batch = ResultBatch {
        student_name,
        student_class,
        subject,
        results,
    };
    state.sessions.replace(&teacher.id, batch.clone()).await;
    Ok(Json(batch))
}

/// `<uuid><ext>`, keeping the client's extension or sniffing one from the bytes.
fn stored_filename(original: Option<&str>, data: &[u8]) -> String {
    let ext = original
        .and_then(|n| FsPath::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .or_else(|| {
            image::guess_format(data)
                .ok()
                .and_then(|f| f.extensions_str().first())
                .map(|e| e.to_string())
        });
    match ext {
        Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
        None => uuid::Uuid::new_v4().to_string(),
    }
}

async fn save_upload(dir: &FsPath, filename: &str, data: &[u8]) -> Result<(), ErrorResponse> {
    let write = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(filename), data).await
    };
    write.await.map_err(|e| {
        error!("Failed to store upload {}: {}", filename, e);
        ErrorResponse::internal_error("Failed to process images", Some(e.to_string()))
    })
}

/// The caller's latest batch.
pub async fn get_results(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
) -> Result<Json<ResultBatch>, ErrorResponse> {
    state
        .sessions
        .get(&teacher.id)
        .await
        .filter(|b| !b.results.is_empty())
        .map(Json)
        .ok_or_else(|| ErrorResponse::not_found("No results found"))
}

#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Re-grade one stored image.
pub async fn retry_image(
    State(state): State<AppState>,
    Extension(teacher): Extension<Teacher>,
    body: Bytes,
) -> Result<Json<ExtractionResult>, ErrorResponse> {
    let image = json_body::<RetryRequest>(&body)
        .and_then(|r| r.image)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ErrorResponse::validation_error("No image provided"))?;

    let stored = is_plain_filename(&image)
        && tokio::fs::metadata(state.config.upload_dir.join(&image))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
    if !stored {
        return Err(ErrorResponse::not_found("File not found on server"));
    }

    let result = grade::process_image(
        state.gateway.as_ref(),
        &state.config.upload_dir,
        &image,
        state.config.annotation,
    )
    .await
    .map_err(|e| {
        error!("Retry of {} failed: {}", image, e);
        ErrorResponse::internal_error("Failed to process image", Some(e.to_string()))
    })?;

    if !state.sessions.replace_result(&teacher.id, result.clone()).await {
        info!("Retried image {} is not part of the stored batch", image);
    }
    Ok(Json(result))
}

/// Render the student report for client-supplied results.
///
/// Entries are read one by one so a malformed entry is dropped on its own
/// instead of failing the request.
pub async fn generate_pdf(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PdfGeneratedResponse>, ErrorResponse> {
    let data: serde_json::Map<String, serde_json::Value> = json_body(&body)
        .filter(|m: &serde_json::Map<_, _>| !m.is_empty())
        .ok_or_else(|| ErrorResponse::validation_error("No data received"))?;

    let entries: Vec<ReportEntry> = data
        .get("results")
        .and_then(|r| r.as_array())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ErrorResponse::validation_error("No extracted text provided"))?
        .iter()
        .map(ReportEntry::from_json)
        .collect();

    let field = |key: &str| data.get(key).and_then(|v| v.as_str()).map(str::to_string);
    let info = StudentInfo::from_optional(
        field("studentName"),
        field("studentClass"),
        field("subject"),
    );

    match report::generate_student_report(state.renderer.as_ref(), &state.config, &info, entries)
        .await
    {
        Ok(path) => Ok(Json(PdfGeneratedResponse {
            message: "PDF generated successfully",
            pdf_path: pdf_basename(&path),
        })),
        Err(SmartMarksError::EmptyInput) => {
            Err(ErrorResponse::validation_error("No valid results to generate PDF"))
        }
        Err(e) => {
            error!("Student report failed: {}", e);
            Err(ErrorResponse::internal_error(
                "Failed to generate PDF",
                Some(e.to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImprovementsRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImprovementsResponse {
    pub text: String,
    pub improvements: Improvements,
}

/// Complexity metrics plus writing suggestions for a text.
pub async fn get_improvements(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImprovementsResponse>, ErrorResponse> {
    let text = json_body::<ImprovementsRequest>(&body)
        .and_then(|r| r.text)
        .ok_or_else(|| ErrorResponse::validation_error("No text provided"))?;

    let improvements = analyze::analyze(state.gateway.as_ref(), &text).await;
    Ok(Json(ImprovementsResponse { text, improvements }))
}

/// Render the improvement report from a `/get_improvements` response the
/// client echoes back. Suggestions may arrive as an object or as a JSON
/// string; anything unreadable yields empty lists.
pub async fn improvements_pdf(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PdfPathResponse>, ErrorResponse> {
    let data: serde_json::Map<String, serde_json::Value> = json_body(&body)
        .filter(|m: &serde_json::Map<_, _>| !m.is_empty())
        .ok_or_else(|| ErrorResponse::validation_error("No data provided"))?;

    let text = data.get("text").and_then(|t| t.as_str()).unwrap_or_default();
    let improvements = data.get("improvements");
    let metrics = improvements
        .and_then(|i| i.get("complexity_metrics"))
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let suggestions = improvements
        .and_then(|i| i.get("improvement_suggestions"))
        .and_then(|s| match s {
            serde_json::Value::String(raw) => analyze::parse_suggestions(raw),
            other => analyze::parse_suggestions(&other.to_string()),
        })
        .unwrap_or_default();

    report::generate_improvement_report(
        state.renderer.as_ref(),
        &state.config,
        text,
        &metrics,
        &suggestions,
    )
    .await
    .map(|path| {
        Json(PdfPathResponse {
            pdf_path: pdf_basename(&path),
        })
    })
    .map_err(|e| {
        error!("Improvement report failed: {}", e);
        ErrorResponse::internal_error("Failed to create PDF", None)
    })
}

/// Serve a generated report.
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ErrorResponse> {
    serve_file(&state.config.pdf_dir, &filename).await
}

/// Serve a stored upload.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ErrorResponse> {
    serve_file(&state.config.upload_dir, &filename).await
}

async fn serve_file(dir: &FsPath, filename: &str) -> Result<Response, ErrorResponse> {
    if !is_plain_filename(filename) {
        warn!("Rejected file request {:?}", filename);
        return Err(ErrorResponse::not_found("File not found"));
    }
    let path: PathBuf = dir.join(filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ErrorResponse::not_found("File not found"))?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}

fn content_type(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
