//! HTTP surface: application state, router, and handlers.

use crate::batch::{run_claimed, Batch, BatchConfig, BatchError, BatchSnapshot};
use crate::config::Settings;
use crate::enhance::{enhance_all, OpenAiClient};
use crate::export;
use crate::normalize::{normalize, NormalizedRecord};
use crate::scan::{RawScanResult, ScanError, ScanInput, ScanProvider};
use crate::session::{SessionStore, SESSION_COOKIE, SESSION_TTL_SECS};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Maximum accepted upload size per file: 10 MiB.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// One batch per authenticated session.
    pub batches: Arc<RwLock<HashMap<String, Batch>>>,
    pub provider: Arc<dyn ScanProvider>,
    pub enhancer: Option<Arc<OpenAiClient>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency: self.settings.concurrency,
            scan_timeout_secs: self.settings.scan_timeout_secs,
            dedup_enabled: self.settings.dedup_enabled,
            address_strategy: self.settings.address_strategy,
            rng_seed: None,
        }
    }

    fn batch_for(&self, session_id: &str) -> Batch {
        let mut batches = self.batches.write().unwrap();
        batches.entry(session_id.to_string()).or_default().clone()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/scan", post(scan_single))
        .route("/api/batch/files", post(batch_add_files))
        .route("/api/batch/process", post(batch_process))
        .route("/api/batch", get(batch_status))
        .route("/api/batch/clear", post(batch_clear))
        .route("/api/batch/export", get(batch_export))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(protected)
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // whole multipart body; per-file limit is checked per field
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Auth
// ============================================================================

/// Extract the session ID from the Cookie header.
fn session_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Gate for the scan/batch/export routes: unauthenticated requests get 401.
async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = session_id(request.headers())
        .map(|id| state.sessions.is_valid(&id))
        .unwrap_or(false);

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()).into_response();
    }
    next.run(request).await
}

#[derive(Deserialize)]
struct LoginRequest {
    id_token: String,
}

/// Exchange a client identity token for a session cookie.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if body.id_token.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "ID token is required".to_string()));
    }

    let id = state.sessions.create();
    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, id, SESSION_TTL_SECS
    );

    info!("Session created");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    ))
}

/// Clear the session cookie and drop the session.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id);
        state.batches.write().unwrap().remove(&id);
    }

    let cookie = format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE);
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    )
}

// ============================================================================
// Upload validation
// ============================================================================

const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Reject files the scan provider will not accept, before they can enter a
/// batch.
fn validate_upload(filename: &str, mime_type: &str, size: usize) -> Result<(), String> {
    if size == 0 {
        return Err(format!("{}: file is empty", filename));
    }
    if size > MAX_FILE_SIZE {
        return Err(format!(
            "{}: file exceeds the 10 MiB limit ({} bytes)",
            filename, size
        ));
    }
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(format!(
            "{}: unsupported type '{}'. Supported: JPEG, PNG, PDF",
            filename, mime_type
        ));
    }
    Ok(())
}

struct UploadedFile {
    filename: String,
    mime_type: String,
    data: Vec<u8>,
}

/// Drain all file fields from a multipart body, validating each.
async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, (StatusCode, String)> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read {}: {}", filename, e),
                )
            })?
            .to_vec();

        validate_upload(&filename, &mime_type, data.len())
            .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

        files.push(UploadedFile {
            filename,
            mime_type,
            data,
        });
    }

    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }
    Ok(files)
}

// ============================================================================
// Scan
// ============================================================================

#[derive(Serialize)]
struct ScanResponse {
    success: bool,
    data: RawScanResult,
    processing_time_ms: u128,
}

fn scan_error_status(e: &ScanError) -> StatusCode {
    match e {
        ScanError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ScanError::Provider { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Scan a single uploaded document and return the raw field map.
async fn scan_single(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, (StatusCode, String)> {
    let started = Instant::now();
    let mut files = read_uploads(&mut multipart).await?;
    let file = files.remove(0);

    info!(
        "Scanning {} ({} bytes, {})",
        file.filename,
        file.data.len(),
        file.mime_type
    );

    let input = ScanInput {
        filename: file.filename,
        mime_type: file.mime_type,
        data: file.data,
    };

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(state.settings.scan_timeout_secs),
        state.provider.scan(&input),
    )
    .await
    .unwrap_or(Err(ScanError::Timeout(state.settings.scan_timeout_secs)));

    match result {
        Ok(data) => Ok(Json(ScanResponse {
            success: true,
            data,
            processing_time_ms: started.elapsed().as_millis(),
        })),
        Err(e) => {
            error!("Scan failed for {}: {}", input.filename, e);
            Err((scan_error_status(&e), format!("Error scanning document: {}", e)))
        }
    }
}

// ============================================================================
// Batch
// ============================================================================

#[derive(Serialize)]
struct AddFilesResponse {
    added: usize,
    items: Vec<Uuid>,
}

/// Add uploaded files to the session batch as pending items.
async fn batch_add_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AddFilesResponse>, (StatusCode, String)> {
    let session = session_id(&headers).expect("gated route");
    let batch = state.batch_for(&session);

    let files = read_uploads(&mut multipart).await?;
    let items: Vec<Uuid> = files
        .into_iter()
        .map(|f| batch.add_file(f.filename, f.mime_type, f.data))
        .collect();

    Ok(Json(AddFilesResponse {
        added: items.len(),
        items,
    }))
}

#[derive(Serialize)]
struct ProcessResponse {
    started: bool,
    claimed: usize,
}

/// Start processing all pending items. Returns immediately; progress is
/// observed through the status endpoint.
async fn batch_process(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<ProcessResponse>), (StatusCode, String)> {
    let session = session_id(&headers).expect("gated route");
    let batch = state.batch_for(&session);

    let claimed = batch.try_claim().map_err(|e: BatchError| {
        (StatusCode::CONFLICT, e.to_string())
    })?;

    if claimed.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No pending files to process".to_string()));
    }

    let count = claimed.len();
    tokio::spawn(run_claimed(
        batch,
        claimed,
        state.provider.clone(),
        state.batch_config(),
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            started: true,
            claimed: count,
        }),
    ))
}

/// Snapshot of the session batch: items, counters, processing flag.
async fn batch_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<BatchSnapshot> {
    let session = session_id(&headers).expect("gated route");
    Json(state.batch_for(&session).snapshot())
}

/// Reset the session batch. Not available while processing.
async fn batch_clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let session = session_id(&headers).expect("gated route");
    state
        .batch_for(&session)
        .clear()
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ============================================================================
// Export
// ============================================================================

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

/// Download all completed records as CSV or XLSX.
async fn batch_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response, (StatusCode, String)> {
    let session = session_id(&headers).expect("gated route");
    let batch = state.batch_for(&session);

    let records = export_records(&state, &batch).await;
    if records.is_empty() {
        return Err((
            StatusCode::CONFLICT,
            "No completed scans to export".to_string(),
        ));
    }

    let format = query.format.as_deref().unwrap_or("csv");
    let (bytes, content_type, filename) = match format {
        "csv" => (
            export::to_csv(&records)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
            "text/csv; charset=utf-8",
            export::export_filename("csv"),
        ),
        "xlsx" => (
            export::to_xlsx(&records)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            export::export_filename("xlsx"),
        ),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown export format '{}'. Expected: csv, xlsx", other),
            ));
        }
    };

    info!("Exporting {} records as {}", records.len(), format);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Collect the records to export, running AI enhancement over the raw scans
/// first when it is configured and available.
async fn export_records(state: &AppState, batch: &Batch) -> Vec<NormalizedRecord> {
    match (&state.enhancer, state.settings.enhance_on_export) {
        (Some(enhancer), true) => {
            let raws = batch.completed_raw();
            let enhanced = enhance_all(
                enhancer.clone(),
                raws,
                state.settings.concurrency,
            )
            .await;
            let mut rng = StdRng::from_entropy();
            enhanced
                .iter()
                .map(|raw| normalize(raw, state.settings.address_strategy, &mut rng))
                .collect()
        }
        _ => batch.completed_records(),
    }
}

// ============================================================================
// Misc
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}
