// 🌐 REST API with Axum
//
// POST /api/cnab/upload              multipart CNAB upload → ImportResult
// GET  /api/stores/summary           paged store balances
// GET  /api/stores/:id/transactions  one store with its transactions
// GET  /api/health                   liveness

use crate::db::{get_store, get_transactions_by_store, import_cnab};
use crate::entities::{Store, Transaction};
use crate::error::ImportError;
use crate::import::{ImportResult, Importer};
use crate::summary::{summarize_stores, PageRequest, StoreSummaryPage};
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart,
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    importer: Arc<Importer>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            importer: Arc::new(Importer::new()),
        }
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Error payload, `traceId` correlates the response with the server log
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub trace_id: String,
    pub status_code: u16,
    pub error: String,
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let trace_id = uuid::Uuid::new_v4().to_string();

        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request."),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found."),
            ApiError::Import(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error has occurred.",
            ),
        };

        if status.is_server_error() {
            error!(%trace_id, status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(%trace_id, status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            trace_id,
            status_code: status.as_u16(),
            error: message.to_string(),
            details: Some(self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

/// Run `query` against the shared connection on the blocking pool
///
/// rusqlite is synchronous and an import holds the lock for its whole run,
/// so the lock is never taken on an async worker.
async fn with_db<T, F>(state: AppState, query: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = state.lock_db()?;
        query(&mut conn)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("database task failed: {}", e)))?
}

// ============================================================================
// Responses
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreTransactionsResponse {
    pub store: Store,
    pub total_balance: Decimal,
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/cnab/upload - Import the multipart field `file`
async fn upload_cnab(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportResult>, ApiError> {
    let mut multipart = multipart.map_err(|_| {
        ApiError::BadRequest("Form content type expected (multipart/form-data).".to_string())
    })?;

    let mut content = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            content = Some(bytes);
            break;
        }
    }

    let content = match content {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ApiError::BadRequest("CNAB file is required.".to_string())),
    };

    info!(bytes = content.len(), "Received CNAB upload");

    let importer = Arc::clone(&state.importer);
    let result = with_db(state, move |conn| {
        Ok(import_cnab(conn, importer.as_ref(), Cursor::new(content))?)
    })
    .await?;

    Ok(Json(result))
}

/// GET /api/stores/summary - Stores with their balances, paged
async fn stores_summary(
    State(state): State<AppState>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<StoreSummaryPage>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = PageRequest::normalize(params.page, params.page_size);

    let page = with_db(state, move |conn| Ok(summarize_stores(conn, request)?)).await?;

    Ok(Json(page))
}

/// GET /api/stores/:id/transactions - One store and everything it recorded
async fn store_transactions(
    State(state): State<AppState>,
    Path(store_id): Path<i64>,
) -> Result<Json<StoreTransactionsResponse>, ApiError> {
    let response = with_db(state, move |conn| {
        let store = get_store(conn, store_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Store {} not found.", store_id)))?;
        let transactions = get_transactions_by_store(conn, store_id)?;
        let total_balance = transactions.iter().map(|t| t.value).sum();

        Ok(StoreTransactionsResponse {
            store,
            total_balance,
            transactions,
        })
    })
    .await?;

    Ok(Json(response))
}

/// GET / - Serve the upload page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/cnab/upload", post(upload_cnab))
        .route("/stores/summary", get(stores_summary))
        .route("/stores/:id/transactions", get(store_transactions))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        AppState::new(conn)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_busy_database_does_not_stall_runtime() {
        let state = test_state();
        let app = router(state.clone(), 1024);

        // Hold the connection the way a long import does
        let (locked_tx, locked_rx) = mpsc::channel();
        let db = Arc::clone(&state.db);
        let holder = thread::spawn(move || {
            let _guard = db.lock().unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(500));
        });
        locked_rx.recv().unwrap();

        let started = Instant::now();
        let summary = tokio::spawn(app.clone().oneshot(get("/api/stores/summary")));
        tokio::task::yield_now().await;

        let health = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_millis(400));

        let summary = summary.await.unwrap().unwrap();
        assert_eq!(summary.status(), StatusCode::OK);
        holder.join().unwrap();
    }
}
