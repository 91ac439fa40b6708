use std::{net::SocketAddr, sync::Arc};

use auth::TokenConfig;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use server_api::{
    admin_login, admin_logout, authorize_admin, dashboard, event_details, export_csv, list_gifts,
    post_wish, reserve_gift, submit_rsvp, ApiContext,
};
use shared::{
    domain::GiftId,
    error::{ApiError, ErrorCode},
    protocol::{
        AdminLoginRequest, AdminLoginResponse, DashboardResponse, EventDetails, ExportKind,
        GiftListResponse, ReserveGiftResponse, RsvpRequest, RsvpResponse, WishRequest,
        WishResponse,
    },
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url, Settings};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    if settings.uses_default_secret() {
        warn!("APP__TOKEN_SECRET is not set; tokens are signed with the development secret");
    }

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    bootstrap_admin(&storage, &settings).await?;

    let addr: SocketAddr = settings.server_bind.parse()?;
    let api = api_context(storage, settings);
    let app = build_router(Arc::new(AppState { api }));

    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn api_context(storage: Storage, settings: Settings) -> ApiContext {
    ApiContext {
        storage,
        tokens: TokenConfig {
            issuer: settings.token_issuer,
            secret: settings.token_secret,
            guest_ttl_seconds: settings.guest_token_ttl_seconds,
            admin_ttl_seconds: settings.admin_token_ttl_seconds,
        },
        admin_email: settings.admin_email,
        event: settings.event,
    }
}

/// Stores the configured admin password so sign-in can verify against it.
async fn bootstrap_admin(storage: &Storage, settings: &Settings) -> anyhow::Result<()> {
    match &settings.admin_password {
        Some(password) => {
            let hash = auth::hash_password(password)?;
            storage
                .upsert_admin_credential(&settings.admin_email, &hash)
                .await?;
            info!(email = %settings.admin_email, "admin credential updated");
        }
        None => {
            if storage
                .admin_password_hash(&settings.admin_email)
                .await?
                .is_none()
            {
                warn!(
                    email = %settings.admin_email,
                    "no admin credential stored; set APP__ADMIN_PASSWORD or run `tools set-admin`"
                );
            }
        }
    }
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/event", get(http_event))
        .route("/api/rsvp", post(http_rsvp))
        .route("/api/gifts", get(http_list_gifts))
        .route("/api/gifts/:gift_id/reserve", post(http_reserve_gift))
        .route("/api/wishes", post(http_post_wish))
        .route("/api/admin/login", post(http_admin_login))
        .route("/api/admin/logout", post(http_admin_logout))
        .route("/api/admin/dashboard", get(http_dashboard))
        .route("/api/admin/export/:kind", get(http_export))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> HttpError {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "request failed");
    }
    (status_for(err.code), Json(err))
}

/// Keeps the extractor's status (400, 413, 415, 422) but answers in the API's error shape.
fn bad_body(rejection: JsonRejection) -> HttpError {
    (
        rejection.status(),
        Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
    )
}

fn bad_path(rejection: PathRejection) -> HttpError {
    (
        rejection.status(),
        Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
    )
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| reject(ApiError::new(ErrorCode::Internal, e.to_string())))?;
    Ok("ok")
}

async fn not_found() -> HttpError {
    reject(ApiError::new(ErrorCode::NotFound, "page not found"))
}

async fn http_event(State(state): State<Arc<AppState>>) -> Json<EventDetails> {
    Json(event_details(&state.api))
}

async fn http_rsvp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RsvpRequest>, JsonRejection>,
) -> Result<Json<RsvpResponse>, HttpError> {
    let Json(req) = payload.map_err(bad_body)?;
    submit_rsvp(&state.api, &req).await.map(Json).map_err(reject)
}

async fn http_list_gifts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GiftListResponse>, HttpError> {
    list_gifts(&state.api).await.map(Json).map_err(reject)
}

async fn http_reserve_gift(
    State(state): State<Arc<AppState>>,
    gift_id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<ReserveGiftResponse>, HttpError> {
    let Path(gift_id) = gift_id.map_err(bad_path)?;
    reserve_gift(&state.api, bearer(&headers), GiftId(gift_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_post_wish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<WishRequest>, JsonRejection>,
) -> Result<Json<WishResponse>, HttpError> {
    let Json(req) = payload.map_err(bad_body)?;
    post_wish(&state.api, bearer(&headers), &req)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_admin_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AdminLoginResponse>, HttpError> {
    let Json(req) = payload.map_err(bad_body)?;
    admin_login(&state.api, &req).await.map(Json).map_err(reject)
}

async fn http_admin_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, HttpError> {
    admin_logout(&state.api, bearer(&headers))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, HttpError> {
    let claims = authorize_admin(&state.api, bearer(&headers))
        .await
        .map_err(reject)?;
    dashboard(&state.api, &claims).await.map(Json).map_err(reject)
}

async fn http_export(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let claims = authorize_admin(&state.api, bearer(&headers))
        .await
        .map_err(reject)?;
    let kind = ExportKind::from_route_segment(&kind)
        .ok_or_else(|| reject(ApiError::new(ErrorCode::NotFound, "unknown export")))?;
    let csv = export_csv(&state.api, &claims, kind).await.map_err(reject)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", kind.filename()))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, csv))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
