use std::sync::Arc;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use shared::protocol::{
    API_PREFIX, PATH_AUTH_STATUS, PATH_HEALTH, PATH_LOGIN, PATH_LOGOUT, PATH_SERVICES,
    PATH_SERVICE_STATUSES,
};
use shared::types::{HealthResponse, HealthSnapshot, ServiceInput, ServiceRecord};
use crate::api::auth;
use crate::api::error::{ApiError, ApiJson};
use crate::password::AdminCredentials;
use crate::probe::{probe_all, HealthProbe};
use crate::session::{CookieSettings, SessionStore};
use crate::store::ServiceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ServiceStore>,
    pub prober: Arc<dyn HealthProbe>,
    pub sessions: Arc<dyn SessionStore>,
    pub admin: Arc<AdminCredentials>,
    pub cookies: CookieSettings,
}

pub fn router(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.clone(), auth::require_session);

    let api = Router::new()
        .route(PATH_HEALTH, get(health))
        .route(PATH_LOGIN, post(auth::login))
        .route(PATH_LOGOUT, post(auth::logout).route_layer(gate.clone()))
        .route(PATH_AUTH_STATUS, get(auth::status))
        .route(
            PATH_SERVICES,
            get(list_services).merge(post(create_service).route_layer(gate.clone())),
        )
        .route(PATH_SERVICE_STATUSES, get(service_statuses))
        .route(
            &format!("{}/:id", PATH_SERVICES),
            put(update_service)
                .merge(delete(delete_service))
                .route_layer(gate),
        );

    Router::new()
        .nest(API_PREFIX, api)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard frontend; credentials require an explicit origin
pub fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url.trim_end_matches('/'))
        .with_context(|| format!("Invalid frontend origin: {}", frontend_url))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]))
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        message: "Backend is running".to_string(),
    })
}

async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<ServiceRecord>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

async fn service_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<HealthSnapshot>>, ApiError> {
    let services = state.store.list().await?;
    let snapshots = probe_all(state.prober.as_ref(), &services).await;

    let up = snapshots.iter().filter(|s| s.is_up()).count();
    tracing::debug!("Probed {} services, {} up", snapshots.len(), up);

    Ok(Json(snapshots))
}

async fn create_service(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<(StatusCode, Json<ServiceRecord>), ApiError> {
    let record = state.store.add(input).await?;
    tracing::info!("Created service {} ({})", record.id, record.name);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<Json<ServiceRecord>, ApiError> {
    let record = state.store.update(&id, input).await?;
    tracing::info!("Updated service {} ({})", record.id, record.name);
    Ok(Json(record))
}

async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(&id).await?;
    tracing::info!("Deleted service {}", id);
    Ok(StatusCode::NO_CONTENT)
}
