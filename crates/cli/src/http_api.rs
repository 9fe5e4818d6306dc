use crate::telemetry;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use intake_core::{resolve, CatalogCache, CatalogSnapshot};
use intake_protocol::{
    parse_intake_request_bytes, path_filters::is_safe_filename, serialize_json, ErrorBody,
    HEALTH_ROUTE, INTAKE_ROUTE, PACKS_ROUTE_PREFIX,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub(crate) struct HttpState {
    pub(crate) cache: CatalogCache,
    /// Operator-configured base for pack links; derived from request headers when unset
    pub(crate) public_base_url: Option<String>,
}

pub(crate) fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route(INTAKE_ROUTE, post(intake_handler))
        // Wildcard: names containing separators still reach the filename check.
        .route(&format!("{PACKS_ROUTE_PREFIX}/*filename"), get(pack_handler))
        .route(HEALTH_ROUTE, get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub(crate) async fn intake_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_intake_request_bytes(&body) {
        Ok(request) => request,
        Err(err) => {
            log::debug!("Rejected intake request: {err}");
            return error_response(StatusCode::BAD_REQUEST, err.reason());
        }
    };

    let snapshot = match current_snapshot(state.clone()).await {
        Ok(snapshot) => snapshot,
        Err(status) => return error_response(status, "internal_error"),
    };
    let base_url = public_base_url(state.public_base_url.as_deref(), &headers);
    let response = resolve(&request, &snapshot, base_url.as_deref());
    telemetry::record_intake(
        &request,
        &response,
        telemetry::opted_out(&request, &headers),
    );
    build_response(StatusCode::OK, &response)
}

pub(crate) async fn pack_handler(
    State(state): State<Arc<HttpState>>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        log::debug!("Rejected pack filename: {filename:?}");
        return error_response(StatusCode::BAD_REQUEST, "invalid_filename");
    }

    let read = {
        let filename = filename.clone();
        tokio::task::spawn_blocking(move || state.cache.store().read_pack(&filename)).await
    };
    match read {
        Ok(Ok(bytes)) => json_response(StatusCode::OK, bytes),
        Ok(Err(err)) => {
            log::debug!("Pack {filename} unavailable: {err}");
            error_response(StatusCode::NOT_FOUND, "not_found")
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

#[derive(Serialize)]
struct HealthBody {
    ok: bool,
    ts: u64,
}

pub(crate) async fn health_handler() -> Response {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    build_response(StatusCode::OK, &HealthBody { ok: true, ts })
}

pub(crate) async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found")
}

async fn current_snapshot(state: Arc<HttpState>) -> Result<Arc<CatalogSnapshot>, StatusCode> {
    // Refresh reads the store from disk.
    tokio::task::spawn_blocking(move || state.cache.get_or_refresh(Instant::now()))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Base URL for pack links: the configured value, else the forwarded or direct host headers.
pub(crate) fn public_base_url(configured: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(base) = configured
        .map(|base| base.trim().trim_end_matches('/'))
        .filter(|base| !base.is_empty())
    {
        return Some(base.to_string());
    }

    let host = header_first(headers, "x-forwarded-host").or_else(|| header_first(headers, "host"))?;
    let proto = header_first(headers, "x-forwarded-proto").unwrap_or("http");
    Some(format!("{proto}://{host}"))
}

fn header_first<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn error_response(status: StatusCode, reason: &str) -> Response {
    build_response(status, &ErrorBody::new(reason))
}

pub(crate) fn build_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serialize_json(body) {
        Ok(json) => json_response(status, json.into_bytes()),
        Err(err) => {
            log::error!("Failed to serialize response: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], bytes).into_response()
}
