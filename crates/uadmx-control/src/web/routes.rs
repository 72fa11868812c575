//! Route definitions
//!
//! `/` and `/variable/:id` form the bridge protocol; `/api` carries
//! status and test patterns.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    ApiResponse, PatternResponse, ReadResponse, StatusResponse, UniverseResponse, WriteRequest,
};
use super::server::AppState;
use crate::bridge::BridgeError;
use crate::dmx::PatternKind;

/// Build the router
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_nodeset))
        .route("/variable/", get(missing_id).put(missing_id))
        .route("/variable/:id", get(read_variable).put(write_variable))
        .route("/variable/:id/", get(read_variable).put(write_variable))
        .route("/api/status", get(get_status))
        .route("/api/universes/:universe", get(get_universe))
        .route("/api/patterns", delete(stop_pattern))
        .route("/api/patterns/:kind", post(start_pattern))
}

/// GET / - The nodeset the mapping was built from
async fn get_nodeset(State(state): State<AppState>) -> Response {
    let path = match state.nodeset_files.as_slice() {
        [path] => path,
        [] => return (StatusCode::NOT_FOUND, "No xml file found").into_response(),
        _ => return (StatusCode::BAD_REQUEST, "Multiple xml files found").into_response(),
    };

    match tokio::fs::read_to_string(path).await {
        Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => {
            tracing::error!("Cannot read {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Cannot read nodeset").into_response()
        }
    }
}

async fn missing_id() -> Response {
    (StatusCode::BAD_REQUEST, "Missing required parameters: id").into_response()
}

fn bridge_error(error: BridgeError) -> Response {
    match error {
        BridgeError::NotFound(_) => (StatusCode::NOT_FOUND, "UA Node not found").into_response(),
        BridgeError::InvalidValue(_) => (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
    }
}

/// GET /variable/:id - Current value of a variable
async fn read_variable(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let node_id = state.node_id(&id);
    match state.bridge.read(node_id.as_str()) {
        Ok(value) => Json(ReadResponse { value }).into_response(),
        Err(e) => bridge_error(e),
    }
}

/// PUT /variable/:id - Write a variable
async fn write_variable(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<WriteRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected write to {}: {}", id, rejection.body_text());
            return (StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };
    let Some(value) = request.value() else {
        return (StatusCode::BAD_REQUEST, "Missing required body: value").into_response();
    };

    let node_id = state.node_id(&id);
    match state.bridge.write(node_id.as_str(), value) {
        Ok(address) => format!("{} = {}", address, value).into_response(),
        Err(e) => bridge_error(e),
    }
}

/// GET /api/status - Bridge status
async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let bridge = &state.bridge;
    let status = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        mapped_nodes: bridge.mapping().len(),
        universes: bridge.mapping().universes(),
        outputs: bridge.store().universes(),
        pattern: state.patterns.active(),
    };

    Json(ApiResponse::success(status))
}

/// GET /api/universes/:universe - Committed channel values
async fn get_universe(
    Path(universe): Path<u16>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UniverseResponse>>, StatusCode> {
    let channels = state
        .bridge
        .store()
        .snapshot(universe)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ApiResponse::success(UniverseResponse {
        universe,
        channels,
    })))
}

/// POST /api/patterns/:kind - Start a test pattern
async fn start_pattern(
    Path(kind): Path<String>,
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<PatternResponse>>) {
    let kind: PatternKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    };

    match state.patterns.start(kind).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(PatternResponse {
                pattern: kind,
                running: kind.is_periodic(),
            })),
        ),
        Err(e) => {
            tracing::warn!("Cannot start {} pattern: {}", kind, e);
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}

/// DELETE /api/patterns - Stop the running pattern
async fn stop_pattern(State(state): State<AppState>) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::success(state.patterns.stop().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{AuditLog, Bridge};
    use crate::dmx::{MemorySender, PatternConfig, PatternRunner, UniverseChannelStore};
    use std::sync::Arc;
    use uadmx_core::{ChannelMapping, DmxAddress, NodeId};

    fn state() -> AppState {
        let mapping: ChannelMapping = [(NodeId::from("ns=1;i=2021"), DmxAddress::new(0, 1))]
            .into_iter()
            .collect();
        let mut store = UniverseChannelStore::new();
        store.register(0, Box::new(MemorySender::new(0))).unwrap();
        let store = Arc::new(store);

        let bridge = Bridge::new(Arc::new(mapping), store.clone(), AuditLog::disabled());
        let patterns = PatternRunner::new(store, PatternConfig::default());
        AppState::new(Arc::new(bridge), Arc::new(patterns), Vec::new(), 1)
    }

    #[tokio::test]
    async fn test_get_status() {
        let state = state();
        state.bridge.write("ns=1;i=2021", 9).unwrap();

        let response = get_status(State(state)).await;
        assert!(response.0.success);
        let status = response.0.data.unwrap();
        assert_eq!(status.mapped_nodes, 1);
        assert_eq!(status.universes, vec![0]);
        assert!(status.pattern.is_none());
    }

    #[tokio::test]
    async fn test_get_universe() {
        let state = state();
        state.bridge.write("ns=1;i=2021", 9).unwrap();

        let response = get_universe(Path(0), State(state.clone())).await.unwrap();
        let data = response.0.data.unwrap();
        assert_eq!(data.channels.len(), 512);
        assert_eq!(data.channels[0], 9);

        let missing = get_universe(Path(5), State(state)).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_start_unknown_pattern() {
        let (status, body) = start_pattern(Path("strobe".to_string()), State(state())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.0.success);
    }
}
