use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::policy::SyncPolicy;

mod common;
mod value;
mod write;


pub use common::{ApiError, NodeValue, ReadAllResponse, ReadResponse, StatusResponse};
pub use write::WriteRequest;

#[derive(Clone)]
pub struct ApiState {
    pub policy: SyncPolicy,
    api_key: Arc<str>,
    api_key_header: HeaderName,
}

impl ApiState {
    pub fn new(policy: SyncPolicy, api_key: &str, api_key_header: &str) -> Result<Self> {
        let api_key_header = HeaderName::try_from(api_key_header)
            .map_err(|e| anyhow!("Invalid API key header {}: {}", api_key_header, e))?;

        Ok(ApiState {
            policy,
            api_key: Arc::from(api_key),
            api_key_header,
        })
    }
}

async fn auth_middleware(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(&state.api_key_header)
        .is_some_and(|key| key.as_bytes().ct_eq(state.api_key.as_bytes()).into());

    if !authorized {
        warn!("Rejected {} {}: bad API key", request.method(), request.uri());
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

fn cors_layer(allowed_origins: &[String], api_key_header: &HeaderName) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            api_key_header.clone(),
        ]);

    //Credentials can't be combined with a wildcard origin
    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

pub fn build_router(state: ApiState, allowed_origins: &[String]) -> Router {
    let cors = cors_layer(allowed_origins, &state.api_key_header);

    let opcua = Router::new()
        .route("/read", get(value::read_all))
        .route("/read/{node_id}", get(value::read_node))
        .route("/write", post(write::write_node))
        .route("/update/{node_id}", put(value::update_node))
        .route("/delete/{node_id}", delete(write::delete_node))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new().nest("/opcua", opcua).layer(cors)
}

/// Serves the API until `shutdown` resolves.
pub async fn serve_api<F>(
    state: ApiState,
    allowed_origins: &[String],
    port: u16,
    shutdown: F,
) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let api = build_router(state, allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API listening on {}", addr);

    axum::serve(listener, api)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
