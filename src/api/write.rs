use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{self, ApiError, StatusResponse};
use crate::api::ApiState;
use crate::common::model::NodeIdentifier;

/// Body of `POST /opcua/write`. Only integer node ids are accepted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteRequest {
    pub node_id: u32,
    pub value: f64,
}

pub async fn write_node(
    State(state): State<ApiState>,
    request: Result<Json<WriteRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(request) = request.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    let node_id = NodeIdentifier::Numeric(request.node_id);
    let value = request.value;

    common::run_blocking(&state.policy, move |policy| policy.write(&node_id, value)).await?;

    Ok(Json(StatusResponse::success(
        "Node value written and stored successfully",
    )))
}

pub async fn delete_node(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let node_id = NodeIdentifier::normalize(&node_id).map_err(ApiError::Validation)?;

    common::run_blocking(&state.policy, move |policy| policy.delete(&node_id)).await?;

    Ok(Json(StatusResponse::success("Node deleted successfully")))
}
