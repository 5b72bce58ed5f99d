use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::common::{self, ApiError, NodeValue, ReadAllResponse, ReadResponse};
use crate::api::ApiState;
use crate::common::model::NodeIdentifier;

pub async fn read_all(State(state): State<ApiState>) -> Result<Json<ReadAllResponse>, ApiError> {
    let readings = common::run_blocking(&state.policy, |policy| policy.list_all()).await?;

    Ok(Json(ReadAllResponse {
        nodes: readings.into_iter().map(NodeValue::from).collect(),
        status: common::SUCCESS.to_string(),
        message: "All node values retrieved successfully".to_string(),
        error: None,
    }))
}

pub async fn read_node(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<ReadResponse>, ApiError> {
    let node_id = NodeIdentifier::normalize(&node_id).map_err(ApiError::Validation)?;

    let reading =
        common::run_blocking(&state.policy, move |policy| policy.fetch_current(&node_id)).await?;

    Ok(Json(ReadResponse::from_reading(
        &reading,
        "Node value retrieved successfully",
    )))
}

pub async fn update_node(
    State(state): State<ApiState>,
    Path(node_id): Path<String>,
) -> Result<Json<ReadResponse>, ApiError> {
    let node_id = NodeIdentifier::normalize(&node_id).map_err(ApiError::Validation)?;

    let reading = common::run_blocking(&state.policy, move |policy| policy.refresh(&node_id))
        .await
        .map_err(|err| err.with_read_message("Error reading from OPC UA server"))?;

    Ok(Json(ReadResponse::from_reading(
        &reading,
        "Node updated successfully",
    )))
}
