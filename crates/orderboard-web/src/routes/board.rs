//! Order board route handlers.
//!
//! The order service calls these as orders move through their lifecycle.
//! Every mutation republishes the board to connected displays.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use orderboard_core::{BoardCode, OrderBoardState, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedCode {
    pub code: BoardCode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeTransition {
    pub code: BoardCode,
    /// `false` when the code was not in the expected state and nothing changed.
    pub changed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Published {
    pub receivers: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

fn parse_code(raw: &str) -> Result<BoardCode, (StatusCode, String)> {
    raw.parse()
        .map_err(|e: orderboard_core::BoardError| (StatusCode::BAD_REQUEST, e.to_string()))
}

pub async fn get_board(State(state): State<AppState>) -> Json<OrderBoardState> {
    Json(state.registry().snapshot())
}

pub async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<Published>, (StatusCode, String)> {
    let receivers = state
        .broadcaster
        .publish_current_state()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(Published { receivers }))
}

pub async fn create_code(State(state): State<AppState>) -> (StatusCode, Json<CreatedCode>) {
    let code = state.broadcaster.order_created();
    info!(code = %code, "Order accepted onto the board");
    (StatusCode::CREATED, Json(CreatedCode { code }))
}

pub async fn mark_ready(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CodeTransition>, (StatusCode, String)> {
    let code = parse_code(&code)?;
    let changed = state.broadcaster.order_ready(code);
    Ok(Json(CodeTransition { code, changed }))
}

pub async fn mark_live(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CodeTransition>, (StatusCode, String)> {
    let code = parse_code(&code)?;
    let changed = state.broadcaster.order_reopened(code);
    Ok(Json(CodeTransition { code, changed }))
}

pub async fn release_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CodeTransition>, (StatusCode, String)> {
    let code = parse_code(&code)?;
    let changed = state.broadcaster.order_closed(code);
    Ok(Json(CodeTransition { code, changed }))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<CodeTransition>, (StatusCode, String)> {
    let code = parse_code(&code)?;
    let changed = state.broadcaster.apply_status(code, req.status);
    info!(code = %code, status = %req.status, changed, "Order status applied to board");
    Ok(Json(CodeTransition { code, changed }))
}
