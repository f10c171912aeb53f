use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::AppState;

pub mod tools;

#[derive(Deserialize)]
pub struct CallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: tools::Arguments,
}

#[derive(Serialize)]
pub struct CallResponse {
    pub result: Value,
}

/// Error reply of the tool API: `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<stockfish_broker_core::Error> for ApiError {
    fn from(error: stockfish_broker_core::Error) -> Self {
        ApiError::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub async fn list_tools() -> impl IntoResponse {
    Json(tools::tool_list())
}

pub async fn call(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<CallResponse>, ApiError> {
    let Json(request) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    info!(tool = %request.tool, "tool call");

    let result = match request.tool.as_str() {
        "evaluate_position" => tools::evaluate_position(&state, &request.arguments).await,
        "best_move" => tools::best_move(&state, &request.arguments).await,
        "evaluate_move" => tools::evaluate_move(&state, &request.arguments).await,
        other => Err(ApiError::bad_request(format!("Unknown tool: {}", other))),
    };

    match result {
        Ok(result) => Ok(Json(CallResponse { result })),
        Err(e) => {
            warn!(tool = %request.tool, error = %e.message, "tool call failed");
            Err(e)
        }
    }
}

pub async fn health() -> &'static str {
    "OK"
}
