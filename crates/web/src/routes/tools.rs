use serde::Serialize;
use serde_json::{json, Map, Value};

use stockfish_broker_core::config::DEFAULT_DEPTH;
use stockfish_broker_core::position::{validate_fen, validate_move};
use stockfish_broker_core::Evaluation;

use super::ApiError;
use crate::AppState;

pub type Arguments = Map<String, Value>;

// ============================================================================
// TOOL METADATA
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_list() -> Vec<Tool> {
    vec![
        Tool {
            name: "evaluate_position",
            description: "Evaluate a chess position using Stockfish",
            input_schema: schema(&["fen"]),
        },
        Tool {
            name: "best_move",
            description: "Find the best move in a given position using Stockfish",
            input_schema: schema(&["fen"]),
        },
        Tool {
            name: "evaluate_move",
            description: "Evaluate a specific move in a given position",
            input_schema: schema(&["fen", "move"]),
        },
    ]
}

fn schema(required: &[&str]) -> Value {
    let mut properties = json!({
        "fen": { "type": "string" },
        "depth": { "type": "integer", "default": DEFAULT_DEPTH },
        "moveTimeMs": { "type": "integer" },
    });
    if required.contains(&"move") {
        properties["move"] = json!({ "type": "string" });
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ============================================================================
// ARGUMENTS
// ============================================================================

pub fn require_string(args: &Arguments, key: &str) -> Result<String, ApiError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        _ => Err(ApiError::bad_request(format!(
            "Missing or invalid argument: {}",
            key
        ))),
    }
}

/// Non-negative integer argument; anything else counts as absent
pub fn optional_int(args: &Arguments, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

/// Depth and move time for a request, with the configured defaults
fn search_limits(state: &AppState, args: &Arguments) -> (Option<u32>, Option<u64>) {
    let depth = optional_int(args, "depth").and_then(|d| u32::try_from(d).ok());
    let move_time_ms = optional_int(args, "moveTimeMs");
    state.config.request_limits(depth, move_time_ms)
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub centipawns: Option<i32>,
    pub mate_in: Option<i32>,
}

impl From<&Evaluation> for Score {
    fn from(eval: &Evaluation) -> Self {
        Score {
            centipawns: eval.centipawns,
            mate_in: eval.mate_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResult {
    pub fen: String,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<String>,
    pub depth: Option<u32>,
    pub move_time_ms: Option<u64>,
    pub evaluation: Score,
    pub best_move: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMoveResult {
    pub fen: String,
    pub depth: Option<u32>,
    pub move_time_ms: Option<u64>,
    pub best_move: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn evaluate_position(state: &AppState, args: &Arguments) -> Result<Value, ApiError> {
    let fen = require_string(args, "fen")?;
    validate_fen(&fen)?;
    let (depth, move_time_ms) = search_limits(state, args);

    let eval = state
        .pool
        .evaluate_position(&fen, depth, move_time_ms)
        .await?;

    to_value(PositionResult {
        fen,
        mv: None,
        depth,
        move_time_ms,
        evaluation: Score::from(&eval),
        best_move: eval.best_move,
    })
}

pub async fn best_move(state: &AppState, args: &Arguments) -> Result<Value, ApiError> {
    let fen = require_string(args, "fen")?;
    validate_fen(&fen)?;
    let (depth, move_time_ms) = search_limits(state, args);

    let best_move = state.pool.best_move(&fen, depth, move_time_ms).await?;

    to_value(BestMoveResult {
        fen,
        depth,
        move_time_ms,
        best_move,
    })
}

pub async fn evaluate_move(state: &AppState, args: &Arguments) -> Result<Value, ApiError> {
    let fen = require_string(args, "fen")?;
    let mv = require_string(args, "move")?;
    validate_fen(&fen)?;
    validate_move(&mv)?;
    let (depth, move_time_ms) = search_limits(state, args);

    let eval = state
        .pool
        .evaluate_move(&fen, &mv, depth, move_time_ms)
        .await?;

    to_value(PositionResult {
        fen,
        mv: Some(mv),
        depth,
        move_time_ms,
        evaluation: Score::from(&eval),
        best_move: eval.best_move,
    })
}

fn to_value<T: Serialize>(result: T) -> Result<Value, ApiError> {
    serde_json::to_value(result).map_err(|e| ApiError::internal(e.to_string()))
}
