//! Types for representing engine analysis results

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Result of one engine search
///
/// Scores are reported from the side-to-move's perspective exactly as the
/// engine printed them. `centipawns` and `mate_in` are tracked independently:
/// each holds the last value the engine reported for that kind of score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Centipawn score (positive = side to move is better)
    pub centipawns: Option<i32>,
    /// Moves to forced mate (negative = side to move gets mated)
    pub mate_in: Option<i32>,
    /// Move chosen by the search, `(none)` when the side to move has no
    /// legal move, `None` if the engine never finished
    pub best_move: Option<String>,
}

impl Evaluation {
    /// Returns true if the engine finished the search with a `bestmove` line
    pub fn is_complete(&self) -> bool {
        self.best_move.is_some()
    }

    /// Best move, or an empty string when the search produced none
    pub fn best_move_or_empty(&self) -> String {
        self.best_move.clone().unwrap_or_default()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mate_in, self.centipawns) {
            (Some(moves), _) => write!(f, "M{}", moves)?,
            (None, Some(cp)) => write!(f, "{:+.2}", cp as f32 / 100.0)?,
            (None, None) => write!(f, "?")?,
        }
        match &self.best_move {
            Some(mv) => write!(f, " (best: {})", mv),
            None => write!(f, " (no best move)"),
        }
    }
}

/// How long a single search may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    /// `go depth <plies>`
    Depth(u32),
    /// `go movetime <milliseconds>`
    MoveTime(u64),
}

impl SearchLimit {
    /// Picks the search budget from optional caller parameters.
    ///
    /// A move time wins over a depth. Supplying neither is a caller error.
    pub fn resolve(depth: Option<u32>, move_time_ms: Option<u64>) -> Result<Self> {
        match (move_time_ms, depth) {
            (Some(ms), _) => Ok(SearchLimit::MoveTime(ms)),
            (None, Some(d)) => Ok(SearchLimit::Depth(d)),
            (None, None) => Err(Error::MissingSearchLimit),
        }
    }

    /// The `go` command for this limit
    pub fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(d) => format!("go depth {}", d),
            SearchLimit::MoveTime(ms) => format!("go movetime {}", ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_time_wins_over_depth() {
        let limit = SearchLimit::resolve(Some(12), Some(250)).unwrap();
        assert_eq!(limit, SearchLimit::MoveTime(250));
        assert_eq!(limit.go_command(), "go movetime 250");
    }

    #[test]
    fn test_depth_used_without_move_time() {
        let limit = SearchLimit::resolve(Some(8), None).unwrap();
        assert_eq!(limit.go_command(), "go depth 8");
    }

    #[test]
    fn test_missing_limit_is_rejected() {
        assert!(matches!(
            SearchLimit::resolve(None, None),
            Err(Error::MissingSearchLimit)
        ));
    }

    #[test]
    fn test_display() {
        let eval = Evaluation {
            centipawns: Some(-35),
            mate_in: None,
            best_move: Some("e7e5".to_string()),
        };
        assert_eq!(eval.to_string(), "-0.35 (best: e7e5)");

        let mate = Evaluation {
            centipawns: Some(900),
            mate_in: Some(2),
            best_move: None,
        };
        assert_eq!(mate.to_string(), "M2 (no best move)");
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let eval = Evaluation {
            centipawns: None,
            mate_in: Some(-3),
            best_move: Some("h2h4".to_string()),
        };
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["mateIn"], -3);
        assert_eq!(json["bestMove"], "h2h4");
        assert!(json["centipawns"].is_null());
    }
}
