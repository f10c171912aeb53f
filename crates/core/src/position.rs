//! Syntax checks for positions and moves before they reach an engine
//!
//! Engines are not required to survive malformed input, so FEN strings and
//! UCI moves are parsed here first. Legality is left to the engine.

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;

use crate::engine::START_POSITION;
use crate::error::{Error, Result};

/// Checks that `fen` parses as FEN (or is `"startpos"`)
pub fn validate_fen(fen: &str) -> Result<()> {
    let fen = fen.trim();
    if fen == START_POSITION {
        return Ok(());
    }

    fen.parse::<Fen>()
        .map(|_| ())
        .map_err(|e| Error::InvalidFen(format!("{}: {}", fen, e)))
}

/// Checks that `mv` is a move in UCI notation, e.g. `e2e4` or `e7e8q`
pub fn validate_move(mv: &str) -> Result<()> {
    mv.trim()
        .parse::<UciMove>()
        .map(|_| ())
        .map_err(|e| Error::InvalidMove(format!("{}: {}", mv, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fens() {
        assert!(validate_fen("startpos").is_ok());
        assert!(validate_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").is_ok());
        assert!(validate_fen("8/8/8/8/8/8/8/K6k w - - 0 1").is_ok());
    }

    #[test]
    fn test_invalid_fens() {
        assert!(matches!(validate_fen("not a fen"), Err(Error::InvalidFen(_))));
        assert!(matches!(
            validate_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(Error::InvalidFen(_))
        ));
    }

    #[test]
    fn test_moves() {
        assert!(validate_move("e2e4").is_ok());
        assert!(validate_move("e7e8q").is_ok());
        assert!(matches!(validate_move("Nf3"), Err(Error::InvalidMove(_))));
        assert!(matches!(validate_move(""), Err(Error::InvalidMove(_))));
    }
}
