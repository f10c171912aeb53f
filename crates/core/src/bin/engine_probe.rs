//! Quick check of an engine installation through the pool

use stockfish_broker_core::engine::START_POSITION;
use stockfish_broker_core::position::validate_fen;
use stockfish_broker_core::{EngineConfig, EnginePool};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let fen = args.next().unwrap_or_else(|| START_POSITION.to_string());
    let depth: Option<u32> = match args.next().map(|d| d.parse()) {
        Some(Ok(depth)) => Some(depth),
        Some(Err(_)) => {
            eprintln!("Usage: engine_probe [\"<fen>\"] [depth]");
            std::process::exit(1);
        }
        None => None,
    };

    if let Err(e) = validate_fen(&fen) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        eprintln!("{} (set STOCKFISH_PATH to the engine binary)", e);
        std::process::exit(1);
    });

    println!("Starting {} engine(s) from {}", config.pool_size, config.engine_path.display());

    let pool = match EnginePool::with_config(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Failed to start engines: {}", e);
            std::process::exit(1);
        }
    };

    let (depth, move_time_ms) = config.request_limits(depth, None);
    let failed = match pool.evaluate_position(&fen, depth, move_time_ms).await {
        Ok(eval) => {
            println!("Position:   {}", fen);
            println!("Evaluation: {}", eval);
            if let Some(cp) = eval.centipawns {
                println!("Centipawns: {}", cp);
            }
            if let Some(mate) = eval.mate_in {
                println!("Mate in:    {}", mate);
            }
            false
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            true
        }
    };

    pool.shutdown().await;
    if failed {
        std::process::exit(1);
    }
}
