//! Engine configuration read from the environment

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_DEPTH: u32 = 15;
pub const DEFAULT_MOVE_TIME_MS: u64 = 1000;
pub const DEFAULT_POOL_SIZE: usize = 2;

/// Settings for the engine pool and request defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Engine executable (`STOCKFISH_PATH`)
    pub engine_path: PathBuf,
    /// Depth used when a request names neither depth nor move time
    pub default_depth: u32,
    /// Move time used when a request names neither; `None` falls back to depth
    pub default_move_time_ms: Option<u64>,
    pub pool_size: usize,
    /// Per-search wall clock cap, `None` waits for the engine indefinitely
    pub search_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Config with defaults for everything but the engine path
    pub fn new(engine_path: impl Into<PathBuf>) -> Self {
        EngineConfig {
            engine_path: engine_path.into(),
            default_depth: DEFAULT_DEPTH,
            default_move_time_ms: Some(DEFAULT_MOVE_TIME_MS),
            pool_size: DEFAULT_POOL_SIZE,
            search_timeout: None,
        }
    }

    /// Reads `STOCKFISH_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine_path = lookup("STOCKFISH_PATH")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::Config("STOCKFISH_PATH is not set".into()))?;

        let mut config = EngineConfig::new(engine_path);

        if let Some(depth) = parse_var(&lookup, "STOCKFISH_DEFAULT_DEPTH")? {
            config.default_depth = depth;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "STOCKFISH_DEFAULT_MOVE_TIME_MS")? {
            // 0 disables the time default
            config.default_move_time_ms = (ms > 0).then_some(ms);
        }
        if let Some(size) = parse_var(&lookup, "STOCKFISH_POOL_SIZE")? {
            if size == 0 {
                return Err(Error::InvalidPoolSize);
            }
            config.pool_size = size;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "STOCKFISH_SEARCH_TIMEOUT_MS")? {
            config.search_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Picks the search budget for a request.
    ///
    /// Explicit values are passed through untouched. With neither given, the
    /// default move time applies if set, otherwise the default depth.
    pub fn request_limits(
        &self,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> (Option<u32>, Option<u64>) {
        match (depth, move_time_ms) {
            (None, None) => match self.default_move_time_ms {
                Some(ms) => (None, Some(ms)),
                None => (Some(self.default_depth), None),
            },
            explicit => explicit,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, raw))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[("STOCKFISH_PATH", "/usr/bin/stockfish")]))
            .unwrap();
        assert_eq!(config, EngineConfig::new("/usr/bin/stockfish"));
        assert_eq!(config.default_depth, 15);
        assert_eq!(config.default_move_time_ms, Some(1000));
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.search_timeout, None);
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let result = EngineConfig::from_lookup(lookup(&[("STOCKFISH_POOL_SIZE", "4")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("STOCKFISH_PATH", "stockfish"),
            ("STOCKFISH_DEFAULT_DEPTH", "20"),
            ("STOCKFISH_DEFAULT_MOVE_TIME_MS", "0"),
            ("STOCKFISH_POOL_SIZE", "8"),
            ("STOCKFISH_SEARCH_TIMEOUT_MS", "30000"),
        ]))
        .unwrap();

        assert_eq!(config.default_depth, 20);
        assert_eq!(config.default_move_time_ms, None);
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.search_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bad_numbers_rejected() {
        let result = EngineConfig::from_lookup(lookup(&[
            ("STOCKFISH_PATH", "stockfish"),
            ("STOCKFISH_DEFAULT_DEPTH", "deep"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = EngineConfig::from_lookup(lookup(&[
            ("STOCKFISH_PATH", "stockfish"),
            ("STOCKFISH_POOL_SIZE", "0"),
        ]));
        assert!(matches!(result, Err(Error::InvalidPoolSize)));
    }

    #[test]
    fn test_request_limits() {
        let mut config = EngineConfig::new("stockfish");
        assert_eq!(config.request_limits(None, None), (None, Some(1000)));
        assert_eq!(config.request_limits(Some(9), None), (Some(9), None));
        assert_eq!(config.request_limits(None, Some(50)), (None, Some(50)));

        config.default_move_time_ms = None;
        assert_eq!(config.request_limits(None, None), (Some(15), None));
    }
}
