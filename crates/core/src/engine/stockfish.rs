//! Stockfish chess engine interface
//!
//! Spawns Stockfish (or any UCI engine) as a subprocess and communicates via
//! the UCI protocol. One client drives exactly one engine; concurrent calls on
//! the same client are serialized.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::analysis::{Evaluation, SearchLimit};
use crate::error::{Error, Result};

/// How long `quit` waits for the engine to exit on its own before killing it
const QUIT_GRACE: Duration = Duration::from_millis(100);

/// FEN placeholder that maps to `position startpos`
pub const START_POSITION: &str = "startpos";

type EngineReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type EngineWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the conversation with the engine stands between commands.
///
/// Anything other than `Ready` at the start of an operation means a previous
/// caller was cancelled or timed out mid-search, and the engine must be
/// brought back to a known idle state first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Ready,
    /// Setup commands are being written, `go` not yet started
    Pending,
    /// `go` is being written; a search may or may not be running
    Starting,
    /// `go` sent, `bestmove` not yet read
    Searching,
    /// Engine output stream ended
    Closed,
}

struct Session {
    reader: EngineReader,
    writer: EngineWriter,
    /// Bytes of a line not yet terminated; survives a cancelled read
    line_buf: Vec<u8>,
    state: SessionState,
}

impl Session {
    fn new(reader: EngineReader, writer: EngineWriter) -> Self {
        Session {
            reader,
            writer,
            line_buf: Vec::new(),
            state: SessionState::Ready,
        }
    }

    /// Sends a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<()> {
        debug!(command = cmd, "-> engine");
        self.writer.write_all(cmd.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one line from the engine, `None` once the stream has ended
    async fn next_line(&mut self) -> Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.line_buf).await?;
        if read == 0 && self.line_buf.is_empty() {
            self.state = SessionState::Closed;
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.line_buf).trim().to_string();
        self.line_buf.clear();
        trace!(line = %line, "<- engine");
        Ok(Some(line))
    }

    /// Reads lines until one contains `token`. Returns false if the stream
    /// ended first.
    async fn wait_for(&mut self, token: &str) -> Result<bool> {
        while let Some(line) = self.next_line().await? {
            if line.contains(token) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// UCI handshake: `uci` → `uciok`, `isready` → `readyok`
    async fn handshake(&mut self) -> Result<()> {
        self.send("uci").await?;
        if !self.wait_for("uciok").await? {
            return Err(Error::Handshake("stream closed before uciok".into()));
        }

        self.send("isready").await?;
        if !self.wait_for("readyok").await? {
            return Err(Error::Handshake("stream closed before readyok".into()));
        }

        Ok(())
    }

    /// Brings the engine back to an idle, drained state after an interrupted
    /// operation.
    async fn restore(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Closed => return Err(Error::EngineExited),
            SessionState::Searching => {
                warn!("engine still searching for an abandoned request, stopping it");
                self.send("stop").await?;
                loop {
                    match self.next_line().await? {
                        Some(line) if line.starts_with("bestmove") => break,
                        Some(_) => continue,
                        None => return Err(Error::EngineExited),
                    }
                }
            }
            SessionState::Pending => {
                warn!("previous request was interrupted while sending commands");
                // terminate any half-written command line
                self.send("").await?;
            }
            SessionState::Starting => {
                warn!("previous request was interrupted while starting a search");
                self.send("").await?;
                self.send("stop").await?;
                // ucinewgame waits for a running search to print its bestmove
                self.send("ucinewgame").await?;
            }
        }

        self.send("isready").await?;
        if !self.wait_for("readyok").await? {
            return Err(Error::EngineExited);
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Reads engine output until `bestmove` or end of stream.
    ///
    /// A stream that ends early yields whatever was parsed so far with no
    /// best move.
    async fn read_evaluation(&mut self) -> Result<Evaluation> {
        let mut evaluation = Evaluation::default();

        while let Some(line) = self.next_line().await? {
            if line.starts_with("info") {
                parse_info_line(&line, &mut evaluation);
            } else if line.starts_with("bestmove") {
                evaluation.best_move = parse_best_move(&line);
                self.state = SessionState::Ready;
                return Ok(evaluation);
            }
        }

        warn!(?evaluation, "engine output ended before bestmove");
        Ok(evaluation)
    }
}

/// Builds the `position` command for a FEN and optional moves to apply
pub fn position_command(fen: &str, moves: &[&str]) -> String {
    let pos_str = if fen.trim() == START_POSITION {
        "position startpos".to_string()
    } else {
        format!("position fen {}", fen.trim())
    };

    if moves.is_empty() {
        pos_str
    } else {
        format!("{} moves {}", pos_str, moves.join(" "))
    }
}

/// Parses an info line, overwriting the centipawn or mate score it reports.
///
/// The two scores are independent: a mate score does not clear an earlier
/// centipawn score and vice versa.
pub fn parse_info_line(line: &str, evaluation: &mut Evaluation) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "score" => {
                if i + 2 < parts.len() {
                    match parts[i + 1] {
                        "cp" => {
                            if let Ok(cp) = parts[i + 2].parse::<i32>() {
                                evaluation.centipawns = Some(cp);
                            }
                        }
                        "mate" => {
                            if let Ok(m) = parts[i + 2].parse::<i32>() {
                                evaluation.mate_in = Some(m);
                            }
                        }
                        _ => {}
                    }
                }
                i += 3;
            }
            // Everything after these is moves or free text
            "pv" | "string" => break,
            _ => i += 1,
        }
    }
}

/// Parses `bestmove e2e4 ponder e7e5`.
///
/// The token is kept as is: a side with no legal move gets `(none)`.
pub fn parse_best_move(line: &str) -> Option<String> {
    line.split_whitespace().nth(1).map(str::to_string)
}

/// Client for one UCI engine process
pub struct EngineClient {
    /// The child process, absent for stream-backed clients
    child: Option<Child>,
    session: Mutex<Session>,
    search_timeout: Option<Duration>,
}

impl EngineClient {
    /// Spawns the engine and completes the UCI handshake
    ///
    /// # Arguments
    /// * `path` - Path to the engine binary (or "stockfish" if in PATH)
    ///
    /// # Example
    /// ```ignore
    /// let engine = EngineClient::spawn("stockfish").await?;
    /// ```
    pub async fn spawn(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let spawn_error = |source| Error::Spawn {
            path: path.to_path_buf(),
            source,
        };

        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            spawn_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to open stdin",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            spawn_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to open stdout",
            ))
        })?;

        // On handshake failure `child` is dropped here and killed
        let client = Self::connect(Some(child), stdout, stdin).await?;
        info!(path = %path.display(), pid = ?client.pid(), "engine started");
        Ok(client)
    }

    /// Runs the UCI handshake over arbitrary streams instead of a process
    pub async fn from_streams<R, W>(reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect(None, reader, writer).await
    }

    async fn connect<R, W>(child: Option<Child>, reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let mut session = Session::new(BufReader::new(reader), Box::new(writer));
        session.handshake().await?;

        Ok(EngineClient {
            child,
            session: Mutex::new(session),
            search_timeout: None,
        })
    }

    /// Caps the wall-clock time of every search. `None` waits indefinitely.
    pub fn with_search_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// OS process id, if this client owns a running process
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Evaluates a position
    ///
    /// # Arguments
    /// * `fen` - FEN string, or `"startpos"`
    /// * `depth` - Search depth, used when no move time is given
    /// * `move_time_ms` - Search time, takes precedence over `depth`
    pub async fn evaluate_position(
        &self,
        fen: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<Evaluation> {
        let limit = SearchLimit::resolve(depth, move_time_ms)?;
        self.search(&position_command(fen, &[]), limit).await
    }

    /// Depth-only evaluation
    pub async fn evaluate_position_at_depth(&self, fen: &str, depth: u32) -> Result<Evaluation> {
        self.search(&position_command(fen, &[]), SearchLimit::Depth(depth))
            .await
    }

    /// Evaluates the position reached after playing `mv` from `fen`.
    ///
    /// Scores are from the perspective of the side to move after `mv`, as
    /// the engine reports them.
    pub async fn evaluate_move(
        &self,
        fen: &str,
        mv: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<Evaluation> {
        let limit = SearchLimit::resolve(depth, move_time_ms)?;
        self.search(&position_command(fen, &[mv]), limit).await
    }

    /// Best move for a position, empty if the engine produced none
    pub async fn best_move(
        &self,
        fen: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<String> {
        let evaluation = self.evaluate_position(fen, depth, move_time_ms).await?;
        Ok(evaluation.best_move_or_empty())
    }

    /// Runs one search: `ucinewgame`, the position command, then `go`.
    ///
    /// Holds the session lock until the engine's `bestmove` has been read, so
    /// no other command reaches this engine in between.
    pub async fn search(&self, position: &str, limit: SearchLimit) -> Result<Evaluation> {
        let mut session = self.session.lock().await;
        session.restore().await?;

        session.state = SessionState::Pending;
        session.send("ucinewgame").await?;
        session.send(position).await?;
        session.state = SessionState::Starting;
        session.send(&limit.go_command()).await?;
        session.state = SessionState::Searching;

        let evaluation = match self.search_timeout {
            Some(cap) => tokio::time::timeout(cap, session.read_evaluation())
                .await
                .map_err(|_| Error::SearchTimeout(cap))??,
            None => session.read_evaluation().await?,
        };

        debug!(%evaluation, "search finished");
        Ok(evaluation)
    }

    /// Quits the engine cleanly. Never fails: errors are only logged.
    pub async fn quit(mut self) {
        if let Err(e) = self.session.get_mut().send("quit").await {
            debug!(error = %e, "quit command not delivered");
        }

        if let Some(mut child) = self.child.take() {
            // Give it a moment to exit
            if tokio::time::timeout(QUIT_GRACE, child.wait()).await.is_err() {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "failed to kill engine");
                }
            }
        }
    }
}
