//! Scripted in-memory UCI engine for tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};

use super::stockfish::EngineClient;
use crate::error::Result;

/// How the fake engine answers one `go`
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchReply {
    info: Vec<String>,
    /// `None` closes the stream instead of finishing
    best_move: Option<String>,
    delay: Duration,
    /// Keep searching until `stop` arrives
    until_stop: bool,
}

impl SearchReply {
    pub(crate) fn finish(info: &[&str], best_move: &str) -> Self {
        SearchReply {
            info: info.iter().map(|s| s.to_string()).collect(),
            best_move: Some(best_move.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn hang_up(info: &[&str]) -> Self {
        SearchReply {
            info: info.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn until_stop() -> Self {
        SearchReply {
            info: vec!["info depth 1 score cp 0 pv e2e4".to_string()],
            best_move: Some("e2e4".to_string()),
            until_stop: true,
            ..Default::default()
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Everything the fake engine received (`> cmd`) and sent (`< line`)
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Commands received, in order
    pub(crate) fn commands(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("> ").map(str::to_string))
            .collect()
    }

    /// Every `go` after the first is preceded by the previous search's
    /// `bestmove`, and no command of the next search arrives in between.
    pub(crate) fn assert_searches_do_not_overlap(&self) {
        let mut searching = false;
        for entry in self.entries() {
            if entry.starts_with("> go") {
                assert!(!searching, "go sent while a search was running");
                searching = true;
            } else if entry.starts_with("< bestmove") {
                searching = false;
            } else if entry.starts_with("> ") && entry != "> stop" {
                assert!(!searching, "{} sent while a search was running", entry);
            }
        }
    }
}

pub(crate) struct FakeEngine {
    replies: VecDeque<SearchReply>,
    handshake: bool,
}

impl FakeEngine {
    /// Replies are used in order; the last one repeats
    pub(crate) fn new(replies: Vec<SearchReply>) -> Self {
        FakeEngine {
            replies: replies.into(),
            handshake: true,
        }
    }

    /// An engine that closes its output right after `uci`
    pub(crate) fn refusing_handshake() -> Self {
        FakeEngine {
            replies: VecDeque::new(),
            handshake: false,
        }
    }

    /// Starts the fake and connects a client to it
    pub(crate) async fn connect(self) -> Result<(EngineClient, Transcript)> {
        let (client_side, engine_side) = tokio::io::duplex(64 * 1024);
        let transcript = Transcript::default();
        tokio::spawn(self.serve(engine_side, transcript.clone()));

        let (reader, writer) = tokio::io::split(client_side);
        let client = EngineClient::from_streams(reader, writer).await?;
        Ok((client, transcript))
    }

    async fn serve(mut self, stream: DuplexStream, transcript: Transcript) {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        let mut stoppable: Option<String> = None;

        while let Ok(Some(cmd)) = lines.next_line().await {
            transcript.push(format!("> {}", cmd));

            match cmd.split_whitespace().next() {
                Some("uci") if !self.handshake => break,
                Some("uci") => {
                    reply(&mut writer, &transcript, &["id name FakeFish", "uciok"]).await;
                }
                Some("isready") => reply(&mut writer, &transcript, &["readyok"]).await,
                Some("go") => {
                    let script = if self.replies.len() > 1 {
                        self.replies.pop_front().unwrap_or_default()
                    } else {
                        self.replies.front().cloned().unwrap_or_default()
                    };

                    tokio::time::sleep(script.delay).await;
                    let info: Vec<&str> = script.info.iter().map(String::as_str).collect();
                    reply(&mut writer, &transcript, &info).await;

                    match script.best_move {
                        Some(mv) if script.until_stop => stoppable = Some(mv),
                        Some(mv) => {
                            let line = format!("bestmove {}", mv);
                            reply(&mut writer, &transcript, &[line.as_str()]).await;
                        }
                        None => break,
                    }
                }
                Some("stop") => {
                    if let Some(mv) = stoppable.take() {
                        let line = format!("bestmove {}", mv);
                        reply(&mut writer, &transcript, &[line.as_str()]).await;
                    }
                }
                Some("quit") => break,
                _ => {}
            }
        }

        let _ = writer.shutdown().await;
    }
}

async fn reply(writer: &mut WriteHalf<DuplexStream>, transcript: &Transcript, lines: &[&str]) {
    for line in lines {
        transcript.push(format!("< {}", line));
        let _ = writer.write_all(format!("{}\n", line).as_bytes()).await;
    }
    let _ = writer.flush().await;
}
