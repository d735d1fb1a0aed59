//! Low-level driver for a UCI engine subprocess
//!
//! Owns the child process and its stdio pipes, and speaks the line-based
//! UCI protocol over them: handshake on spawn, `position`/`go` per search,
//! `quit` on shutdown. EOF or a broken pipe is how engine death is seen.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::error::{EngineError, EngineResult};

/// Longest we wait for `uciok`/`readyok` after launching the binary.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period between sending `quit` and killing the process.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A live UCI engine subprocess with piped stdio.
pub struct UciProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl UciProcess {
    /// Launch the engine executable and complete the UCI handshake.
    pub async fn spawn(path: &Path) -> EngineResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Launch {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| EngineError::Protocol {
            message: "engine stdin was not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Protocol {
            message: "engine stdout was not captured".to_string(),
        })?;

        let mut process = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        match timeout(HANDSHAKE_TIMEOUT, process.handshake()).await {
            Ok(Ok(())) => Ok(process),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::Protocol {
                message: "timed out waiting for UCI handshake".to_string(),
            }),
        }
    }

    async fn handshake(&mut self) -> EngineResult<()> {
        self.send("uci").await?;
        self.read_until("uciok").await?;
        self.send("isready").await?;
        self.read_until("readyok").await?;
        Ok(())
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        debug!("uci> {command}");
        self.stdin
            .write_all(command.as_bytes())
            .await
            .map_err(|_| EngineError::Terminated)?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|_| EngineError::Terminated)?;
        self.stdin.flush().await.map_err(|_| EngineError::Terminated)?;
        Ok(())
    }

    /// Read lines until one matches `expected`. EOF means the process died.
    async fn read_until(&mut self, expected: &str) -> EngineResult<()> {
        loop {
            match self.stdout.next_line().await {
                Ok(Some(line)) if line.trim() == expected => return Ok(()),
                Ok(Some(line)) => trace!("uci< {}", line.trim()),
                Ok(None) | Err(_) => return Err(EngineError::Terminated),
            }
        }
    }

    /// Search `fen` to `depth` plies and return the engine's move in UCI
    /// notation (e.g. "e7e5", "e7e8q").
    pub async fn best_move(&mut self, fen: &str, depth: u8) -> EngineResult<String> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        loop {
            let line = match self.stdout.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => return Err(EngineError::Terminated),
            };
            let line = line.trim();

            if let Some(rest) = line.strip_prefix("bestmove") {
                let chosen = rest.split_whitespace().next().ok_or_else(|| {
                    EngineError::Protocol {
                        message: format!("bestmove line carried no move: {line:?}"),
                    }
                })?;
                // "(none)" means the engine saw a terminal position; the
                // caller is expected to have filtered those out already.
                if chosen == "(none)" {
                    return Err(EngineError::Protocol {
                        message: "engine reported no legal move".to_string(),
                    });
                }
                debug!("uci< bestmove {chosen}");
                return Ok(chosen.to_string());
            }
            trace!("uci< {line}");
        }
    }

    /// Ask the engine to exit and reap the child, killing it if it ignores
    /// `quit`. Failures are logged, never propagated.
    pub async fn quit(mut self) {
        let _ = self.send("quit").await;
        let UciProcess {
            mut child,
            stdin,
            stdout: _,
        } = self;
        // Closing stdin unblocks engines that poll it instead of honoring quit.
        drop(stdin);

        match timeout(QUIT_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => debug!("engine exited with {status}"),
            Ok(Err(e)) => debug!("failed to reap engine: {e}"),
            Err(_) => {
                warn!("engine ignored quit, killing it");
                let _ = child.kill().await;
            }
        }
    }
}
