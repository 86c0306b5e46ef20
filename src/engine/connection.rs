//! Line-protocol connection to one engine process.
//!
//! The protocol carries no request ids, so a response can only be attributed
//! by order. Commands go out one at a time: the writer gate is held from the
//! write until the response arrives or the command times out. Pending
//! commands sit in a FIFO and the reader task always resolves the head.
//!
//! A timed-out command is removed from the FIFO and counted as an orphan; the
//! reader discards that many responses before resolving the next command, so
//! a late answer is never handed to the wrong caller.
//!
//! Responses are framed the GTP way: a line starting with `=` or `?` opens a
//! response, further non-empty lines extend it, and an empty line ends it.
//! Any other opening line still frames a response; it resolves the head
//! command with [`EngineError::Protocol`] so the queue keeps moving.
//!
//! [`EngineConnection::sync`] re-establishes attribution after a fault: it
//! forgets owed late responses, sends an `echo` marker and discards output
//! until the marker comes back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::EngineError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type Reply = Result<String, EngineError>;

/// A command waiting for its response.
struct PendingCommand {
    id: u64,
    command: String,
    /// Sync marker: the entry only accepts a response echoing this text.
    marker: Option<String>,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<PendingCommand>,
    /// Responses still owed to commands that already timed out.
    orphans: usize,
    closed: bool,
}

/// State shared between callers and the reader task.
#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
}

impl Shared {
    fn enqueue(&self, entry: PendingCommand) -> Result<(), EngineError> {
        let mut queue = self.queue.lock();
        if queue.closed {
            return Err(EngineError::ProcessUnavailable);
        }
        queue.pending.push_back(entry);
        Ok(())
    }

    /// Drop a command the caller gave up on. Returns false if the reader
    /// already resolved it.
    fn abandon(&self, id: u64) -> bool {
        let mut queue = self.queue.lock();
        match queue.pending.iter().position(|p| p.id == id) {
            Some(index) => {
                queue.pending.remove(index);
                queue.orphans += 1;
                true
            }
            None => false,
        }
    }

    fn forget(&self, id: u64) {
        self.queue.lock().pending.retain(|p| p.id != id);
    }

    fn clear_orphans(&self) {
        let mut queue = self.queue.lock();
        if queue.orphans > 0 {
            debug!(orphans = queue.orphans, "forgetting owed engine responses");
            queue.orphans = 0;
        }
    }

    fn dispatch(&self, response: String) {
        let entry = {
            let mut queue = self.queue.lock();
            if queue.orphans > 0 {
                queue.orphans -= 1;
                debug!(response = %response, "discarding late engine response");
                return;
            }
            if let Some(marker) = queue.pending.front().and_then(|head| head.marker.as_deref()) {
                if parse_response("", &response).ok().as_deref() != Some(marker) {
                    debug!(response = %response, "discarding stale engine response");
                    return;
                }
            }
            queue.pending.pop_front()
        };

        let Some(entry) = entry else {
            warn!(response = %response, "engine response with no pending command");
            return;
        };

        debug!(command = %entry.command, response = %response, "engine ->");
        let result = parse_response(&entry.command, &response);
        // Receiver gone means the caller is already handling a timeout.
        let _ = entry.reply.send(result);
    }

    fn close(&self) {
        let drained: Vec<PendingCommand> = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            queue.orphans = 0;
            queue.pending.drain(..).collect()
        };
        for entry in drained {
            let _ = entry.reply.send(Err(EngineError::ProcessUnavailable));
        }
    }

    fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }
}

/// Split a framed response into payload or rejection.
fn parse_response(command: &str, response: &str) -> Reply {
    let mut chars = response.chars();
    let status = chars.next();
    // Drop an echoed numeric id, if any.
    let body = chars.as_str().trim_start_matches(|c: char| c.is_ascii_digit()).trim();
    match status {
        Some('=') => Ok(body.to_string()),
        Some('?') => Err(EngineError::Rejected {
            command: command.to_string(),
            message: body.to_string(),
        }),
        _ => Err(EngineError::Protocol(format!("unexpected response '{response}'"))),
    }
}

async fn read_loop<R>(mut reader: R, shared: Arc<Shared>)
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut current: Option<String> = None;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "engine output read failed");
                break;
            }
        }

        let text = line.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            if let Some(response) = current.take() {
                shared.dispatch(response);
            }
            continue;
        }

        match current.as_mut() {
            Some(buffer) => {
                buffer.push('\n');
                buffer.push_str(text);
            }
            None => {
                if !text.starts_with('=') && !text.starts_with('?') {
                    warn!(line = text, "malformed engine response");
                }
                current = Some(text.to_string());
            }
        }
    }

    debug!("engine output closed");
    shared.close();
}

/// Serialized command channel to one engine.
pub struct EngineConnection {
    writer: AsyncMutex<BoxedWriter>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    timeout: Duration,
    reader_task: JoinHandle<()>,
    child: Mutex<Option<Child>>,
}

impl EngineConnection {
    /// Wrap an engine's output and input streams. Spawns the reader task, so
    /// this must run inside a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&shared)));
        Self {
            writer: AsyncMutex::new(Box::new(writer)),
            shared,
            next_id: AtomicU64::new(0),
            timeout,
            reader_task,
            child: Mutex::new(None),
        }
    }

    /// Attach the OS process so shutdown can kill it.
    #[must_use]
    pub fn with_child(self, child: Child) -> Self {
        *self.child.lock() = Some(child);
        self
    }

    /// Still able to take commands?
    #[must_use]
    pub fn is_operational(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Commands currently waiting for a response.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }

    fn register(&self, command: &str, marker: Option<String>) -> Result<(u64, oneshot::Receiver<Reply>), EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.enqueue(PendingCommand {
            id,
            command: command.to_string(),
            marker,
            reply: tx,
        })?;
        Ok((id, rx))
    }

    async fn write_line(&self, writer: &mut BoxedWriter, id: u64, command: &str) -> Result<(), EngineError> {
        debug!(command, "engine <-");
        let written = async {
            writer.write_all(command.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!(command, error = %e, "engine input closed");
            self.shared.forget(id);
            self.shared.close();
            return Err(EngineError::ProcessUnavailable);
        }
        Ok(())
    }

    /// Give up on a command after its deadline passed.
    fn expire(&self, id: u64, command: &str, rx: &mut oneshot::Receiver<Reply>) -> Reply {
        if self.shared.abandon(id) {
            warn!(command, timeout_ms = self.timeout.as_millis() as u64, "engine command timed out");
            Err(EngineError::Timeout {
                command: command.to_string(),
            })
        } else {
            rx.try_recv().unwrap_or(Err(EngineError::ProcessUnavailable))
        }
    }

    /// Send one command and wait for its response payload.
    pub async fn send(&self, command: &str) -> Result<String, EngineError> {
        self.exchange(command, None).await
    }

    /// Bring response attribution back in line with the engine.
    ///
    /// Owed late responses are forgotten, and every response that arrives
    /// before the marker's echo is dropped as stale.
    pub async fn sync(&self) -> Result<(), EngineError> {
        let marker = format!("sync-{}", self.next_id.load(Ordering::Relaxed));
        self.exchange(&format!("echo {marker}"), Some(marker)).await?;
        debug!("engine in sync");
        Ok(())
    }

    async fn exchange(&self, command: &str, marker: Option<String>) -> Result<String, EngineError> {
        let mut writer = self.writer.lock().await;
        if marker.is_some() {
            self.shared.clear_orphans();
        }
        let (id, mut rx) = self.register(command, marker)?;
        self.write_line(&mut writer, id, command).await?;

        match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(EngineError::ProcessUnavailable),
            Err(_) => self.expire(id, command, &mut rx),
        }
    }

    /// Kill the process and fail anything still pending.
    pub fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().take() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to kill engine process");
            }
        }
        self.reader_task.abort();
        self.shared.close();
    }
}

impl Drop for EngineConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, AsyncReadExt, BufReader};

    fn pair(timeout_ms: u64) -> (EngineConnection, tokio::io::DuplexStream) {
        let (client, server) = duplex(1024);
        let (read, write) = split(client);
        let conn = EngineConnection::new(BufReader::new(read), write, Duration::from_millis(timeout_ms));
        (conn, server)
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(parse_response("genmove b", "= D4").unwrap(), "D4");
        assert_eq!(parse_response("name", "=1 GNU Go").unwrap(), "GNU Go");
        assert!(matches!(
            parse_response("play b Z9", "? invalid coordinate"),
            Err(EngineError::Rejected { message, .. }) if message == "invalid coordinate"
        ));
    }

    #[tokio::test]
    async fn test_response_resolves_head() {
        let (conn, mut server) = pair(1000);
        let engine = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"name\n");
            server.write_all(b"= Fake\n\n").await.unwrap();
            server
        });
        assert_eq!(conn.send("name").await.unwrap(), "Fake");
        assert_eq!(conn.pending_len(), 0);
        drop(engine.await.unwrap());
    }

    #[test]
    fn test_parse_malformed_response() {
        assert!(matches!(parse_response("name", "garbage"), Err(EngineError::Protocol(_))));
        assert!(matches!(parse_response("name", "éh"), Err(EngineError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_malformed_line_resolves_head() {
        let (conn, mut server) = pair(1000);
        let engine = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            server.read(&mut buf).await.unwrap();
            server.write_all(b"garbage output\n\n").await.unwrap();
            server.read(&mut buf).await.unwrap();
            server.write_all(b"= Fake\n\n").await.unwrap();
            server
        });
        assert!(matches!(conn.send("name").await, Err(EngineError::Protocol(_))));
        assert_eq!(conn.send("name").await.unwrap(), "Fake");
        drop(engine.await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_skips_stale_output() {
        let (conn, mut server) = pair(1000);
        // An orphan the engine will never answer.
        conn.shared.queue.lock().orphans = 1;
        let engine = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            let command = String::from_utf8_lossy(&buf[..n]).to_string();
            let marker = command.trim().trim_start_matches("echo ").to_string();
            server.write_all(b"= stale\n\n").await.unwrap();
            server.write_all(format!("= {marker}\n\n").as_bytes()).await.unwrap();
            server.read(&mut buf).await.unwrap();
            server.write_all(b"= Fake\n\n").await.unwrap();
            server
        });
        conn.sync().await.unwrap();
        assert_eq!(conn.send("name").await.unwrap(), "Fake");
        assert_eq!(conn.pending_len(), 0);
        drop(engine.await.unwrap());
    }

    #[tokio::test]
    async fn test_eof_marks_unavailable() {
        let (conn, server) = pair(1000);
        drop(server);
        let err = conn.send("name").await.unwrap_err();
        assert!(matches!(err, EngineError::ProcessUnavailable));
        assert!(!conn.is_operational());
    }
}
