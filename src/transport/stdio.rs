//! Newline-delimited JSON-RPC over stdin/stdout
//!
//! Requests are handled concurrently; each response is written as one line
//! as soon as it is ready. Nothing but protocol messages goes to stdout.
use crate::core::protocol::{error_codes, JsonRpcResponse};
use crate::core::RouterServer;
use crate::utils::errors::{RouterError, RouterResult};
use crate::utils::shutdown::ShutdownSignal;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Longest accepted input line
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Serve MCP on the process's stdin/stdout until EOF or shutdown.
pub async fn serve_stdio(server: Arc<RouterServer>, shutdown: ShutdownSignal) -> RouterResult<()> {
    serve(server, tokio::io::stdin(), tokio::io::stdout(), shutdown).await
}

/// Serve MCP over any line-oriented byte stream pair.
pub async fn serve<R, W>(
    server: Arc<RouterServer>,
    input: R,
    output: W,
    mut shutdown: ShutdownSignal,
) -> RouterResult<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(64);
    let writer = tokio::spawn(write_responses(output, rx));
    let mut in_flight = InFlight::default();

    info!("stdio transport ready");

    let result = loop {
        let next = tokio::select! {
            _ = shutdown.recv() => {
                info!("stdio transport stopping on shutdown");
                break Ok(());
            }
            next = lines.next() => next,
        };

        match next {
            None => {
                info!("stdin closed");
                break Ok(());
            }
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                debug!(bytes = line.len(), "stdio request received");

                let server = server.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    if let Some(response) = server.handle_message(&line).await {
                        // Receiver only goes away when the writer failed
                        let _ = tx.send(response).await;
                    }
                });
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(max = MAX_LINE_LENGTH, "Discarding oversized stdio message");
                let response = JsonRpcResponse::error(None, error_codes::PARSE_ERROR, "Message too large");
                if tx.send(response).await.is_err() {
                    break Err(RouterError::Internal("stdout writer stopped".to_string()));
                }
            }
            Some(Err(LinesCodecError::Io(e))) => {
                error!(error = %e, "Failed to read stdin");
                break Err(RouterError::Io(e));
            }
        }
    };

    in_flight.drain().await;
    drop(tx);

    match writer.await {
        Ok(Ok(())) => result,
        Ok(Err(e)) => result.and(Err(e)),
        Err(e) => result.and(Err(RouterError::Internal(format!("stdout writer panicked: {}", e)))),
    }
}

/// Request tasks still owned by the session
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<()>,
}

impl InFlight {
    /// Spawn a request task after reaping every task that already finished.
    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join_error(joined);
        }
        self.tasks.spawn(task);
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join_error(joined);
        }
    }
}

fn log_join_error(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "stdio request task failed");
    }
}

async fn write_responses<W>(output: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> RouterResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(output, LinesCodec::new());

    while let Some(response) = rx.recv().await {
        let line = serde_json::to_string(&response)?;
        sink.send(line).await.map_err(|e| match e {
            LinesCodecError::Io(e) => RouterError::Io(e),
            other => RouterError::Internal(other.to_string()),
        })?;
    }

    Ok(())
}
