//! Stdio front-end.
//!
//! Newline-delimited JSON-RPC over stdin/stdout. There is exactly one
//! implicit client, so no session registry is involved.
//!
//! Reading and writing run concurrently. Dispatch runs on separate tasks and
//! responses are written back as they complete, so a slow backend call never
//! blocks reading the next line.

use std::sync::Arc;

use docmcp_protocol::{JsonRpcHandler, JsonRpcResponse, McpError, McpResult};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Largest accepted line
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Line-delimited JSON-RPC server
#[derive(Clone)]
pub struct StdioServer {
    handler: Arc<dyn JsonRpcHandler>,
}

impl std::fmt::Debug for StdioServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioServer").finish_non_exhaustive()
    }
}

impl StdioServer {
    /// Server dispatching to `handler`
    pub fn new(handler: Arc<dyn JsonRpcHandler>) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn run_stdio(&self) -> McpResult<()> {
        info!("Serving MCP over stdio");
        let reader = BufReader::new(tokio::io::stdin());
        self.run(reader, tokio::io::stdout()).await
    }

    /// Serve `reader`/`writer` until end of input.
    ///
    /// Blank lines are skipped; oversized lines and invalid JSON are answered
    /// with an error response and the loop continues. In-flight requests are
    /// answered before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let (response_tx, mut response_rx) = mpsc::channel::<Value>(32);

        let read_loop = async move {
            let mut line = String::new();
            loop {
                line.clear();
                let bytes_read = reader
                    .read_line(&mut line)
                    .await
                    .map_err(|e| McpError::transport(format!("Failed to read line: {e}")))?;
                if bytes_read == 0 {
                    break;
                }

                if line.len() > MAX_MESSAGE_SIZE {
                    let error = McpError::invalid_request(format!(
                        "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
                    ));
                    send(&response_tx, JsonRpcResponse::error(None, error).into_value()).await?;
                    continue;
                }

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match serde_json::from_str::<Value>(trimmed) {
                    Ok(message) => {
                        let handler = Arc::clone(&self.handler);
                        let tx = response_tx.clone();
                        tokio::spawn(async move {
                            if let Some(response) = handler.handle_request(message).await {
                                // Receiver is gone only if writing already failed
                                let _ = tx.send(response).await;
                            }
                        });
                    }
                    Err(e) => {
                        debug!(error = %e, "Unparseable stdio line");
                        let error = McpError::parse_error(e.to_string());
                        send(&response_tx, JsonRpcResponse::error(None, error).into_value()).await?;
                    }
                }
            }
            info!("Stdio input closed");
            Ok::<(), McpError>(())
        };

        // Ends once the reader and every in-flight dispatch have dropped their senders
        let write_loop = async {
            while let Some(response) = response_rx.recv().await {
                write_message(&mut writer, &response).await?;
            }
            Ok::<(), McpError>(())
        };

        tokio::try_join!(read_loop, write_loop)?;
        Ok(())
    }
}

async fn send(tx: &mpsc::Sender<Value>, message: Value) -> McpResult<()> {
    tx.send(message)
        .await
        .map_err(|_| McpError::transport("Output closed"))
}

async fn write_message<W>(writer: &mut W, message: &Value) -> McpResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut encoded = serde_json::to_vec(message)?;
    encoded.push(b'\n');
    writer
        .write_all(&encoded)
        .await
        .map_err(|e| McpError::transport(format!("Failed to write response: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| McpError::transport(format!("Failed to flush: {e}")))
}
