//! Line-delimited JSON-RPC over stdin/stdout.
//!
//! Every line is handled on its own task so a slow upstream call never blocks the
//! reader; a single writer task serialises responses back onto the output stream.
//! There are no per-request headers on this transport, so credentials always come from
//! the environment defaults or `juspay_meta_info`.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use super::McpServer;
use crate::auth::RequestHeaders;
use crate::error::ErrorContext;
use crate::{Error, Result};

/// Upper bound on one inbound line.
const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Serve MCP on the process's stdin/stdout until stdin closes.
pub async fn serve(server: McpServer) -> Result<()> {
    tracing::info!(
        tool_set = %server.dispatcher().config().tool_set,
        "serving MCP over stdio"
    );
    serve_io(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve MCP over an arbitrary reader/writer pair.
pub async fn serve_io<R, W>(server: McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = sink.send(line).await {
                tracing::error!(error = %e, "failed to write response");
                break;
            }
        }
    });

    let headers = RequestHeaders::new();
    while let Some(next) = lines.next().await {
        let line = match next {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable input line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let server = server.clone();
        let tx = tx.clone();
        let headers = headers.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_message(&line, &headers).await {
                if tx.send(response.to_string()).await.is_err() {
                    tracing::debug!("writer closed before response was sent");
                }
            }
        });
    }

    // in-flight tasks hold their own senders; the writer drains until the last one finishes
    drop(tx);
    writer_task.await.map_err(|e| {
        Error::configuration_with_context(
            "stdio writer task failed",
            ErrorContext::new().with_details(e.to_string()),
        )
    })?;
    tracing::info!("stdin closed, stdio transport stopped");
    Ok(())
}
