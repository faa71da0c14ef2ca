//! Newline-delimited request/response transport over a byte stream.
//!
//! Every request runs on its own task, so a long `wait_for_agents` never
//! delays `list` or `result`. Responses are written by a single writer task
//! in completion order; callers match them up by `id`.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::handlers::{self, HandlerState};
use crate::rpc::{self, RpcResponse};

/// Serve requests from `reader` until EOF, then flush outstanding responses.
pub async fn serve<R, W>(state: Arc<HandlerState>, reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_responses(rx, writer));

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!(error = %e, "request line is not valid UTF-8");
                send(&tx, &RpcResponse::parse_error(e));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let request = match rpc::parse_request(line) {
            Ok(req) => req,
            Err(resp) => {
                send(&tx, &resp);
                continue;
            }
        };

        let state = Arc::clone(&state);
        let tx = tx.clone();
        let _ = tokio::spawn(async move {
            debug!(method = %request.method, "stdio request");
            let params = request.params.unwrap_or_else(|| serde_json::json!({}));
            let response = handlers::dispatch(&state, &request.method, &params, request.id).await;
            send(&tx, &response);
        });
    }

    debug!("stdin closed, draining in-flight requests");
    drop(tx);
    writer_task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &RpcResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => warn!(error = %e, "failed to serialize response"),
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<String>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
