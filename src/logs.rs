//! Lazy log record sequences, one-shot or follow mode.

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::fleet;
use crate::node::stream::{split_one_shot, FrameDecoder};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub msg: String,
}

/// Locate `id` across the fleet, or fail with `NoSuchInstance`.
async fn locate(conn: &Connection, id: &str) -> Result<String, ConnectionError> {
    let instances = fleet::get_instances(conn, None).await;
    instances
        .into_iter()
        .find(|i| i.id == id)
        .map(|i| i.node)
        .ok_or_else(|| ConnectionError::NoSuchInstance(id.to_string()))
}

/// Return a lazy sequence of log records for `id`. In one-shot mode
/// (`follow=false`) the full blob is fetched up front, split on newlines,
/// and emitted as a short finite stream. In follow mode the stream is
/// unbounded and driven by the daemon's framed payloads; dropping it closes
/// the underlying connection.
pub async fn get_logs(
    conn: &Connection,
    id: &str,
    follow: bool,
) -> Result<BoxStream<'static, LogRecord>, ConnectionError> {
    let node = locate(conn, id).await?;
    let handle = conn
        .node_handle(&node)
        .ok_or_else(|| ConnectionError::NoSuchNode(node.clone()))?;

    if !follow {
        let blob = handle
            .client
            .transport()
            .logs_blob(id)
            .await
            .map_err(|source| ConnectionError::Unreachable { node: node.clone(), source })?;
        let lines = split_one_shot(&blob);
        return Ok(Box::pin(futures_util::stream::iter(
            lines.into_iter().map(|msg| LogRecord { msg }),
        )));
    }

    let raw = handle
        .client
        .transport()
        .logs_stream(id)
        .await
        .map_err(|source| ConnectionError::Unreachable { node: node.clone(), source })?;

    let stream = async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures_util::pin_mut!(raw);
        while let Some(chunk) = raw.next().await {
            let Ok(chunk) = chunk else { break };
            decoder.feed(&chunk);
            for frame in decoder.drain() {
                yield LogRecord { msg: String::from_utf8_lossy(&frame).into_owned() };
            }
        }
    };

    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_shot_blob_splits_into_records() {
        let lines = split_one_shot(b"this is line 1\nthis is line 2\n");
        let records: Vec<LogRecord> = lines.into_iter().map(|msg| LogRecord { msg }).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].msg, "this is line 1\n");
        assert_eq!(records[1].msg, "this is line 2\n");
    }
}
