// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between clients and `lbd`
//!
//! Every message is a 4-byte big-endian length followed by that many bytes
//! of JSON. A connection carries one request and its response.

use lb_core::{ClientActivity, Log, LogSummary};
use lb_engine::FieldError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version reported by `Hello`
pub const PROTOCOL_VERSION: &str = "1";

/// Largest message accepted, in bytes
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Read/write timeout for one message
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message of {0} bytes exceeds limit")]
    TooLarge(usize),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out")]
    Timeout,
}

/// Requests a client can send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello {
        version: String,
    },
    Status,
    /// Record a log entry
    ///
    /// With `wait`, the response is sent only once the entry is durable.
    SubmitLog {
        client_id: String,
        level: String,
        message: String,
        #[serde(default)]
        wait: bool,
    },
    ListLogs,
    GetLog {
        id: String,
    },
    GetClientActivity {
        client_id: String,
    },
    /// Wait until every accepted entry has been processed
    Flush,
    Shutdown,
}

/// Responses from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello {
        version: String,
    },
    Status {
        uptime_secs: u64,
        events: u64,
        queue_depth: u64,
        queue_capacity: u64,
        items_processed: u64,
        failed_items: u64,
    },
    LogAccepted {
        log_id: String,
        /// Whether the entry was durable when the response was sent
        durable: bool,
    },
    /// The command failed validation; nothing was recorded
    Rejected {
        errors: Vec<FieldError>,
    },
    /// The daemon cannot take more work right now; retry later
    Busy {
        message: String,
    },
    Logs {
        logs: Vec<LogSummary>,
        /// Client streams whose logs are missing from `logs`
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        corrupted_streams: Vec<String>,
    },
    Log {
        log: Option<Box<Log>>,
    },
    ClientActivity {
        activity: Option<ClientActivity>,
    },
    Flushed,
    ShuttingDown,
    Error {
        message: String,
    },
}

/// Serialize a message to JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    let len = u32::try_from(data.len()).map_err(|_| ProtocolError::TooLarge(data.len()))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, ProtocolError>>,
) -> Result<T, ProtocolError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let data = with_timeout(timeout, read_message(reader)).await?;
    decode(&data)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    with_timeout(timeout, write_message(writer, &data)).await
}

pub async fn write_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(request)?;
    with_timeout(timeout, write_message(writer, &data)).await
}

pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    let data = with_timeout(timeout, read_message(reader)).await?;
    decode(&data)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
