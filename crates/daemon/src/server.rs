// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;

use lb_core::CreateLog;
use lb_engine::{DispatchError, QueueError};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, warn};

use crate::lifecycle::ServerContext;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Handle a single client connection
///
/// Generic over the stream so tests can drive it with an in-memory pipe.
pub async fn handle_connection<S>(ctx: Arc<ServerContext>, stream: S) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(&ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    // Only after the client has its answer
    if response == Response::ShuttingDown {
        ctx.shutdown.notify_one();
    }

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let stats = ctx.runtime.stats();
            Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                events: ctx.runtime.store().event_count() as u64,
                queue_depth: ctx.runtime.queue_depth() as u64,
                queue_capacity: ctx.runtime.queue_capacity() as u64,
                items_processed: stats.items,
                failed_items: stats.failed_items,
            }
        }

        Request::SubmitLog {
            client_id,
            level,
            message,
            wait,
        } => submit_log(ctx, CreateLog::new(client_id, level, message), wait).await,

        Request::ListLogs => match ctx.runtime.list_logs() {
            Ok(logs) => Response::Logs {
                logs,
                corrupted_streams: ctx.runtime.corrupted_streams(),
            },
            Err(e) => error_response(e),
        },

        Request::GetLog { id } => match ctx.runtime.get_log(&id) {
            Ok(log) => Response::Log {
                log: log.map(Box::new),
            },
            Err(e) => error_response(e),
        },

        Request::GetClientActivity { client_id } => {
            match ctx.runtime.client_activity(&client_id) {
                Ok(activity) => Response::ClientActivity { activity },
                Err(e) => error_response(e),
            }
        }

        Request::Flush => match ctx.runtime.flush().await {
            Ok(()) => Response::Flushed,
            Err(e) => error_response(e),
        },

        Request::Shutdown => Response::ShuttingDown,
    }
}

async fn submit_log(ctx: &ServerContext, command: CreateLog, wait: bool) -> Response {
    let accepted = match ctx.runtime.submit_log(command) {
        Ok(accepted) => accepted,
        Err(DispatchError::Validation(errors)) => {
            debug!(%errors, "submission rejected");
            return Response::Rejected {
                errors: errors.into_errors(),
            };
        }
        Err(DispatchError::Queue(e @ QueueError::Full { .. })) => {
            warn!("{}", e);
            return Response::Busy {
                message: e.to_string(),
            };
        }
        Err(e) => return error_response(e),
    };

    if !wait {
        return Response::LogAccepted {
            log_id: accepted.log_id,
            durable: false,
        };
    }
    match accepted.completion.wait().await {
        Ok(_) => Response::LogAccepted {
            log_id: accepted.log_id,
            durable: true,
        },
        Err(e) => error_response(e),
    }
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error {
        message: e.to_string(),
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
