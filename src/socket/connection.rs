//! Per-connection handler.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::commands::ActionRegistry;
use crate::config::ServerConfig;
use crate::engine::EngineHandle;
use crate::error::{ControlError, ControlResult, ProtocolErrorKind};
use crate::protocol::{read_line_bounded, write_line_with_timeout, Command, Response};

use super::listener::{ConnectionMetrics, Roster};

/// Removes the peer from the roster when the handler exits, whatever the
/// exit path: EOF, I/O error, or task abort during server stop.
pub(crate) struct RosterGuard {
    roster: Roster,
    metrics: Arc<ConnectionMetrics>,
    peer: SocketAddr,
}

impl RosterGuard {
    pub(crate) fn new(roster: Roster, metrics: Arc<ConnectionMetrics>, peer: SocketAddr) -> Self {
        Self {
            roster,
            metrics,
            peer,
        }
    }
}

impl Drop for RosterGuard {
    fn drop(&mut self) {
        self.roster
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.peer);
        self.metrics
            .active_connections
            .fetch_sub(1, Ordering::Relaxed);
        info!(peer = %self.peer, "Client disconnected");
    }
}

/// Handle a single controller connection.
///
/// Sends one welcome response carrying the device snapshot, then answers
/// exactly one response per line received until the peer hangs up. Parse
/// failures are recoverable and never terminate the connection.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    engine: EngineHandle,
    registry: Arc<ActionRegistry>,
    config: ServerConfig,
    metrics: Arc<ConnectionMetrics>,
) -> ControlResult<()> {
    let write_timeout = Duration::from_secs(config.write_timeout_seconds);
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Welcome record: device snapshot so the controller can validate
    // compatibility before issuing commands.
    let welcome = match engine.controller().device_info() {
        Ok(info) => Response::ok_with_data(
            "Connected to remote mining server",
            serde_json::to_value(info)?,
        ),
        Err(e) => Response::fail(e.to_string()),
    };
    write_line_with_timeout(&mut writer, &serde_json::to_string(&welcome)?, write_timeout).await?;

    loop {
        let line = match read_line_bounded(&mut reader, config.max_line_bytes).await {
            Ok(line) => line,
            Err(ControlError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!(peer = %peer, "End of stream");
                return Ok(());
            }
            Err(ControlError::Protocol {
                kind: kind @ ProtocolErrorKind::LineTooLong { .. },
            }) => {
                // The stream is desynchronized past an oversized record;
                // report once and hang up.
                warn!(peer = %peer, error = %kind, "Oversized record, closing connection");
                let response = Response::fail("malformed command");
                write_line_with_timeout(
                    &mut writer,
                    &serde_json::to_string(&response)?,
                    write_timeout,
                )
                .await?;
                return Ok(());
            }
            Err(ControlError::Protocol {
                kind: kind @ ProtocolErrorKind::MalformedRecord { .. },
            }) => {
                debug!(peer = %peer, error = %kind, "Undecodable record");
                let response = Response::fail("malformed command");
                write_line_with_timeout(
                    &mut writer,
                    &serde_json::to_string(&response)?,
                    write_timeout,
                )
                .await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = match serde_json::from_str::<Command>(&line) {
            Ok(command) => {
                debug!(peer = %peer, action = command.action.as_str(), "Received command");
                registry.dispatch(&engine, &command).await
            }
            Err(e) => {
                debug!(peer = %peer, error = %e, "Failed to parse command");
                Response::fail("malformed command")
            }
        };

        metrics.record_request(response.success);
        write_line_with_timeout(&mut writer, &serde_json::to_string(&response)?, write_timeout)
            .await?;
    }
}
