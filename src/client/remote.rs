//! Remote mining client: handshake, command send, response correlation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::engine::{DeviceInfo, StatsSnapshot};
use crate::error::{ClientErrorKind, ControlError, ControlResult, ProtocolErrorKind};
use crate::protocol::{
    read_line_bounded, read_line_with_timeout, write_line, Command, Response,
    DEFAULT_MAX_LINE_BYTES,
};

/// Commands awaiting their responses.
///
/// Each outgoing command registers a oneshot slot under its correlation id.
/// The read loop routes inbound responses by id; a response without an id
/// resolves the oldest outstanding command, so id-less servers still
/// correlate correctly in arrival order.
#[derive(Default)]
struct PendingMap {
    slots: HashMap<Uuid, oneshot::Sender<Response>>,
    order: VecDeque<Uuid>,
}

impl PendingMap {
    fn register(&mut self, id: Uuid, tx: oneshot::Sender<Response>) {
        self.slots.insert(id, tx);
        self.order.push_back(id);
    }

    fn deregister(&mut self, id: Uuid) {
        self.slots.remove(&id);
        self.order.retain(|pending| *pending != id);
    }

    fn resolve(&mut self, response: Response) {
        let id = match response.id {
            Some(id) if self.slots.contains_key(&id) => Some(id),
            Some(_) => None,
            // FIFO fallback: oldest outstanding command wins.
            None => loop {
                match self.order.front() {
                    Some(id) if self.slots.contains_key(id) => break Some(*id),
                    Some(_) => {
                        self.order.pop_front();
                    }
                    None => break None,
                }
            },
        };

        match id {
            Some(id) => {
                self.order.retain(|pending| *pending != id);
                if let Some(tx) = self.slots.remove(&id) {
                    let _ = tx.send(response);
                }
            }
            None => debug!("Dropping unmatched response"),
        }
    }

    fn fail_all(&mut self) {
        // Dropping the senders wakes every waiter with a closed channel.
        self.slots.clear();
        self.order.clear();
    }
}

struct ClientConn {
    writer: OwnedWriteHalf,
    read_task: JoinHandle<()>,
    device: Option<DeviceInfo>,
}

/// Client side of the remote mining control channel.
///
/// One instance owns at most one connection. Multiple commands may be in
/// flight at once; correlation ids match each response to its caller.
pub struct RemoteClient {
    config: ClientConfig,
    conn: Mutex<Option<ClientConn>>,
    pending: Arc<StdMutex<PendingMap>>,
    connected_tx: watch::Sender<bool>,
}

impl RemoteClient {
    pub fn new(config: ClientConfig) -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            config,
            conn: Mutex::new(None),
            pending: Arc::new(StdMutex::new(PendingMap::default())),
            connected_tx,
        }
    }

    /// Connect and perform the handshake.
    ///
    /// Reads exactly one welcome record and returns the worker's device
    /// snapshot when the server reports success.
    pub async fn connect(&self, host: &str, port: u16) -> ControlResult<DeviceInfo> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(ControlError::Client {
                kind: ClientErrorKind::AlreadyConnected,
            });
        }

        let connect_window = Duration::from_millis(self.config.connect_timeout_ms);
        let stream = timeout(connect_window, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ControlError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            })??;

        let (read_half, writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let welcome_line =
            read_line_with_timeout(&mut reader, DEFAULT_MAX_LINE_BYTES, connect_window).await?;
        let welcome: Response =
            serde_json::from_str(&welcome_line).map_err(|e| ControlError::Client {
                kind: ClientErrorKind::HandshakeFailed {
                    message: format!("undecodable welcome record: {}", e),
                },
            })?;
        if !welcome.success {
            return Err(ControlError::Client {
                kind: ClientErrorKind::HandshakeFailed {
                    message: welcome.message,
                },
            });
        }
        let device = welcome
            .data
            .map(serde_json::from_value::<DeviceInfo>)
            .transpose()
            .map_err(|e| ControlError::Client {
                kind: ClientErrorKind::HandshakeFailed {
                    message: format!("unreadable device snapshot: {}", e),
                },
            })?
            .ok_or_else(|| ControlError::Client {
                kind: ClientErrorKind::HandshakeFailed {
                    message: "welcome record carried no device snapshot".to_string(),
                },
            })?;

        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fail_all();

        self.connected_tx.send_replace(true);
        let read_task = tokio::spawn(read_loop(
            reader,
            Arc::clone(&self.pending),
            self.connected_tx.clone(),
        ));
        info!(host = host, port = port, device = device.device_name.as_str(), "Connected to remote worker");

        *conn = Some(ClientConn {
            writer,
            read_task,
            device: Some(device.clone()),
        });
        Ok(device)
    }

    /// Disconnect and reset state so `connect` may be called again.
    ///
    /// Idempotent; pending commands resolve as not-connected failures.
    pub async fn disconnect(&self) {
        let Some(mut conn) = self.conn.lock().await.take() else {
            return;
        };

        conn.read_task.abort();
        let _ = conn.writer.shutdown().await;
        self.connected_tx.send_replace(false);
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fail_all();
        info!("Disconnected from remote worker");
    }

    /// Whether the connection is currently up.
    pub fn is_connected(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// Observable connected state for UI or notification collaborators.
    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    /// Device snapshot captured during the handshake.
    pub async fn remote_device(&self) -> Option<DeviceInfo> {
        self.conn.lock().await.as_ref().and_then(|c| c.device.clone())
    }

    /// Send one command and await its correlated response.
    ///
    /// Bounded by the configured command timeout; on timeout the pending
    /// slot is released so later correlation is unaffected.
    pub async fn send_command(
        &self,
        action: &str,
        params: Option<Map<String, Value>>,
    ) -> ControlResult<Response> {
        let window = Duration::from_millis(self.config.command_timeout_ms);
        self.send_command_with_timeout(action, params, window).await
    }

    /// Like [`send_command`](Self::send_command) with an explicit window.
    pub async fn send_command_with_timeout(
        &self,
        action: &str,
        params: Option<Map<String, Value>>,
        window: Duration,
    ) -> ControlResult<Response> {
        let id = Uuid::new_v4();
        let mut command = Command::new(action).with_id(id);
        if let Some(params) = params {
            command.params = params;
        }

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .register(id, tx);

        // Hold the connection lock only for the write so other commands can
        // go out while this one awaits its response.
        let write_result = {
            let mut conn = self.conn.lock().await;
            match conn.as_mut() {
                Some(conn) => {
                    let line = serde_json::to_string(&command)?;
                    write_line(&mut conn.writer, &line).await
                }
                None => Err(ControlError::Client {
                    kind: ClientErrorKind::NotConnected,
                }),
            }
        };
        if let Err(e) = write_result {
            self.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .deregister(id);
            return Err(e);
        }
        debug!(action = action, id = %id, "Sent command");

        match timeout(window, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ControlError::Client {
                kind: ClientErrorKind::NotConnected,
            }),
            Err(_) => {
                self.pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .deregister(id);
                Err(ControlError::Client {
                    kind: ClientErrorKind::CommandTimeout {
                        timeout_ms: window.as_millis() as u64,
                    },
                })
            }
        }
    }

    /// Ask the worker to start mining with its current settings.
    pub async fn start_mining(&self) -> ControlResult<()> {
        self.expect_ok("start_mining", None).await
    }

    /// Ask the worker to stop mining.
    pub async fn stop_mining(&self) -> ControlResult<()> {
        self.expect_ok("stop_mining", None).await
    }

    /// Ask the worker to pause mining.
    pub async fn pause_mining(&self) -> ControlResult<()> {
        self.expect_ok("pause_mining", None).await
    }

    /// Ask the worker to resume mining.
    pub async fn resume_mining(&self) -> ControlResult<()> {
        self.expect_ok("resume_mining", None).await
    }

    /// Set the worker's desired thread count.
    pub async fn set_threads(&self, threads: u32) -> ControlResult<()> {
        let mut params = Map::new();
        params.insert("threads".to_string(), Value::from(threads));
        self.expect_ok("set_threads", Some(params)).await
    }

    /// Set the worker's soft hashrate ceiling in H/s.
    pub async fn set_hashrate_limit(&self, limit: f64) -> ControlResult<()> {
        let mut params = Map::new();
        params.insert("limit".to_string(), Value::from(limit));
        self.expect_ok("set_hashrate_limit", Some(params)).await
    }

    /// Fetch a mining statistics snapshot.
    pub async fn get_stats(&self) -> ControlResult<StatsSnapshot> {
        self.expect_data("get_stats").await
    }

    /// Fetch a device snapshot.
    pub async fn get_device_info(&self) -> ControlResult<DeviceInfo> {
        self.expect_data("get_device_info").await
    }

    async fn expect_ok(
        &self,
        action: &str,
        params: Option<Map<String, Value>>,
    ) -> ControlResult<()> {
        let response = self.send_command(action, params).await?;
        if response.success {
            Ok(())
        } else {
            Err(ControlError::Client {
                kind: ClientErrorKind::ServerFailure {
                    message: response.message,
                },
            })
        }
    }

    async fn expect_data<T: serde::de::DeserializeOwned>(&self, action: &str) -> ControlResult<T> {
        let response = self.send_command(action, None).await?;
        if !response.success {
            return Err(ControlError::Client {
                kind: ClientErrorKind::ServerFailure {
                    message: response.message,
                },
            });
        }
        let data = response.data.ok_or_else(|| ControlError::Client {
            kind: ClientErrorKind::ServerFailure {
                message: format!("{} response carried no data", action),
            },
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

async fn read_loop(
    mut reader: BufReader<OwnedReadHalf>,
    pending: Arc<StdMutex<PendingMap>>,
    connected_tx: watch::Sender<bool>,
) {
    loop {
        match read_line_bounded(&mut reader, DEFAULT_MAX_LINE_BYTES).await {
            Ok(line) => match serde_json::from_str::<Response>(&line) {
                Ok(response) => pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .resolve(response),
                Err(e) => warn!(error = %e, "Undecodable record from server"),
            },
            Err(_) => break,
        }
    }

    // End-of-stream: flip the connected flag and fail pending commands.
    connected_tx.send_replace(false);
    pending.lock().unwrap_or_else(|e| e.into_inner()).fail_all();
    debug!("Server connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: Option<Uuid>, message: &str) -> Response {
        Response {
            success: true,
            message: message.to_string(),
            data: None,
            id,
        }
    }

    #[test]
    fn resolve_routes_by_id() {
        let mut pending = PendingMap::default();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        pending.register(id_a, tx_a);
        pending.register(id_b, tx_b);

        // Responses arrive out of order; ids still route correctly.
        pending.resolve(response(Some(id_b), "second"));
        pending.resolve(response(Some(id_a), "first"));

        assert_eq!(rx_a.try_recv().unwrap().message, "first");
        assert_eq!(rx_b.try_recv().unwrap().message, "second");
    }

    #[test]
    fn resolve_falls_back_to_oldest_outstanding() {
        let mut pending = PendingMap::default();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        pending.register(Uuid::new_v4(), tx_a);
        pending.register(Uuid::new_v4(), tx_b);

        pending.resolve(response(None, "for the oldest"));

        assert_eq!(rx_a.try_recv().unwrap().message, "for the oldest");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn deregistered_slot_no_longer_matches() {
        let mut pending = PendingMap::default();
        let (tx, mut rx) = oneshot::channel();
        let id = Uuid::new_v4();
        pending.register(id, tx);
        pending.deregister(id);

        pending.resolve(response(Some(id), "late"));
        assert!(rx.try_recv().is_err());

        // The FIFO queue no longer references the deregistered id either.
        pending.resolve(response(None, "unmatched"));
    }

    #[test]
    fn fail_all_wakes_waiters_with_closed_channels() {
        let mut pending = PendingMap::default();
        let (tx, mut rx) = oneshot::channel::<Response>();
        pending.register(Uuid::new_v4(), tx);

        pending.fail_all();
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }
}
