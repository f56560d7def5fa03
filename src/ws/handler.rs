//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{GameError, SimulationHandle, Vector};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::connection::ConnectionHandle;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();
    let (connection, outbound_rx) = ConnectionHandle::channel();

    if let Err(e) = state
        .simulation
        .join(connection_id.clone(), connection.clone())
        .await
    {
        warn!(connection_id = %connection_id, error = %e, "Join failed");
        let reply = ServerMsg::Error {
            code: error_code(&e).to_string(),
            message: e.to_string(),
        };
        let _ = send_msg(&mut ws_sink, &reply).await;
        return;
    }

    let welcome = ServerMsg::Welcome {
        connection_id: connection_id.clone(),
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        state.simulation.leave(connection_id).await;
        return;
    }

    let session = Session {
        connection_id: connection_id.clone(),
        connection,
        simulation: state.simulation.clone(),
        rate_limiter: ConnectionRateLimiter::new(state.config.input_rate_limit),
    };
    session.run(ws_sink, ws_stream, outbound_rx).await;

    // Cleanup on disconnect
    state.simulation.leave(connection_id.clone()).await;

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// One joined socket
struct Session {
    connection_id: String,
    connection: ConnectionHandle,
    simulation: SimulationHandle,
    rate_limiter: ConnectionRateLimiter,
}

impl Session {
    /// Pump outbound messages to the socket and client messages into the
    /// simulation until either side closes
    async fn run(
        self,
        mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
        mut ws_stream: futures::stream::SplitStream<WebSocket>,
        mut outbound_rx: mpsc::Receiver<ServerMsg>,
    ) {
        // Spawn writer task: snapshots -> WebSocket
        let writer_id = self.connection_id.clone();
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(connection_id = %writer_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
        });

        // Reader loop: WebSocket -> simulation
        let id = &self.connection_id;
        while let Some(result) = ws_stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if !self.rate_limiter.check_input() {
                        warn!(connection_id = %id, "Rate limited input message");
                        continue;
                    }

                    match serde_json::from_str::<ClientMsg>(&text) {
                        Ok(msg) => {
                            if !self.handle_client_msg(msg).await {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(connection_id = %id, error = %e, "Failed to parse client message");
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    warn!(connection_id = %id, "Received binary message, ignoring");
                }
                Ok(Message::Ping(_)) => {
                    debug!(connection_id = %id, "Received ping");
                }
                Ok(Message::Pong(_)) => {
                    debug!(connection_id = %id, "Received pong");
                }
                Ok(Message::Close(_)) => {
                    info!(connection_id = %id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    error!(connection_id = %id, error = %e, "WebSocket error");
                    break;
                }
            }
        }

        writer_handle.abort();
    }

    /// Returns false once the simulation is gone
    async fn handle_client_msg(&self, msg: ClientMsg) -> bool {
        match msg {
            ClientMsg::Input { keyboard_state } => {
                if let Err(e) = self
                    .simulation
                    .input(self.connection_id.clone(), keyboard_state)
                    .await
                {
                    debug!(connection_id = %self.connection_id, error = %e, "Input not delivered");
                    return false;
                }
            }
            ClientMsg::Force { force } => {
                let Some(force) = Vector::from_slice(&force) else {
                    warn!(
                        connection_id = %self.connection_id,
                        components = force.len(),
                        "Ignoring force with unsupported arity"
                    );
                    return true;
                };
                if let Err(e) = self
                    .simulation
                    .apply_force(self.connection_id.clone(), force)
                    .await
                {
                    debug!(connection_id = %self.connection_id, error = %e, "Force not delivered");
                    return false;
                }
            }
            ClientMsg::Ping { t } => {
                if self.connection.send(ServerMsg::Pong { t }).is_err() {
                    debug!(connection_id = %self.connection_id, "Pong dropped");
                }
            }
        }
        true
    }
}

/// Machine-readable code for a rejected join
fn error_code(error: &GameError) -> &'static str {
    match error {
        GameError::DuplicateConnection(_) => "duplicate_connection",
        GameError::SimulationStopped => "unavailable",
        _ => "join_failed",
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
