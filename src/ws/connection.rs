//! Outbound side of a client connection

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::ws::protocol::ServerMsg;

/// Messages buffered per connection before sends start failing
pub const OUTBOUND_CAPACITY: usize = 64;

/// Handle the simulation uses to push messages to one client.
///
/// Sends never wait: a slow or closed client loses the message.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<ServerMsg>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::Sender<ServerMsg>) -> Self {
        Self { tx }
    }

    /// Create a handle together with the receiver the socket writer drains
    pub fn channel() -> (Self, mpsc::Receiver<ServerMsg>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Self::new(tx), rx)
    }

    pub fn send(&self, msg: ServerMsg) -> Result<(), TrySendError<ServerMsg>> {
        self.tx.try_send(msg)
    }
}
