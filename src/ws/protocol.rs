//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::KeyboardState;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Current key state, sent whenever it changes
    Input { keyboard_state: KeyboardState },

    /// One-off push on the player's body, `[x, y]` or `[x, y, z]`
    Force { force: Vec<f32> },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once the connection has joined the world
    Welcome {
        connection_id: String,
        server_time: u64,
    },

    /// Personalized world state
    Snapshot {
        /// Server tick number
        tick: u64,
        #[serde(rename = "self")]
        own: PlayerState,
        /// Every other visible player, unordered
        others: Vec<PlayerState>,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Serialized state of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub connection_id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    pub velocity_x: f32,
    pub velocity_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_z: Option<f32>,
    /// Orientation in radians
    pub orientation: f32,
    pub hitbox_radius: f32,
}
