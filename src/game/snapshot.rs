//! Snapshot building and cadence

use std::collections::HashSet;

use crate::ws::connection::ConnectionHandle;
use crate::ws::protocol::{PlayerState, ServerMsg};

use super::player::Player;
use super::vector::Vector;
use super::world::World;

impl From<&Player> for PlayerState {
    fn from(player: &Player) -> Self {
        let entity = player.entity();
        let position = entity.position();
        let velocity = entity.velocity();
        Self {
            connection_id: player.connection_id().to_string(),
            x: position.x(),
            y: position.y(),
            z: position.z(),
            velocity_x: velocity.x(),
            velocity_y: velocity.y(),
            velocity_z: velocity.z(),
            orientation: entity.orientation,
            hitbox_radius: entity.hitbox_radius(),
        }
    }
}

/// Builds personalized snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    visibility_range: Option<Vector>,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32, visibility_range: Option<Vector>) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            visibility_range,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Build one snapshot per registered connection.
    ///
    /// Players in `excluded` get no snapshot and are left out of everyone
    /// else's `others`.
    pub fn build<'w>(
        &self,
        tick: u64,
        world: &'w World,
        excluded: &HashSet<String>,
    ) -> Vec<(&'w ConnectionHandle, ServerMsg)> {
        let entries: Vec<(&Player, &ConnectionHandle, PlayerState)> = world
            .entries()
            .filter(|(player, _)| !excluded.contains(player.connection_id()))
            .map(|(player, conn)| (player, conn, PlayerState::from(player)))
            .collect();

        entries
            .iter()
            .map(|(player, conn, own)| {
                let others = entries
                    .iter()
                    .filter(|(other, _, _)| other.connection_id() != player.connection_id())
                    .filter(|(other, _, _)| self.is_visible(other, player))
                    .map(|(_, _, state)| state.clone())
                    .collect();

                (
                    *conn,
                    ServerMsg::Snapshot {
                        tick,
                        own: own.clone(),
                        others,
                    },
                )
            })
            .collect()
    }

    fn is_visible(&self, target: &Player, viewer: &Player) -> bool {
        match &self.visibility_range {
            Some(range) => target
                .entity()
                .position()
                .within(viewer.entity().position(), range)
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Snapshot stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub dropped: u64,
}

impl SnapshotStats {
    pub fn record(&mut self, sent: usize, dropped: usize) {
        self.total_snapshots += sent as u64;
        self.dropped += dropped as u64;
    }
}
