//! World registry: the authoritative set of connections and their players

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::SimulationConfig;
use crate::ws::connection::ConnectionHandle;

use super::player::Player;
use super::vector::Vector;
use super::{GameError, KeyboardState};

/// Connected players keyed by connection id.
///
/// Both maps always hold the same key set. They are only mutated through
/// `join` and `leave`, so a reader never sees a connection without a player
/// or the other way round.
pub struct World {
    config: SimulationConfig,
    connections: HashMap<String, ConnectionHandle>,
    players: HashMap<String, Player>,
}

impl World {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            connections: HashMap::new(),
            players: HashMap::new(),
        }
    }

    /// Register a connection and spawn its player
    pub fn join(
        &mut self,
        connection_id: impl Into<String>,
        connection: ConnectionHandle,
    ) -> Result<&Player, GameError> {
        let connection_id = connection_id.into();
        if self.players.contains_key(&connection_id) {
            return Err(GameError::DuplicateConnection(connection_id));
        }

        let player = Player::new(
            connection_id.clone(),
            self.config.spawn_position,
            self.config.hitbox_radius,
            self.config.player_speed,
        )?;

        self.connections.insert(connection_id.clone(), connection);
        let player = self.players.entry(connection_id).or_insert(player);

        info!(
            connection_id = %player.connection_id(),
            x = player.entity().position().x(),
            y = player.entity().position().y(),
            "Player joined"
        );
        Ok(player)
    }

    /// Remove a connection and its player. Unknown ids are ignored.
    pub fn leave(&mut self, connection_id: &str) -> bool {
        let connection = self.connections.remove(connection_id);
        let player = self.players.remove(connection_id);

        match (connection, player) {
            (None, None) => {
                debug!(connection_id = %connection_id, "Leave for unknown connection");
                false
            }
            _ => {
                info!(connection_id = %connection_id, "Player left");
                true
            }
        }
    }

    /// Apply client key state. Input racing a disconnect is dropped.
    pub fn apply_input(&mut self, connection_id: &str, keys: &KeyboardState) {
        match self.players.get_mut(connection_id) {
            Some(player) => player.update_on_input(keys),
            None => {
                let e = GameError::UnknownConnection(connection_id.to_string());
                debug!(error = %e, "Dropping input");
            }
        }
    }

    /// Queue a force for the player's next tick. Unknown ids are dropped.
    pub fn queue_force(&mut self, connection_id: &str, force: Vector) {
        match self.players.get_mut(connection_id) {
            Some(player) => player.queue_force(force),
            None => {
                let e = GameError::UnknownConnection(connection_id.to_string());
                debug!(error = %e, "Dropping force");
            }
        }
    }

    #[cfg(test)]
    pub fn player(&self, connection_id: &str) -> Option<&Player> {
        self.players.get(connection_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Visit every registered player
    pub fn for_each_player<'a>(&'a self, mut f: impl FnMut(&'a Player)) {
        for player in self.players.values() {
            f(player);
        }
    }

    /// Every registered player together with its connection
    pub fn entries(&self) -> impl Iterator<Item = (&Player, &ConnectionHandle)> {
        self.players
            .iter()
            .filter_map(|(id, player)| self.connections.get(id).map(|conn| (player, conn)))
    }

    /// Integrate every player up to `now`, clamping positions into the world
    /// bounds. Players whose step fails keep their kinematics, have their
    /// clock restarted at `now`, and are returned.
    pub fn advance_players(&mut self, now: Instant) -> HashSet<String> {
        let bounds = self.config.world_bounds;
        let mut failed = HashSet::new();

        for (id, player) in self.players.iter_mut() {
            match player.advance(now) {
                Ok(()) => {
                    if let Some((min, max)) = bounds {
                        player.entity_mut().position_mut().clamp_each(min, max);
                    }
                }
                Err(e) => {
                    error!(connection_id = %id, error = %e, "Player update failed, skipping this tick");
                    player.entity_mut().skip(now);
                    failed.insert(id.clone());
                }
            }
        }

        failed
    }

    /// Pairs of connection ids whose players currently overlap
    pub fn collisions(&self) -> Vec<(String, String)> {
        let mut players = Vec::with_capacity(self.len());
        self.for_each_player(|player| players.push(player));
        let mut pairs = Vec::new();

        for i in 0..players.len() {
            for j in (i + 1)..players.len() {
                let (a, b) = (players[i], players[j]);
                match a.entity().is_collided_with(b.entity()) {
                    Ok(true) => {
                        pairs.push((a.connection_id().to_string(), b.connection_id().to_string()));
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!(
                            a = %a.connection_id(),
                            b = %b.connection_id(),
                            error = %e,
                            "Collision check failed"
                        );
                    }
                }
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn world() -> World {
        World::new(SimulationConfig::default())
    }

    fn join(world: &mut World, id: &str) -> Result<(), GameError> {
        let (conn, _rx) = ConnectionHandle::channel();
        world.join(id, conn).map(|_| ())
    }

    #[test]
    fn join_spawns_at_default_position() {
        let mut world = world();
        let (conn, _rx) = ConnectionHandle::channel();
        let player = world.join("c1", conn).unwrap();

        assert_eq!(player.connection_id(), "c1");
        assert_eq!(*player.entity().position(), Vector::xy(10.0, 10.0));
        assert_eq!(player.entity().hitbox_radius(), 10.0);
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut world = world();
        join(&mut world, "c1").unwrap();

        assert_eq!(
            join(&mut world, "c1"),
            Err(GameError::DuplicateConnection("c1".to_string()))
        );
        assert_eq!(world.len(), 1);
        assert_eq!(world.entries().count(), 1);
    }

    #[test]
    fn leave_unknown_is_noop() {
        let mut world = world();
        assert_ok!(join(&mut world, "c1"));
        assert_err!(join(&mut world, "c1"));

        assert!(!world.leave("unknown"));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn leave_frees_the_id() {
        let mut world = world();
        join(&mut world, "c1").unwrap();

        assert!(world.leave("c1"));
        assert!(world.is_empty());
        assert_eq!(world.entries().count(), 0);
        assert_ok!(join(&mut world, "c1"));
    }

    #[test]
    fn input_for_unknown_connection_is_dropped() {
        let mut world = world();
        join(&mut world, "c1").unwrap();

        world.apply_input(
            "ghost",
            &KeyboardState {
                right: true,
                ..KeyboardState::default()
            },
        );
        world.queue_force("ghost", Vector::xy(1.0, 1.0));

        assert_eq!(world.player("c1").unwrap().entity().velocity().x(), 0.0);
    }

    #[test]
    fn advance_clamps_to_world_bounds() {
        let mut world = world();
        join(&mut world, "c1").unwrap();
        world.apply_input(
            "c1",
            &KeyboardState {
                up: true,
                left: true,
                ..KeyboardState::default()
            },
        );

        let start = Instant::now();
        world.advance_players(start);
        let failed = world.advance_players(start + Duration::from_secs(1));

        assert!(failed.is_empty());
        let player = world.player("c1").unwrap();
        assert_eq!(*player.entity().position(), Vector::xy(0.0, 0.0));
        assert_eq!(player.entity().velocity().x(), -100.0);
    }

    #[test]
    fn advance_isolates_failing_player() {
        let mut world = world();
        join(&mut world, "bad").unwrap();
        join(&mut world, "good").unwrap();
        world.queue_force("bad", Vector::xyz(1.0, 1.0, 1.0));

        let now = Instant::now();
        let failed = world.advance_players(now);

        assert_eq!(failed.len(), 1);
        assert!(failed.contains("bad"));
        assert_eq!(world.player("good").unwrap().entity().last_update(), Some(now));
        assert_eq!(world.player("bad").unwrap().entity().last_update(), Some(now));
    }

    #[test]
    fn skipped_tick_is_not_integrated_later() {
        let mut world = world();
        join(&mut world, "c1").unwrap();
        world.apply_input(
            "c1",
            &KeyboardState {
                right: true,
                ..KeyboardState::default()
            },
        );

        let start = Instant::now();
        let step = Duration::from_millis(100);
        world.advance_players(start);
        world.queue_force("c1", Vector::xyz(1.0, 0.0, 0.0));
        assert!(world.advance_players(start + step).contains("c1"));
        assert_eq!(world.player("c1").unwrap().entity().position().x(), 10.0);

        assert!(world.advance_players(start + step * 2).is_empty());
        let player = world.player("c1").unwrap();
        assert_eq!(player.entity().elapsed(), step);
        assert!((player.entity().position().x() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn overlapping_spawns_collide() {
        let mut world = world();
        join(&mut world, "c1").unwrap();
        join(&mut world, "c2").unwrap();

        let pairs = world.collisions();
        assert_eq!(pairs.len(), 1);
        let (a, b) = &pairs[0];
        let mut ids = vec![a.as_str(), b.as_str()];
        ids.sort();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn collision_check_skips_mismatched_pairs() {
        let mut world = world();
        join(&mut world, "c1").unwrap();
        join(&mut world, "c2").unwrap();
        let odd = Player::new("odd", Vector::xyz(10.0, 10.0, 0.0), 10.0, 100.0).unwrap();
        world.players.insert("odd".to_string(), odd);

        let pairs = world.collisions();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.iter().all(|(a, b)| a != "odd" && b != "odd"));
    }

    #[test]
    fn for_each_player_visits_everyone_once() {
        let mut world = world();
        for id in ["a", "b", "c"] {
            join(&mut world, id).unwrap();
        }
        world.leave("b");

        let mut seen = Vec::new();
        world.for_each_player(|p| seen.push(p.connection_id().to_string()));
        seen.sort();
        assert_eq!(seen, vec!["a", "c"]);
    }
}
