//! Player: an entity with a connection identity

use std::time::Instant;

use super::entity::{Entity, DEFAULT_MASS};
use super::vector::Vector;
use super::{GameError, KeyboardState};

/// A connected participant. Owns its entity and the forces queued for the
/// next tick.
#[derive(Debug, Clone)]
pub struct Player {
    connection_id: String,
    entity: Entity,
    speed: f32,
    pending_forces: Vec<Vector>,
}

impl Player {
    pub fn new(
        connection_id: impl Into<String>,
        spawn: Vector,
        hitbox_radius: f32,
        speed: f32,
    ) -> Result<Self, GameError> {
        Ok(Self {
            connection_id: connection_id.into(),
            entity: Entity::new(spawn, DEFAULT_MASS, hitbox_radius)?,
            speed,
            pending_forces: Vec::new(),
        })
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    /// Map directional keys onto planar velocity. Opposite keys cancel.
    pub fn update_on_input(&mut self, keys: &KeyboardState) {
        let speed = self.speed;
        let axis = |neg: bool, pos: bool| speed * (f32::from(u8::from(pos)) - f32::from(u8::from(neg)));
        let vx = axis(keys.left, keys.right);
        let vy = axis(keys.up, keys.down);

        let velocity = self.entity.velocity_mut();
        velocity.set_x(vx);
        velocity.set_y(vy);
    }

    /// Queue a force to be applied at the start of the next tick
    pub fn queue_force(&mut self, force: Vector) {
        self.pending_forces.push(force);
    }

    #[cfg(test)]
    pub fn pending_forces(&self) -> usize {
        self.pending_forces.len()
    }

    pub fn update(&mut self, now: Instant) {
        self.entity.update(now, None);
    }

    /// Apply queued forces, then integrate.
    ///
    /// Forces are all checked before any is applied. On a mismatch the queue
    /// is discarded and the entity is left as it was.
    pub fn advance(&mut self, now: Instant) -> Result<(), GameError> {
        let forces = std::mem::take(&mut self.pending_forces);
        for force in &forces {
            self.entity.position().ensure_same_dims(force)?;
        }
        for force in &forces {
            self.entity.apply_force(force)?;
        }
        self.update(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SPEED: f32 = 100.0;

    fn player() -> Player {
        Player::new("c1", Vector::xy(10.0, 10.0), 10.0, SPEED).unwrap()
    }

    fn keys(up: bool, down: bool, left: bool, right: bool) -> KeyboardState {
        KeyboardState {
            up,
            down,
            left,
            right,
        }
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut p = player();
        p.update_on_input(&keys(true, true, false, false));
        assert_eq!(p.entity().velocity().y(), 0.0);
        assert_eq!(p.entity().velocity().x(), 0.0);
    }

    #[test]
    fn up_right_maps_to_screen_axes() {
        let mut p = player();
        p.update_on_input(&keys(true, false, false, true));
        assert_eq!(p.entity().velocity().y(), -SPEED);
        assert_eq!(p.entity().velocity().x(), SPEED);
    }

    #[test]
    fn input_keeps_z_velocity() {
        let mut p = Player::new("c3", Vector::xyz(0.0, 0.0, 0.0), 1.0, SPEED).unwrap();
        p.entity_mut()
            .set_velocity(Vector::xyz(0.0, 0.0, 7.0))
            .unwrap();
        p.update_on_input(&keys(false, true, true, false));
        assert_eq!(*p.entity().velocity(), Vector::xyz(-SPEED, SPEED, 7.0));
    }

    #[test]
    fn advance_applies_queued_forces() {
        let mut p = player();
        let start = Instant::now();
        p.advance(start).unwrap();

        p.queue_force(Vector::xy(60.0, 0.0));
        p.advance(start + Duration::from_millis(500)).unwrap();

        assert_eq!(p.pending_forces(), 0);
        assert!((p.entity().velocity().x() - 30.0).abs() < 1e-4);
        assert!(p.entity().acceleration().is_zero());
    }

    #[test]
    fn advance_rejects_mismatched_force_without_integrating() {
        let mut p = player();
        let start = Instant::now();
        p.advance(start).unwrap();
        p.update_on_input(&keys(false, false, false, true));

        p.queue_force(Vector::xy(1.0, 0.0));
        p.queue_force(Vector::xyz(1.0, 0.0, 0.0));
        let result = p.advance(start + Duration::from_secs(1));

        assert!(matches!(result, Err(GameError::DimensionMismatch { .. })));
        assert_eq!(p.pending_forces(), 0);
        assert_eq!(p.entity().position().x(), 10.0);
        assert!(p.entity().acceleration().is_zero());
    }
}
