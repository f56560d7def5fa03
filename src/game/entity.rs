//! Kinematic entity and its time-step integrator

use std::time::{Duration, Instant};

use super::vector::{Dimensions, Vector};
use super::GameError;

/// Mass used when none is given
pub const DEFAULT_MASS: f32 = 1.0;

/// A simulated physical body.
///
/// Position, velocity and acceleration always share the entity's
/// dimensionality. Acceleration is impulse-style: `update` consumes it and
/// resets it to zero, so forces must be re-applied every tick.
#[derive(Debug, Clone)]
pub struct Entity {
    position: Vector,
    velocity: Vector,
    acceleration: Vector,
    /// Orientation in radians
    pub orientation: f32,
    mass: f32,
    hitbox_radius: f32,
    /// `None` until the first `update`
    last_update: Option<Instant>,
    /// Step size used by the most recent `update`
    elapsed: Duration,
}

impl Entity {
    /// Create an entity at rest. Mass must be strictly positive; a negative
    /// hitbox radius is treated as zero.
    pub fn new(position: Vector, mass: f32, hitbox_radius: f32) -> Result<Self, GameError> {
        // Written so that NaN is rejected too
        if !(mass > 0.0) {
            return Err(GameError::InvalidMass(mass));
        }

        let dims = position.dims();
        Ok(Self {
            position,
            velocity: Vector::zero(dims),
            acceleration: Vector::zero(dims),
            orientation: 0.0,
            mass,
            hitbox_radius: hitbox_radius.max(0.0),
            last_update: None,
            elapsed: Duration::ZERO,
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.position.dims()
    }

    pub fn position(&self) -> &Vector {
        &self.position
    }

    pub fn velocity(&self) -> &Vector {
        &self.velocity
    }

    #[cfg(test)]
    pub fn acceleration(&self) -> &Vector {
        &self.acceleration
    }

    pub fn hitbox_radius(&self) -> f32 {
        self.hitbox_radius
    }

    #[cfg(test)]
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    #[cfg(test)]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[cfg(test)]
    pub fn set_position(&mut self, position: Vector) -> Result<(), GameError> {
        self.position.ensure_same_dims(&position)?;
        self.position = position;
        Ok(())
    }

    #[cfg(test)]
    pub fn set_velocity(&mut self, velocity: Vector) -> Result<(), GameError> {
        self.velocity.ensure_same_dims(&velocity)?;
        self.velocity = velocity;
        Ok(())
    }

    pub(crate) fn position_mut(&mut self) -> &mut Vector {
        &mut self.position
    }

    pub(crate) fn velocity_mut(&mut self) -> &mut Vector {
        &mut self.velocity
    }

    /// Add `force / mass` to the acceleration
    pub fn apply_force(&mut self, force: &Vector) -> Result<(), GameError> {
        self.acceleration.add_scaled(force, 1.0 / self.mass)
    }

    /// Advance one step.
    ///
    /// The step is `explicit_step` when given, zero on the very first update,
    /// and otherwise the time since the previous update. All rates are per
    /// second.
    pub fn update(&mut self, now: Instant, explicit_step: Option<Duration>) {
        let step = match (explicit_step, self.last_update) {
            (Some(step), _) => step,
            (None, None) => Duration::ZERO,
            (None, Some(last)) => now.saturating_duration_since(last),
        };
        let dt = step.as_secs_f32();

        let velocity = self.velocity;
        let acceleration = self.acceleration;
        for (p, v) in self.position.components_mut().iter_mut().zip(velocity.components()) {
            *p += v * dt;
        }
        for (v, a) in self.velocity.components_mut().iter_mut().zip(acceleration.components()) {
            *v += a * dt;
        }
        self.acceleration = Vector::zero(self.dims());

        self.elapsed = step;
        self.last_update = Some(now);
    }

    /// Mark `now` as the last update without moving. Pending acceleration
    /// is discarded.
    pub fn skip(&mut self, now: Instant) {
        self.acceleration = Vector::zero(self.dims());
        self.elapsed = Duration::ZERO;
        self.last_update = Some(now);
    }

    /// Closed-disk (or ball) overlap test: touching counts as collided
    pub fn is_collided_with(&self, other: &Entity) -> Result<bool, GameError> {
        let reach = self.hitbox_radius + other.hitbox_radius;
        let distance_sq = self.position.distance_squared(&other.position)?;
        Ok(distance_sq <= reach * reach)
    }
}
