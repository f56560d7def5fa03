//! Fixed-arity vectors for 2D and 3D worlds

use super::GameError;

/// Declared dimensionality of a world or entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensions {
    #[default]
    Two,
    Three,
}

impl Dimensions {
    /// Number of components a vector of this dimensionality carries
    pub fn arity(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    pub fn from_arity(arity: usize) -> Option<Self> {
        match arity {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }
}

/// A position, velocity, acceleration or force.
///
/// Storage is always three wide; components past the declared arity stay
/// zero and are never read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    dims: Dimensions,
    coords: [f32; 3],
}

impl Vector {
    pub fn zero(dims: Dimensions) -> Self {
        Self {
            dims,
            coords: [0.0; 3],
        }
    }

    pub fn xy(x: f32, y: f32) -> Self {
        Self {
            dims: Dimensions::Two,
            coords: [x, y, 0.0],
        }
    }

    #[cfg(test)]
    pub fn xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            dims: Dimensions::Three,
            coords: [x, y, z],
        }
    }

    /// Build from a component slice of length 2 or 3
    pub fn from_slice(components: &[f32]) -> Option<Self> {
        let dims = Dimensions::from_arity(components.len())?;
        let mut coords = [0.0; 3];
        coords[..components.len()].copy_from_slice(components);
        Some(Self { dims, coords })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn components(&self) -> &[f32] {
        &self.coords[..self.dims.arity()]
    }

    pub(crate) fn components_mut(&mut self) -> &mut [f32] {
        let arity = self.dims.arity();
        &mut self.coords[..arity]
    }

    pub fn x(&self) -> f32 {
        self.coords[0]
    }

    pub fn y(&self) -> f32 {
        self.coords[1]
    }

    /// Z component, `None` for planar vectors
    pub fn z(&self) -> Option<f32> {
        match self.dims {
            Dimensions::Two => None,
            Dimensions::Three => Some(self.coords[2]),
        }
    }

    pub fn set_x(&mut self, x: f32) {
        self.coords[0] = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.coords[1] = y;
    }

    /// Returns the same vector re-declared with `dims`, padding or truncating
    /// trailing components with zero
    pub fn with_dims(mut self, dims: Dimensions) -> Self {
        if dims == Dimensions::Two {
            self.coords[2] = 0.0;
        }
        self.dims = dims;
        self
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.components().iter().all(|c| *c == 0.0)
    }

    /// Fails with `DimensionMismatch` unless `other` has the same arity
    pub fn ensure_same_dims(&self, other: &Vector) -> Result<(), GameError> {
        if self.dims == other.dims {
            Ok(())
        } else {
            Err(GameError::DimensionMismatch {
                expected: self.dims.arity(),
                found: other.dims.arity(),
            })
        }
    }

    /// `self += other * scale`, component-wise
    pub fn add_scaled(&mut self, other: &Vector, scale: f32) -> Result<(), GameError> {
        self.ensure_same_dims(other)?;
        for (c, o) in self.components_mut().iter_mut().zip(other.coords) {
            *c += o * scale;
        }
        Ok(())
    }

    pub fn distance_squared(&self, other: &Vector) -> Result<f32, GameError> {
        self.ensure_same_dims(other)?;
        Ok(self
            .components()
            .iter()
            .zip(other.components())
            .map(|(a, b)| (a - b) * (a - b))
            .sum())
    }

    #[cfg(test)]
    pub fn manhattan_distance(&self, other: &Vector) -> Result<f32, GameError> {
        self.ensure_same_dims(other)?;
        Ok(self
            .components()
            .iter()
            .zip(other.components())
            .map(|(a, b)| (a - b).abs())
            .sum())
    }

    /// Clamp every component into `[min, max]` (bounds may be given in either order)
    pub fn clamp_each(&mut self, min: f32, max: f32) {
        for c in self.components_mut() {
            *c = bound(*c, min, max);
        }
    }

    /// True when every component lies within `center ± half_extents`, inclusive
    pub fn within(&self, center: &Vector, half_extents: &Vector) -> Result<bool, GameError> {
        self.ensure_same_dims(center)?;
        self.ensure_same_dims(half_extents)?;
        Ok(self
            .components()
            .iter()
            .zip(center.components())
            .zip(half_extents.components())
            .all(|((v, c), h)| in_bound(*v, c - h, c + h)))
    }
}

/// Inclusive range check that tolerates swapped bounds
pub fn in_bound(value: f32, min: f32, max: f32) -> bool {
    if min > max {
        value >= max && value <= min
    } else {
        value >= min && value <= max
    }
}

/// Clamp that tolerates swapped bounds
pub fn bound(value: f32, min: f32, max: f32) -> f32 {
    if min > max {
        value.max(max).min(min)
    } else {
        value.max(min).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_bad_arity() {
        assert!(Vector::from_slice(&[1.0]).is_none());
        assert!(Vector::from_slice(&[1.0, 2.0, 3.0, 4.0]).is_none());
        assert_eq!(Vector::from_slice(&[1.0, 2.0]), Some(Vector::xy(1.0, 2.0)));
        assert_eq!(Vector::from_slice(&[1.0, 2.0, 3.0]).map(|v| v.z()), Some(Some(3.0)));
        assert_eq!(Vector::zero(Dimensions::default()), Vector::xy(0.0, 0.0));
    }

    #[test]
    fn mixed_arity_arithmetic_fails() {
        let mut planar = Vector::xy(1.0, 1.0);
        let spatial = Vector::xyz(1.0, 1.0, 1.0);

        assert_eq!(
            planar.add_scaled(&spatial, 1.0),
            Err(GameError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        assert!(planar.distance_squared(&spatial).is_err());
        assert_eq!(planar, Vector::xy(1.0, 1.0));
    }

    #[test]
    fn distances() {
        let a = Vector::xyz(0.0, 0.0, 0.0);
        let b = Vector::xyz(1.0, -2.0, 2.0);
        assert_eq!(a.distance_squared(&b), Ok(9.0));
        assert_eq!(a.manhattan_distance(&b), Ok(5.0));
    }

    #[test]
    fn bounds_accept_swapped_limits() {
        assert!(in_bound(5.0, 10.0, 0.0));
        assert!(in_bound(0.0, 0.0, 10.0));
        assert!(!in_bound(-0.1, 0.0, 10.0));
        assert_eq!(bound(12.0, 10.0, 0.0), 10.0);
        assert_eq!(bound(-3.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn within_is_inclusive() {
        let center = Vector::xy(100.0, 100.0);
        let extents = Vector::xy(50.0, 20.0);
        assert_eq!(Vector::xy(150.0, 80.0).within(&center, &extents), Ok(true));
        assert_eq!(Vector::xy(150.1, 100.0).within(&center, &extents), Ok(false));
    }
}
