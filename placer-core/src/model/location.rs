//! Machine coordinates
//!
//! All lengths are in millimetres, rotations in degrees.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in machine space with a rotation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotation: f64,
}

impl Location {
    pub const ORIGIN: Location = Location::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64, rotation: f64) -> Self {
        Self { x, y, z, rotation }
    }

    /// Location on the XY plane with no height or rotation
    pub const fn xy(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Component-wise sum, rotation included
    pub fn add(&self, other: &Location) -> Location {
        Location::new(
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
            self.rotation + other.rotation,
        )
    }

    /// Component-wise difference, rotation included
    pub fn subtract(&self, other: &Location) -> Location {
        Location::new(
            self.x - other.x,
            self.y - other.y,
            self.z - other.z,
            self.rotation - other.rotation,
        )
    }

    pub fn scale(&self, factor: f64) -> Location {
        Location::new(
            self.x * factor,
            self.y * factor,
            self.z * factor,
            self.rotation * factor,
        )
    }

    pub fn with_rotation(&self, rotation: f64) -> Location {
        Location { rotation, ..*self }
    }

    pub fn with_z(&self, z: f64) -> Location {
        Location { z, ..*self }
    }

    /// Planar distance, ignoring Z and rotation
    pub fn distance_xy(&self, other: &Location) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate the XY point about the origin; Z and rotation are kept
    pub fn rotate_xy(&self, degrees: f64) -> Location {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Location {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
            ..*self
        }
    }

    /// Rotate the XY point about `center`; Z and rotation are kept
    pub fn rotate_xy_about(&self, center: &Location, degrees: f64) -> Location {
        let relative = Location::xy(self.x - center.x, self.y - center.y).rotate_xy(degrees);
        Location {
            x: relative.x + center.x,
            y: relative.y + center.y,
            ..*self
        }
    }

    /// Subtract `offset` after rotating its XY into this location's frame
    pub fn subtract_with_rotation(&self, offset: &Location) -> Location {
        let rotated = offset.rotate_xy(self.rotation);
        Location::new(
            self.x - rotated.x,
            self.y - rotated.y,
            self.z - offset.z,
            self.rotation - offset.rotation,
        )
    }

    /// Check if two locations match within `tolerance` on every axis
    pub fn approx_eq(&self, other: &Location, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
            && (self.rotation - other.rotation).abs() <= tolerance
    }
}
