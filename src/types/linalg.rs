//! Linear algebra aliases for the tilt pipeline
//!
//! The whole pipeline works on a single 3-vector: the (filtered) gravity
//! reading in device coordinates.

use nalgebra::Vector3;

/// Axis index into a device-frame vector
pub const AXIS_X: usize = 0;
pub const AXIS_Y: usize = 1;
pub const AXIS_Z: usize = 2;

/// Gravity vector in device coordinates (m/s²)
pub type GravityVec = Vector3<f64>;
