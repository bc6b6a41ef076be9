//! Core shared types for `kart_vehicle`.
// kart_vehicle/types.rs
use std::fmt;

use rapier3d::prelude::{Real, Vector};
use serde::{Deserialize, Serialize};

use crate::error::{VehicleError, VehicleResult};

// ============================================
// Chassis axes
// ============================================

/// One of the three basis axes of the chassis' local frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis in the chassis' local frame.
    pub fn unit(self) -> Vector<Real> {
        Vector::ith(self.index(), 1.0)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{s}")
    }
}

/// Which local chassis axis is the lateral (right), up and forward axis.
///
/// These are basis indices, not signed directions: `right` only names the
/// lateral axis. With [`CoordinateSystem::Y_UP`] in a right-handed world the
/// driver's right-hand side is `-X` (`forward x up`), and positive steering
/// turns that way.
///
/// Serialized as `[right, up, forward]`; the three axes are always distinct.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[Axis; 3]", into = "[Axis; 3]")]
pub struct CoordinateSystem {
    right: Axis,
    up: Axis,
    forward: Axis,
}

impl CoordinateSystem {
    /// Lateral = X, up = Y, forward = Z (the basis order X x Y = Z).
    pub const Y_UP: Self = Self {
        right: Axis::X,
        up: Axis::Y,
        forward: Axis::Z,
    };

    pub fn new(right: Axis, up: Axis, forward: Axis) -> VehicleResult<Self> {
        if right == up || up == forward || right == forward {
            return Err(VehicleError::DuplicateAxis);
        }
        Ok(Self { right, up, forward })
    }

    pub fn right(&self) -> Axis {
        self.right
    }

    pub fn up(&self) -> Axis {
        self.up
    }

    pub fn forward(&self) -> Axis {
        self.forward
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::Y_UP
    }
}

impl TryFrom<[Axis; 3]> for CoordinateSystem {
    type Error = VehicleError;

    fn try_from([right, up, forward]: [Axis; 3]) -> Result<Self, Self::Error> {
        Self::new(right, up, forward)
    }
}

impl From<CoordinateSystem> for [Axis; 3] {
    fn from(cs: CoordinateSystem) -> Self {
        [cs.right, cs.up, cs.forward]
    }
}

// ============================================
// Per-step wheel state
// ============================================

/// Contact state of a wheel for the current step.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelContactState {
    #[default]
    Airborne,
    /// Grounded, impulses inside the friction circle.
    Grip,
    /// Grounded, impulses were cut back to the friction circle.
    Sliding,
}

impl WheelContactState {
    pub fn is_grounded(self) -> bool {
        !matches!(self, WheelContactState::Airborne)
    }
}

/// Friction information of the surface under a wheel.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct SurfaceMaterial {
    /// Multiplier on the wheel's friction slip.
    pub friction: Real,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self { friction: 1.0 }
    }
}
