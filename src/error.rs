//! Error types for vehicle construction and configuration.

use std::fmt;

/// Errors raised while building or configuring a kart vehicle.
///
/// Per-step conditions such as a wheel losing ground contact are ordinary
/// data and never show up here.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleError {
    /// A wheel description failed validation in `add_wheel`.
    InvalidWheel {
        field: &'static str,
        reason: &'static str,
    },
    /// A wheel tuning value failed validation.
    InvalidTuning {
        field: &'static str,
        reason: &'static str,
    },
    /// The coordinate system names the same axis twice.
    DuplicateAxis,
    /// Wheels can only be added before the vehicle's first step.
    WheelsLocked,
    /// The chassis handle no longer resolves to a rigid body.
    ChassisMissing,
    /// Kart properties could not be parsed.
    Config { detail: String },
}

impl fmt::Display for VehicleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWheel { field, reason } => {
                write!(f, "invalid wheel {field}: {reason}")
            }
            Self::InvalidTuning { field, reason } => {
                write!(f, "invalid wheel tuning {field}: {reason}")
            }
            Self::DuplicateAxis => {
                write!(f, "coordinate system axes must be distinct")
            }
            Self::WheelsLocked => {
                write!(f, "wheels cannot be added once the vehicle has stepped")
            }
            Self::ChassisMissing => {
                write!(f, "chassis rigid body is no longer part of the world")
            }
            Self::Config { detail } => write!(f, "invalid kart properties: {detail}"),
        }
    }
}

impl std::error::Error for VehicleError {}

impl From<serde_json::Error> for VehicleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            detail: err.to_string(),
        }
    }
}

/// Result type for vehicle operations.
pub type VehicleResult<T> = Result<T, VehicleError>;
