//! Movement directives
//!
//! Rotation sign convention: positive degrees turn left, negative turn right.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::DeviceId;

/// Kind of movement a device is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Forward,
    Backward,
    Rotate,
}

impl MovementKind {
    /// Single-character wire code (`f`, `b`, `r`)
    pub fn code(&self) -> char {
        match self {
            Self::Forward => 'f',
            Self::Backward => 'b',
            Self::Rotate => 'r',
        }
    }

    /// Parse a wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "f" => Some(Self::Forward),
            "b" => Some(Self::Backward),
            "r" => Some(Self::Rotate),
            _ => None,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
            Self::Rotate => write!(f, "rotate"),
        }
    }
}

/// An accepted movement directive awaiting dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementCommand {
    /// Target device (not checked against the registry at enqueue time)
    pub target_id: DeviceId,

    pub kind: MovementKind,

    /// Start of the intended active window
    pub start_ms: Option<f64>,

    /// End of the intended active window
    pub end_ms: Option<f64>,

    /// Signed rotation, positive = left
    pub rotation_degrees: f64,
}

impl MovementCommand {
    /// Create a command with no active window and no rotation
    pub fn new(target_id: DeviceId, kind: MovementKind) -> Self {
        Self {
            target_id,
            kind,
            start_ms: None,
            end_ms: None,
            rotation_degrees: 0.0,
        }
    }

    /// Set the active window
    pub fn with_window(mut self, start_ms: f64, end_ms: f64) -> Self {
        self.start_ms = Some(start_ms);
        self.end_ms = Some(end_ms);
        self
    }

    /// Set the rotation in degrees
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    /// Integer magnitude sent on the wire
    ///
    /// Rotations send whole degrees. Forward and backward send the length
    /// of the active window, or 0 when either bound is missing.
    pub fn magnitude(&self) -> i64 {
        let raw = match self.kind {
            MovementKind::Rotate => self.rotation_degrees,
            MovementKind::Forward | MovementKind::Backward => match (self.start_ms, self.end_ms) {
                (Some(start), Some(end)) => end - start,
                _ => 0.0,
            },
        };

        if raw.is_finite() {
            raw.round() as i64
        } else {
            0
        }
    }
}

/// Body of `POST /mov`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub id: i64,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub rot: Option<f64>,
    pub mov: String,
}
