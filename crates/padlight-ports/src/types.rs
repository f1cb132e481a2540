use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical pad index: `row * 10 + col` for the 10x10 grid, 100 = mode light.
pub type PadIndex = u8;

pub const GRID_SIZE: usize = 100;
pub const PAD_COUNT: usize = 101;
pub const MODE_LIGHT: PadIndex = 100;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    D0,
    D90,
    D180,
    D270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::D0 => 0,
            Rotation::D90 => 90,
            Rotation::D180 => 180,
            Rotation::D270 => 270,
        }
    }

    /// Rotation that undoes this one (360 - R).
    pub fn inverse(self) -> Self {
        match self {
            Rotation::D0 => Rotation::D0,
            Rotation::D90 => Rotation::D270,
            Rotation::D180 => Rotation::D180,
            Rotation::D270 => Rotation::D90,
        }
    }
}

/// How a device lays out its note numbers for pad presses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InputFormat {
    #[default]
    Xy,
    DrumRack,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiPortInfo {
    pub id: DeviceId,
    pub name: String,
    pub is_available: bool,
}

impl DeviceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
