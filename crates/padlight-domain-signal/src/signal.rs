use crate::color::Color;
use padlight_ports::types::{DeviceId, PadIndex, MODE_LIGHT};
use serde::{Deserialize, Serialize};

pub const MIN_BLENDING_RANGE: u8 = 1;
pub const MAX_BLENDING_RANGE: u8 = 200;
pub const MACRO_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendingMode {
    /// Opaque: nothing below shows through.
    #[default]
    Normal,
    /// Light-additive: keeps compositing downwards.
    Screen,
    /// Darkens the next visible layer within range.
    Multiply,
    /// Hides everything below regardless of colour.
    Mask,
}

/// Macro values carried along with a signal, each 1..=100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Macros([u8; MACRO_COUNT]);

impl Macros {
    pub fn new(values: [u8; MACRO_COUNT]) -> Self {
        let mut macros = Self::default();
        for (slot, value) in values.into_iter().enumerate() {
            macros.set(slot, value);
        }
        macros
    }

    pub fn get(&self, slot: usize) -> u8 {
        self.0.get(slot).copied().unwrap_or(1)
    }

    pub fn set(&mut self, slot: usize, value: u8) {
        if let Some(target) = self.0.get_mut(slot) {
            if (1..=100).contains(&value) {
                *target = value;
            }
        }
    }

    pub fn values(&self) -> [u8; MACRO_COUNT] {
        self.0
    }
}

impl Default for Macros {
    fn default() -> Self {
        Self([1; MACRO_COUNT])
    }
}

/// One contributor to a pad's final colour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub source: Option<DeviceId>,
    index: PadIndex,
    pub color: Color,
    pub layer: i32,
    pub blending: BlendingMode,
    blending_range: u8,
    pub macros: Macros,
    /// Addressing stack for multi-device routing. Owned per signal.
    pub multi_target: Vec<u32>,
    pub delay_ms: u32,
}

impl Signal {
    pub fn new(index: PadIndex, color: Color) -> Self {
        Self {
            source: None,
            index: index.min(MODE_LIGHT),
            color,
            layer: 0,
            blending: BlendingMode::Normal,
            blending_range: MAX_BLENDING_RANGE,
            macros: Macros::default(),
            multi_target: Vec::new(),
            delay_ms: 0,
        }
    }

    pub fn from_source(source: DeviceId, index: PadIndex, color: Color) -> Self {
        Self {
            source: Some(source),
            ..Self::new(index, color)
        }
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_blending(mut self, blending: BlendingMode, range: u8) -> Self {
        self.blending = blending;
        self.set_blending_range(range);
        self
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn index(&self) -> PadIndex {
        self.index
    }

    pub fn set_index(&mut self, index: PadIndex) {
        if index <= MODE_LIGHT {
            self.index = index;
        }
    }

    pub fn blending_range(&self) -> u8 {
        self.blending_range
    }

    pub fn set_blending_range(&mut self, range: u8) {
        self.blending_range = range.clamp(MIN_BLENDING_RANGE, MAX_BLENDING_RANGE);
    }

    /// Storage key inside a pixel stack: ascending key = descending priority.
    pub fn layer_key(&self) -> i64 {
        -(self.layer as i64)
    }

    pub fn is_lit(&self) -> bool {
        self.color.is_lit()
    }
}
