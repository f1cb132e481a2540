use crate::color::Color;
use crate::pixel::Pixel;
use crate::signal::Signal;
use padlight_ports::types::{PadIndex, PAD_COUNT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One entry of an update batch: a pad and its new resultant colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PadUpdate {
    pub index: PadIndex,
    pub color: Color,
}

impl PadUpdate {
    pub fn new(index: PadIndex, color: Color) -> Self {
        Self { index, color }
    }
}

pub type UpdateBatch = Vec<PadUpdate>;

pub type Snapshot = [Color; PAD_COUNT];

#[derive(Debug)]
struct PadState {
    pixel: Pixel,
    shown: Color,
    dirty: bool,
}

impl PadState {
    fn new(index: u8) -> Self {
        Self {
            pixel: Pixel::new(index),
            shown: Color::BLACK,
            dirty: false,
        }
    }
}

/// All 101 pads of one device, each behind its own lock.
#[derive(Debug)]
pub struct Screen {
    pads: Vec<Mutex<PadState>>,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            pads: (0..PAD_COUNT)
                .map(|index| Mutex::new(PadState::new(index as u8)))
                .collect(),
        }
    }

    /// File a signal into its pad's stack. Recompute happens on `flush`.
    pub fn enter(&self, signal: &Signal) {
        let Some(pad) = self.pads.get(signal.index() as usize) else {
            return;
        };
        let mut pad = pad.lock();
        if pad.pixel.enter(signal) {
            pad.dirty = true;
        }
    }

    /// Recompute every dirty pad and return the pads whose colour changed.
    pub fn flush(&self) -> UpdateBatch {
        let mut batch = Vec::new();
        for (index, pad) in self.pads.iter().enumerate() {
            let mut pad = pad.lock();
            if !pad.dirty {
                continue;
            }
            pad.dirty = false;

            let color = pad.pixel.color();
            if color != pad.shown {
                pad.shown = color;
                batch.push(PadUpdate::new(index as PadIndex, color));
            }
        }
        batch
    }

    /// Reset every pad to the all-off state, including the snapshot.
    pub fn clear(&self) {
        for pad in &self.pads {
            let mut pad = pad.lock();
            pad.pixel.clear();
            pad.shown = Color::BLACK;
            pad.dirty = false;
        }
    }

    pub fn color(&self, index: PadIndex) -> Option<Color> {
        self.pads.get(index as usize).map(|pad| pad.lock().shown)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = [Color::BLACK; PAD_COUNT];
        for (slot, pad) in snapshot.iter_mut().zip(&self.pads) {
            *slot = pad.lock().shown;
        }
        snapshot
    }

    pub fn layer_count(&self, index: PadIndex) -> usize {
        self.pads
            .get(index as usize)
            .map(|pad| pad.lock().pixel.len())
            .unwrap_or(0)
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}
