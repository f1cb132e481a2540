use crate::coords::rotate;
use crate::family::{Family, Identity};
use crate::optimizer::optimize;
use padlight_domain_signal::{Color, PadUpdate, Snapshot};
use padlight_ports::midi::{SYSEX_END, SYSEX_START};
use padlight_ports::types::{PadIndex, Rotation, GRID_SIZE, MODE_LIGHT};

/// One update after rotation, filtering and remapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WireUpdate {
    wire: u8,
    color: Color,
}

/// Turns update batches into wire messages for one identified device.
#[derive(Clone, Copy, Debug)]
pub struct Framer {
    identity: Identity,
    rotation: Rotation,
}

impl Framer {
    pub fn new(identity: Identity, rotation: Rotation) -> Self {
        Self { identity, rotation }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Frame one flush. `snapshot` is the screen state after the flush and
    /// enables the full-grid form for large batches.
    pub fn frame(&self, batch: &[PadUpdate], snapshot: Option<&Snapshot>) -> Vec<Vec<u8>> {
        let family = self.identity.family;
        if family == Family::Unknown || batch.is_empty() {
            return Vec::new();
        }

        let rotated: Vec<PadUpdate> = batch
            .iter()
            .map(|update| PadUpdate::new(rotate(update.index, self.rotation), update.color))
            .collect();

        if self.identity.compression {
            match optimize(&self.identity, &rotated) {
                Ok(Some(message)) => return vec![message],
                Ok(None) => return Vec::new(),
                Err(err) => {
                    tracing::debug!(family = %family, error = %err, "compression skipped");
                }
            }
        }

        let wire = self.remap(&rotated);
        if wire.is_empty() {
            return Vec::new();
        }

        let max = family.max_repeats();
        if wire.len() <= max {
            return vec![self.rgb_message(&wire)];
        }

        if let (Some(snapshot), Some(header)) = (snapshot, family.full_grid_header()) {
            let mut messages = vec![self.full_grid_message(&header, snapshot)];
            if let Some(target) = family.wire_target(MODE_LIGHT) {
                messages.push(self.rgb_message(&[WireUpdate {
                    wire: target.primary,
                    color: snapshot[MODE_LIGHT as usize],
                }]));
            }
            return messages;
        }

        wire.chunks(max)
            .map(|chunk| self.rgb_message(chunk))
            .collect()
    }

    fn remap(&self, rotated: &[PadUpdate]) -> Vec<WireUpdate> {
        let family = self.identity.family;
        let mut out = Vec::with_capacity(rotated.len());
        for update in rotated {
            let Some(target) = family.wire_target(update.index) else {
                continue;
            };
            for wire in std::iter::once(target.primary).chain(target.mirror) {
                out.push(WireUpdate {
                    wire,
                    color: update.color,
                });
            }
        }
        out
    }

    fn rgb_message(&self, updates: &[WireUpdate]) -> Vec<u8> {
        let family = self.identity.family;
        let header = family.rgb_header();
        let prefix = family.update_prefix();
        let scale = family.channel_scale();

        let per_update = 4 + usize::from(prefix.is_some());
        let mut message = Vec::with_capacity(header.len() + 2 + updates.len() * per_update);
        message.push(SYSEX_START);
        message.extend_from_slice(&header);
        for update in updates {
            message.extend(prefix);
            message.push(update.wire);
            message.extend_from_slice(&update.color.scaled(scale));
        }
        message.push(SYSEX_END);
        message
    }

    /// Full-grid form: 100 triples in wire order, each read from the logical
    /// pad that rotates onto that position. The mode light keeps its own
    /// wire slot and is never rotated.
    fn full_grid_message(&self, header: &[u8], snapshot: &Snapshot) -> Vec<u8> {
        let scale = self.identity.family.channel_scale();
        let mut grid = [Color::BLACK; GRID_SIZE];
        for logical in 0..GRID_SIZE as PadIndex {
            grid[rotate(logical, self.rotation) as usize] = snapshot[logical as usize];
        }
        if let Some(target) = self.identity.family.wire_target(MODE_LIGHT) {
            if let Some(slot) = grid.get_mut(usize::from(target.primary)) {
                *slot = snapshot[MODE_LIGHT as usize];
            }
        }

        let mut message = Vec::with_capacity(header.len() + 2 + GRID_SIZE * 3);
        message.push(SYSEX_START);
        message.extend_from_slice(header);
        for color in &grid {
            message.extend_from_slice(&color.scaled(scale));
        }
        message.push(SYSEX_END);
        message
    }
}
