use padlight_ports::types::{PadIndex, Rotation, GRID_SIZE};

/// Rotate a logical grid index. The mode light (100) is never rotated.
pub fn rotate(index: PadIndex, rotation: Rotation) -> PadIndex {
    if index as usize >= GRID_SIZE {
        return index;
    }
    let (row, col) = (index / 10, index % 10);
    match rotation {
        Rotation::D0 => index,
        Rotation::D90 => col * 10 + 9 - row,
        Rotation::D180 => 99 - index,
        Rotation::D270 => (9 - col) * 10 + row,
    }
}

pub fn unrotate(index: PadIndex, rotation: Rotation) -> PadIndex {
    rotate(index, rotation.inverse())
}

const DRUM_LEFT_BASE: u8 = 36;
const DRUM_RIGHT_BASE: u8 = 68;
const DRUM_RIGHT_COLUMN: u8 = 100;
const DRUM_LEFT_COLUMN: u8 = 108;
const DRUM_BOTTOM_ROW: u8 = 116;

/// Logical index → drum-rack note. Top row and corners have no note.
pub fn xy_to_drum_rack(index: PadIndex) -> Option<u8> {
    if index as usize >= GRID_SIZE {
        return None;
    }
    let (row, col) = (index / 10, index % 10);
    match (row, col) {
        (1..=8, 1..=4) => Some(DRUM_LEFT_BASE + (row - 1) * 4 + (col - 1)),
        (1..=8, 5..=8) => Some(DRUM_RIGHT_BASE + (row - 1) * 4 + (col - 5)),
        (1..=8, 9) => Some(DRUM_RIGHT_COLUMN + row - 1),
        (1..=8, 0) => Some(DRUM_LEFT_COLUMN + row - 1),
        (0, 1..=8) => Some(DRUM_BOTTOM_ROW + col - 1),
        _ => None,
    }
}

pub fn drum_rack_to_xy(note: u8) -> Option<PadIndex> {
    match note {
        36..=67 => {
            let k = note - DRUM_LEFT_BASE;
            Some((k / 4 + 1) * 10 + k % 4 + 1)
        }
        68..=99 => {
            let k = note - DRUM_RIGHT_BASE;
            Some((k / 4 + 1) * 10 + k % 4 + 5)
        }
        100..=107 => Some((note - DRUM_RIGHT_COLUMN + 1) * 10 + 9),
        108..=115 => Some((note - DRUM_LEFT_COLUMN + 1) * 10),
        116..=123 => Some(note - DRUM_BOTTOM_ROW + 1),
        _ => None,
    }
}
