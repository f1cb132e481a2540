use crate::coords::{drum_rack_to_xy, unrotate};
use crate::family::Family;
use padlight_ports::types::{InputFormat, PadIndex, Rotation};
use serde::{Deserialize, Serialize};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;

/// CC that asks the host to clear all devices.
const RESET_CC: u8 = 121;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InputEvent {
    /// Velocity 0 means release.
    Pad { index: PadIndex, velocity: u8 },
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Note,
    Control,
}

/// Decode one short message from a device into a logical pad event.
pub fn decode_input(
    family: Family,
    format: InputFormat,
    rotation: Rotation,
    bytes: &[u8],
) -> Option<InputEvent> {
    let &[status, data, value] = bytes else {
        return None;
    };
    let (kind, velocity) = match status & 0xF0 {
        NOTE_ON => (Kind::Note, value),
        NOTE_OFF => (Kind::Note, 0),
        CONTROL_CHANGE => (Kind::Control, value),
        _ => return None,
    };

    if kind == Kind::Control
        && data == RESET_CC
        && matches!(family, Family::Cfw | Family::MatrixPro)
    {
        return Some(InputEvent::Reset);
    }

    let index = logical_index(family, format, kind, data)?;
    if family.is_forbidden(index) {
        return None;
    }
    Some(InputEvent::Pad {
        index: unrotate(index, rotation),
        velocity,
    })
}

fn logical_index(family: Family, format: InputFormat, kind: Kind, data: u8) -> Option<PadIndex> {
    match family {
        Family::Mk2 => match kind {
            Kind::Control if (104..=111).contains(&data) => Some(data - 13),
            Kind::Control => None,
            Kind::Note => Some(data),
        },
        Family::ProMk3 if (101..=108).contains(&data) => Some(data - 100),
        Family::Pro | Family::Cfw | Family::X | Family::MiniMk3 | Family::ProMk3 => {
            match (kind, format) {
                (Kind::Note, InputFormat::DrumRack) => drum_rack_to_xy(data),
                _ => Some(data),
            }
        }
        Family::Mf64 => match kind {
            Kind::Note => drum_rack_to_xy(data),
            Kind::Control => None,
        },
        Family::MatrixFe | Family::MatrixPro => Some(data),
        Family::Unknown => None,
    }
}
