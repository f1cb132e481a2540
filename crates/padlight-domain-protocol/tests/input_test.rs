use padlight_domain_protocol::{decode_input, Family, InputEvent};
use padlight_ports::types::{InputFormat, Rotation};
use pretty_assertions::assert_eq;

fn decode(family: Family, bytes: &[u8]) -> Option<InputEvent> {
    decode_input(family, InputFormat::Xy, Rotation::D0, bytes)
}

fn pad(index: u8, velocity: u8) -> Option<InputEvent> {
    Some(InputEvent::Pad { index, velocity })
}

#[test]
fn note_on_off_and_zero_velocity() {
    assert_eq!(decode(Family::Pro, &[0x90, 11, 100]), pad(11, 100));
    assert_eq!(decode(Family::Pro, &[0x90, 11, 0]), pad(11, 0));
    assert_eq!(decode(Family::Pro, &[0x80, 11, 64]), pad(11, 0));
    assert_eq!(decode(Family::Pro, &[0x95, 11, 7]), pad(11, 7));
}

#[test]
fn other_messages_are_ignored() {
    assert_eq!(decode(Family::Pro, &[0xC0, 11]), None);
    assert_eq!(decode(Family::Pro, &[0xE0, 11, 5]), None);
    assert_eq!(decode(Family::Pro, &[0xF0, 0x7E, 0xF7]), None);
    assert_eq!(decode(Family::Unknown, &[0x90, 11, 5]), None);
}

#[test]
fn mk2_top_row_arrives_as_control_change() {
    assert_eq!(decode(Family::Mk2, &[0xB0, 104, 127]), pad(91, 127));
    assert_eq!(decode(Family::Mk2, &[0xB0, 111, 127]), pad(98, 127));
    assert_eq!(decode(Family::Mk2, &[0xB0, 50, 127]), None);
}

#[test]
fn control_changes_map_to_grid_positions() {
    assert_eq!(decode(Family::X, &[0xB0, 95, 127]), pad(95, 127));
    assert_eq!(decode(Family::Pro, &[0xB0, 10, 127]), pad(10, 127));
    assert_eq!(decode(Family::ProMk3, &[0xB0, 101, 127]), pad(1, 127));
    assert_eq!(decode(Family::ProMk3, &[0x90, 108, 127]), pad(8, 127));
}

#[test]
fn drum_rack_format_applies_to_notes() {
    let event = decode_input(Family::X, InputFormat::DrumRack, Rotation::D0, &[0x90, 36, 90]);
    assert_eq!(event, pad(11, 90));
    // CC still uses the grid layout.
    let event = decode_input(Family::X, InputFormat::DrumRack, Rotation::D0, &[0xB0, 19, 90]);
    assert_eq!(event, pad(19, 90));
}

#[test]
fn midi_fighter_always_uses_drum_rack_notes() {
    assert_eq!(decode(Family::Mf64, &[0x92, 36, 127]), pad(11, 127));
    assert_eq!(decode(Family::Mf64, &[0x92, 99, 127]), pad(88, 127));
    assert_eq!(decode(Family::Mf64, &[0x92, 100, 127]), None);
}

#[test]
fn reset_is_only_understood_by_some_families() {
    assert_eq!(decode(Family::Cfw, &[0xB0, 121, 127]), Some(InputEvent::Reset));
    assert_eq!(decode(Family::MatrixPro, &[0xB0, 121, 0]), Some(InputEvent::Reset));
    assert_eq!(decode(Family::Pro, &[0xB0, 121, 127]), None);
    assert_eq!(decode(Family::Cfw, &[0x90, 121, 127]), None);
}

#[test]
fn absent_pads_are_dropped() {
    assert_eq!(decode(Family::X, &[0x90, 5, 127]), None);
    assert_eq!(decode(Family::MatrixFe, &[0x90, 19, 127]), None);
    assert_eq!(decode(Family::Pro, &[0x90, 0, 127]), None);
}

#[test]
fn rotation_is_undone_on_input() {
    let event = decode_input(Family::X, InputFormat::Xy, Rotation::D90, &[0x90, 18, 127]);
    assert_eq!(event, pad(11, 127));
    let event = decode_input(Family::Pro, InputFormat::Xy, Rotation::D180, &[0x90, 88, 127]);
    assert_eq!(event, pad(11, 127));
}
