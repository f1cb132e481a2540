use padlight_domain_protocol::{
    classify_reply, classify_version_reply, Advisory, AdvisoryKind, Classification, Family,
    FirmwareVersion, Handshake, HandshakeState, HandshakeStep, Identity, DEVICE_INQUIRY,
    VERSION_INQUIRY,
};
use pretty_assertions::assert_eq;

fn novation_reply(code: [u8; 2], version: [u8; 4]) -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x7E, 0x7F, 0x06, 0x02, 0x00, 0x20, 0x29];
    bytes.extend_from_slice(&code);
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(&version);
    bytes.push(0xF7);
    bytes
}

fn semver_reply(manufacturer: [u8; 3], model: u8, version: [u8; 3]) -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x7E, 0x7F, 0x06, 0x02];
    bytes.extend_from_slice(&manufacturer);
    bytes.push(model);
    bytes.extend_from_slice(&version);
    bytes.push(0xF7);
    bytes
}

fn version_reply(application: [u8; 4]) -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x00, 0x20, 0x29, 0x00, 0x70, 0, 4, 2, 0];
    bytes.extend_from_slice(&application);
    bytes.push(0xF7);
    bytes
}

const MK2: [u8; 2] = [0x69, 0x00];
const PRO: [u8; 2] = [0x51, 0x00];
const X: [u8; 2] = [0x03, 0x01];
const PRO_MK3: [u8; 2] = [0x23, 0x01];

#[test]
fn firmware_version_parses_digits_and_letters() {
    assert_eq!(FirmwareVersion::parse(&[0, 1, 8, 2]), Some(FirmwareVersion::Numeric(182)));
    assert_eq!(
        FirmwareVersion::parse(b"cfy\0"),
        Some(FirmwareVersion::Text("cfy".to_string()))
    );
    assert_eq!(FirmwareVersion::parse(&[]), None);
}

#[test]
fn custom_pro_build_is_identified_as_cfw_with_compression() {
    let (classification, advisories) = classify_reply(&novation_reply(PRO, *b"cfy\0"));
    assert_eq!(classification, Classification::Identified(Identity::new(Family::Cfw)));
    assert!(Identity::new(Family::Cfw).compression);
    assert_eq!(advisories, vec![]);
}

#[test]
fn incompatible_pro_build_stays_unknown_with_advisory() {
    let (classification, advisories) = classify_reply(&novation_reply(PRO, *b"cfw\0"));
    assert_eq!(classification, Classification::Unrecognized);
    assert_eq!(
        advisories,
        vec![Advisory::new(Family::Cfw, AdvisoryKind::IncompatibleFirmware)]
    );
}

#[test]
fn unknown_letters_on_pro_are_unrecognized() {
    let (classification, advisories) = classify_reply(&novation_reply(PRO, *b"abc\0"));
    assert_eq!(classification, Classification::Unrecognized);
    assert!(advisories.is_empty());
}

#[test]
fn custom_mk2_build_enables_compression() {
    let (classification, _) = classify_reply(&novation_reply(MK2, *b"cfy\0"));
    let Classification::Identified(identity) = classification else {
        panic!("expected identification, got {classification:?}");
    };
    assert_eq!(identity.family, Family::Mk2);
    assert!(identity.compression);
}

#[test]
fn old_and_stock_firmware_raise_advisories() {
    let (classification, advisories) = classify_reply(&novation_reply(MK2, [0, 1, 6, 4]));
    assert_eq!(
        classification,
        Classification::Identified(Identity::new(Family::Mk2).with_firmware(164))
    );
    assert_eq!(advisories, vec![Advisory::new(Family::Mk2, AdvisoryKind::OldFirmware)]);

    let (_, advisories) = classify_reply(&novation_reply(PRO, [0, 1, 8, 2]));
    assert_eq!(advisories, vec![Advisory::new(Family::Pro, AdvisoryKind::StockFirmware)]);

    let (_, advisories) = classify_reply(&novation_reply(X, [0, 3, 5, 1]));
    assert!(advisories.is_empty());
}

#[test]
fn bootloader_family_codes_are_not_identified() {
    let (classification, _) = classify_reply(&novation_reply([0x03, 0x11], [0, 4, 0, 0]));
    assert_eq!(classification, Classification::Unrecognized);
}

#[test]
fn matrix_and_midi_fighter_use_semver_triples() {
    let (classification, advisories) = classify_reply(&semver_reply([0x00, 0x02, 0x03], 0x02, [1, 2, 3]));
    let expected = Identity::new(Family::MatrixPro).with_firmware(123);
    assert_eq!(classification, Classification::Identified(expected));
    assert!(expected.compression);
    assert!(advisories.is_empty());

    let (_, advisories) = classify_reply(&semver_reply([0x00, 0x02, 0x03], 0x01, [0, 9, 0]));
    assert_eq!(advisories, vec![Advisory::new(Family::MatrixFe, AdvisoryKind::OldFirmware)]);

    let (classification, _) = classify_reply(&semver_reply([0x00, 0x01, 0x79], 0x05, [2, 0, 0]));
    assert_eq!(
        classification,
        Classification::Identified(Identity::new(Family::Mf64).with_firmware(200))
    );
}

#[test]
fn truncated_or_foreign_replies_are_unrecognized() {
    let mut short = novation_reply(PRO, [0, 1, 8, 2]);
    short.truncate(12);
    short.push(0xF7);
    assert_eq!(classify_reply(&short).0, Classification::Unrecognized);
    assert_eq!(
        classify_reply(&semver_reply([0x00, 0x00, 0x0E], 0x01, [1, 0, 0])).0,
        Classification::Unrecognized
    );
    assert_eq!(classify_reply(&[0x90, 11, 127]).0, Classification::Unrecognized);
}

#[test]
fn version_reply_resolves_pro_mk3() {
    let (classification, advisories) = classify_version_reply(&version_reply([0, 4, 5, 0]));
    assert_eq!(
        classification,
        Classification::Identified(Identity::new(Family::ProMk3).with_firmware(450))
    );
    assert!(advisories.is_empty());

    let (_, advisories) = classify_version_reply(&version_reply([0, 4, 3, 0]));
    assert_eq!(advisories, vec![Advisory::new(Family::ProMk3, AdvisoryKind::OldFirmware)]);

    let (classification, _) = classify_version_reply(&version_reply([0, 0, 0, 0]));
    assert_eq!(classification, Classification::Unrecognized);
}

#[test]
fn handshake_identifies_on_first_good_reply() {
    let mut handshake = Handshake::new();
    assert_eq!(handshake.state(), HandshakeState::Unknown);
    assert_eq!(handshake.begin(), DEVICE_INQUIRY.to_vec());
    assert!(handshake.is_pending());

    let outcome = handshake.on_message(&[0x90, 11, 127]);
    assert_eq!(outcome.step, HandshakeStep::Ignored);

    let outcome = handshake.on_message(&novation_reply(X, [0, 4, 0, 0]));
    let identity = Identity::new(Family::X).with_firmware(400);
    assert_eq!(outcome.step, HandshakeStep::Identified(identity));
    assert_eq!(handshake.identity(), Some(identity));
    assert_eq!(handshake.retry(), None);

    // Further replies do not change an identified device.
    let outcome = handshake.on_message(&novation_reply(PRO, [0, 2, 0, 0]));
    assert_eq!(outcome.step, HandshakeStep::Ignored);
    assert_eq!(handshake.identity(), Some(identity));
}

#[test]
fn handshake_retries_until_reset() {
    let mut handshake = Handshake::new();
    assert_eq!(handshake.retry(), None);
    handshake.begin();
    assert_eq!(handshake.retry(), Some(DEVICE_INQUIRY.to_vec()));
    assert_eq!(handshake.attempts(), 2);

    let outcome = handshake.on_message(&novation_reply(PRO, *b"zzz\0"));
    assert_eq!(outcome.step, HandshakeStep::Unrecognized);
    assert!(handshake.is_pending());

    handshake.reset();
    assert_eq!(handshake.state(), HandshakeState::Unknown);
    assert_eq!(handshake.attempts(), 0);
}

#[test]
fn ambiguous_pro_mk3_goes_through_version_inquiry() {
    let mut handshake = Handshake::new();
    handshake.begin();

    let outcome = handshake.on_message(&novation_reply(PRO_MK3, [0, 0, 0, 0]));
    assert_eq!(outcome.step, HandshakeStep::Send(VERSION_INQUIRY.to_vec()));
    assert_eq!(handshake.state(), HandshakeState::AwaitingVersionReply);
    assert_eq!(handshake.retry(), Some(VERSION_INQUIRY.to_vec()));

    let outcome = handshake.on_message(&version_reply([0, 4, 7, 0]));
    assert_eq!(
        outcome.step,
        HandshakeStep::Identified(Identity::new(Family::ProMk3).with_firmware(470))
    );
}

#[test]
fn pro_mk3_in_bootloader_falls_back_to_identifying() {
    let mut handshake = Handshake::new();
    handshake.begin();
    handshake.on_message(&novation_reply(PRO_MK3, [0, 0, 0, 0]));

    let outcome = handshake.on_message(&version_reply([0, 0, 0, 0]));
    assert_eq!(outcome.step, HandshakeStep::Unrecognized);
    assert_eq!(handshake.state(), HandshakeState::Identifying);
    assert_eq!(handshake.retry(), Some(DEVICE_INQUIRY.to_vec()));
}

#[test]
fn compression_needs_a_compressed_header() {
    assert!(!Identity::unknown().is_known());
    assert!(Identity::new(Family::Cfw).is_known());
    assert!(Identity::new(Family::Cfw).compression);
    assert!(!Identity::new(Family::Pro).with_compression(true).compression);
    assert!(Identity::new(Family::Mk2).with_compression(true).compression);
}
