use crate::family::{Family, Identity};
use padlight_ports::midi::is_sysex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Universal device inquiry.
pub const DEVICE_INQUIRY: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];

/// Novation version inquiry, used when the inquiry reply is ambiguous.
pub const VERSION_INQUIRY: [u8; 7] = [0xF0, 0x00, 0x20, 0x29, 0x00, 0x70, 0xF7];

const VERSION_REPLY_HEADER: [u8; 6] = [0xF0, 0x00, 0x20, 0x29, 0x00, 0x70];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdvisoryKind {
    OldFirmware,
    /// Stock firmware where a custom build would unlock more features.
    StockFirmware,
    IncompatibleFirmware,
}

/// One-shot firmware notice surfaced to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Advisory {
    pub family: Family,
    pub kind: AdvisoryKind,
}

impl Advisory {
    pub fn new(family: Family, kind: AdvisoryKind) -> Self {
        Self { family, kind }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Vendor {
    Novation,
    Systems203,
    DjTechTools,
}

struct VendorLayout {
    vendor: Vendor,
    manufacturer: [u8; 3],
    model: Range<usize>,
    version: Range<usize>,
}

const MANUFACTURER_OFFSET: usize = 5;

const VENDOR_LAYOUTS: [VendorLayout; 3] = [
    VendorLayout {
        vendor: Vendor::Novation,
        manufacturer: [0x00, 0x20, 0x29],
        model: 8..10,
        version: 12..16,
    },
    VendorLayout {
        vendor: Vendor::Systems203,
        manufacturer: [0x00, 0x02, 0x03],
        model: 8..9,
        version: 9..12,
    },
    VendorLayout {
        vendor: Vendor::DjTechTools,
        manufacturer: [0x00, 0x01, 0x79],
        model: 8..9,
        version: 9..12,
    },
];

/// Firmware version as reported in an inquiry reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirmwareVersion {
    Numeric(u16),
    Text(String),
}

impl FirmwareVersion {
    /// Four decimal digits, or ASCII letters (NUL padded) for custom builds.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        if bytes.iter().all(|b| *b <= 9) {
            let value = bytes.iter().fold(0u16, |acc, b| acc * 10 + *b as u16);
            return Some(FirmwareVersion::Numeric(value));
        }
        let text: Vec<u8> = bytes.iter().copied().take_while(|b| *b != 0).collect();
        if !text.is_empty() && text.iter().all(|b| b.is_ascii_alphanumeric()) {
            return Some(FirmwareVersion::Text(
                String::from_utf8_lossy(&text).into_owned(),
            ));
        }
        None
    }
}

/// What one inquiry reply tells us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Identified(Identity),
    NeedsVersionInquiry,
    Unrecognized,
}

/// Classify a device-inquiry reply. Advisories are returned regardless of
/// whether the family ends up identified.
pub fn classify_reply(bytes: &[u8]) -> (Classification, Vec<Advisory>) {
    let mut advisories = Vec::new();
    let classification = classify_inner(bytes, &mut advisories);
    (classification, advisories)
}

fn classify_inner(bytes: &[u8], advisories: &mut Vec<Advisory>) -> Classification {
    let is_reply = is_sysex(bytes)
        && bytes.len() > MANUFACTURER_OFFSET
        && bytes[1] == 0x7E
        && bytes[3] == 0x06
        && bytes[4] == 0x02;
    if !is_reply {
        return Classification::Unrecognized;
    }

    let Some(layout) = VENDOR_LAYOUTS.iter().find(|layout| {
        bytes.get(MANUFACTURER_OFFSET..MANUFACTURER_OFFSET + 3) == Some(&layout.manufacturer[..])
    }) else {
        return Classification::Unrecognized;
    };

    // Trailing F7 must come after the version field.
    if bytes.len() <= layout.version.end {
        return Classification::Unrecognized;
    }
    let model = &bytes[layout.model.clone()];
    let version_bytes = &bytes[layout.version.clone()];

    match layout.vendor {
        Vendor::Novation => classify_novation(model, version_bytes, advisories),
        Vendor::Systems203 => {
            let family = match model[0] {
                0x01 => Family::MatrixFe,
                0x02 => Family::MatrixPro,
                _ => return Classification::Unrecognized,
            };
            classify_semver(family, version_bytes, advisories)
        }
        Vendor::DjTechTools => match model[0] {
            0x05 => classify_semver(Family::Mf64, version_bytes, advisories),
            _ => Classification::Unrecognized,
        },
    }
}

fn classify_novation(
    family_code: &[u8],
    version_bytes: &[u8],
    advisories: &mut Vec<Advisory>,
) -> Classification {
    let family = match family_code {
        [0x69, 0x00] => Family::Mk2,
        [0x51, 0x00] => Family::Pro,
        [0x03, 0x01] => Family::X,
        [0x13, 0x01] => Family::MiniMk3,
        [0x23, 0x01] => Family::ProMk3,
        // anything else, including bootloader builds (`xx 11`)
        _ => return Classification::Unrecognized,
    };

    let Some(version) = FirmwareVersion::parse(version_bytes) else {
        return Classification::Unrecognized;
    };

    match (family, version) {
        (Family::Mk2, FirmwareVersion::Text(text)) if text == "cfy" => {
            Classification::Identified(Identity::new(Family::Mk2).with_compression(true))
        }
        (Family::Pro, FirmwareVersion::Text(text)) if text == "cfy" => {
            Classification::Identified(Identity::new(Family::Cfw))
        }
        (Family::Pro, FirmwareVersion::Text(text)) if text == "cfw" => {
            advisories.push(Advisory::new(Family::Cfw, AdvisoryKind::IncompatibleFirmware));
            Classification::Unrecognized
        }
        (_, FirmwareVersion::Text(_)) => Classification::Unrecognized,
        (Family::ProMk3, FirmwareVersion::Numeric(0)) => Classification::NeedsVersionInquiry,
        (family, FirmwareVersion::Numeric(version)) => {
            match old_firmware_threshold(family) {
                Some(threshold) if version < threshold => {
                    advisories.push(Advisory::new(family, AdvisoryKind::OldFirmware))
                }
                _ if family == Family::Pro => {
                    advisories.push(Advisory::new(family, AdvisoryKind::StockFirmware))
                }
                _ => {}
            }
            Classification::Identified(Identity::new(family).with_firmware(version))
        }
    }
}

fn old_firmware_threshold(family: Family) -> Option<u16> {
    match family {
        Family::Mk2 => Some(171),
        Family::Pro => Some(182),
        Family::X => Some(351),
        Family::MiniMk3 => Some(407),
        Family::ProMk3 => Some(440),
        _ => None,
    }
}

fn classify_semver(
    family: Family,
    version_bytes: &[u8],
    advisories: &mut Vec<Advisory>,
) -> Classification {
    let [major, minor, patch] = [version_bytes[0], version_bytes[1], version_bytes[2]];
    if family.is_matrix() && major == 0 {
        advisories.push(Advisory::new(family, AdvisoryKind::OldFirmware));
    }
    let firmware = major as u16 * 100 + minor as u16 * 10 + patch as u16;
    Classification::Identified(Identity::new(family).with_firmware(firmware))
}

/// Parse the reply to `VERSION_INQUIRY`: bootloader digits then application digits.
pub fn classify_version_reply(bytes: &[u8]) -> (Classification, Vec<Advisory>) {
    let mut advisories = Vec::new();
    let valid = is_sysex(bytes) && bytes.len() >= 15 && bytes[..6] == VERSION_REPLY_HEADER;
    if !valid {
        return (Classification::Unrecognized, advisories);
    }

    let application = match FirmwareVersion::parse(&bytes[10..14]) {
        Some(FirmwareVersion::Numeric(version)) => version,
        _ => return (Classification::Unrecognized, advisories),
    };
    // No application firmware: the device is sitting in its bootloader.
    if application == 0 {
        return (Classification::Unrecognized, advisories);
    }
    if old_firmware_threshold(Family::ProMk3).is_some_and(|threshold| application < threshold) {
        advisories.push(Advisory::new(Family::ProMk3, AdvisoryKind::OldFirmware));
    }
    let identity = Identity::new(Family::ProMk3).with_firmware(application);
    (Classification::Identified(identity), advisories)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    Unknown,
    Identifying,
    AwaitingVersionReply,
    Identified(Identity),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Not a handshake message, or the handshake is not running.
    Ignored,
    /// Reply understood but the device stays unidentified.
    Unrecognized,
    /// Send these bytes to the device.
    Send(Vec<u8>),
    Identified(Identity),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeOutcome {
    pub step: HandshakeStep,
    pub advisories: Vec<Advisory>,
}

impl HandshakeOutcome {
    fn ignored() -> Self {
        Self {
            step: HandshakeStep::Ignored,
            advisories: Vec::new(),
        }
    }
}

/// Device identification state machine. Timers live with the caller; this
/// only decides what to send and how replies change the state.
#[derive(Clone, Debug)]
pub struct Handshake {
    state: HandshakeState,
    attempts: u32,
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Unknown,
            attempts: 0,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn identity(&self) -> Option<Identity> {
        match self.state {
            HandshakeState::Identified(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            HandshakeState::Identifying | HandshakeState::AwaitingVersionReply
        )
    }

    /// Start identifying. Returns the inquiry to send.
    pub fn begin(&mut self) -> Vec<u8> {
        self.state = HandshakeState::Identifying;
        self.attempts = 1;
        DEVICE_INQUIRY.to_vec()
    }

    /// Message to re-send when the retry timer fires, if still identifying.
    pub fn retry(&mut self) -> Option<Vec<u8>> {
        let message = match self.state {
            HandshakeState::Identifying => DEVICE_INQUIRY.to_vec(),
            HandshakeState::AwaitingVersionReply => VERSION_INQUIRY.to_vec(),
            _ => return None,
        };
        self.attempts += 1;
        Some(message)
    }

    pub fn on_message(&mut self, bytes: &[u8]) -> HandshakeOutcome {
        if !is_sysex(bytes) {
            return HandshakeOutcome::ignored();
        }

        let (classification, advisories) = match self.state {
            HandshakeState::Identifying => classify_reply(bytes),
            HandshakeState::AwaitingVersionReply => {
                // Exactly one reply is consumed in this sub-state.
                self.state = HandshakeState::Identifying;
                classify_version_reply(bytes)
            }
            HandshakeState::Unknown | HandshakeState::Identified(_) => {
                return HandshakeOutcome::ignored()
            }
        };

        let step = match classification {
            Classification::Identified(identity) => {
                self.state = HandshakeState::Identified(identity);
                HandshakeStep::Identified(identity)
            }
            Classification::NeedsVersionInquiry => {
                self.state = HandshakeState::AwaitingVersionReply;
                HandshakeStep::Send(VERSION_INQUIRY.to_vec())
            }
            Classification::Unrecognized => HandshakeStep::Unrecognized,
        };

        HandshakeOutcome { step, advisories }
    }

    pub fn reset(&mut self) {
        self.state = HandshakeState::Unknown;
        self.attempts = 0;
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}
