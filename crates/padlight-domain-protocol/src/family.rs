use crate::coords::xy_to_drum_rack;
use padlight_ports::midi::{SYSEX_END, SYSEX_START};
use padlight_ports::types::{PadIndex, MODE_LIGHT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware/firmware variants with their own protocol dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    Mk2,
    Pro,
    /// Custom firmware running on Pro hardware.
    Cfw,
    X,
    MiniMk3,
    ProMk3,
    MatrixFe,
    MatrixPro,
    Mf64,
    Unknown,
}

const NOVATION_MK2: &[u8] = &[0x00, 0x20, 0x29, 0x02, 0x18];
const NOVATION_PRO: &[u8] = &[0x00, 0x20, 0x29, 0x02, 0x10];
const NOVATION_X: &[u8] = &[0x00, 0x20, 0x29, 0x02, 0x0C];
const NOVATION_MINI_MK3: &[u8] = &[0x00, 0x20, 0x29, 0x02, 0x0D];
const NOVATION_PRO_MK3: &[u8] = &[0x00, 0x20, 0x29, 0x02, 0x0E];
const MATRIX_FE: &[u8] = &[0x00, 0x02, 0x03, 0x01];
const MATRIX_PRO: &[u8] = &[0x00, 0x02, 0x03, 0x02];
const MF64: &[u8] = &[0x00, 0x01, 0x79, 0x05];

const CMD_RGB_CLASSIC: u8 = 0x0B;
const CMD_LIGHTING: u8 = 0x03;
const CMD_SET_ALL: u8 = 0x0E;
const CMD_FULL_GRID: u8 = 0x0F;

/// Where one logical index lands on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireTarget {
    pub primary: u8,
    pub mirror: Option<u8>,
}

impl WireTarget {
    fn single(primary: u8) -> Self {
        Self {
            primary,
            mirror: None,
        }
    }
}

impl Family {
    pub const KNOWN: [Family; 9] = [
        Family::Mk2,
        Family::Pro,
        Family::Cfw,
        Family::X,
        Family::MiniMk3,
        Family::ProMk3,
        Family::MatrixFe,
        Family::MatrixPro,
        Family::Mf64,
    ];

    pub fn is_generation_x(self) -> bool {
        matches!(self, Family::X | Family::MiniMk3 | Family::ProMk3)
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, Family::MatrixFe | Family::MatrixPro)
    }

    fn vendor_header(self) -> &'static [u8] {
        match self {
            Family::Mk2 => NOVATION_MK2,
            Family::Pro | Family::Cfw => NOVATION_PRO,
            Family::X => NOVATION_X,
            Family::MiniMk3 => NOVATION_MINI_MK3,
            Family::ProMk3 => NOVATION_PRO_MK3,
            Family::MatrixFe => MATRIX_FE,
            Family::MatrixPro => MATRIX_PRO,
            Family::Mf64 => MF64,
            Family::Unknown => &[],
        }
    }

    /// Bytes between F0 and the first update of an RGB message.
    pub fn rgb_header(self) -> Vec<u8> {
        if self == Family::Unknown {
            return Vec::new();
        }
        let mut header = self.vendor_header().to_vec();
        header.push(if self.is_generation_x() {
            CMD_LIGHTING
        } else {
            CMD_RGB_CLASSIC
        });
        header
    }

    /// Per-update type byte that precedes the index on newer devices.
    pub fn update_prefix(self) -> Option<u8> {
        self.is_generation_x().then_some(CMD_LIGHTING)
    }

    /// Multiplier from the 0..=63 colour space to the wire range.
    pub fn channel_scale(self) -> u8 {
        match self {
            Family::X | Family::MiniMk3 | Family::ProMk3 | Family::Mf64 => 2,
            _ => 1,
        }
    }

    /// Hard ceiling on updates inside one RGB message.
    pub fn max_repeats(self) -> usize {
        match self {
            Family::Mk2 => 80,
            Family::Pro => 78,
            Family::Cfw => 79,
            Family::X | Family::MiniMk3 | Family::ProMk3 => 81,
            Family::MatrixFe => 64,
            Family::MatrixPro => 80,
            Family::Mf64 => 64,
            Family::Unknown => 0,
        }
    }

    /// Logical indices that are not physically present on the device.
    pub fn is_forbidden(self, index: PadIndex) -> bool {
        if index > MODE_LIGHT {
            return true;
        }
        if index == MODE_LIGHT {
            return !matches!(
                self,
                Family::Pro | Family::Cfw | Family::X | Family::MiniMk3 | Family::ProMk3
            );
        }
        let (row, col) = (index / 10, index % 10);
        let corner = matches!(index, 0 | 9 | 90 | 99);
        let outer_ring = row == 0 || row == 9 || col == 0 || col == 9;
        match self {
            Family::Mk2 | Family::X | Family::MiniMk3 => row == 0 || col == 0 || index == 99,
            Family::Pro | Family::Cfw | Family::ProMk3 | Family::MatrixPro => corner,
            Family::MatrixFe | Family::Mf64 => outer_ring,
            Family::Unknown => true,
        }
    }

    /// Wire address(es) for a logical index that passed `is_forbidden`.
    pub fn wire_target(self, index: PadIndex) -> Option<WireTarget> {
        if self.is_forbidden(index) {
            return None;
        }
        let target = match self {
            Family::Mk2 if (91..=98).contains(&index) => WireTarget::single(index + 13),
            Family::Pro | Family::Cfw | Family::X | Family::MiniMk3 if index == MODE_LIGHT => {
                WireTarget::single(99)
            }
            Family::ProMk3 if index == MODE_LIGHT => WireTarget::single(99),
            Family::ProMk3 if (1..=8).contains(&index) => WireTarget {
                primary: index,
                mirror: Some(index + 100),
            },
            Family::Mf64 => WireTarget::single(xy_to_drum_rack(index)?),
            _ => WireTarget::single(index),
        };
        Some(target)
    }

    /// Message that blanks every light, sent after identification and on clear.
    pub fn force_clear(self) -> Vec<u8> {
        let mut message = vec![SYSEX_START];
        match self {
            Family::Unknown => return Vec::new(),
            family if family.is_generation_x() => {
                message.extend_from_slice(&family.rgb_header());
                for index in 0..=MODE_LIGHT {
                    let Some(target) = family.wire_target(index) else {
                        continue;
                    };
                    for wire in std::iter::once(target.primary).chain(target.mirror) {
                        // static palette colour 0
                        message.extend_from_slice(&[0x00, wire, 0x00]);
                    }
                }
            }
            family => {
                message.extend_from_slice(family.vendor_header());
                message.extend_from_slice(&[CMD_SET_ALL, 0x00]);
            }
        }
        message.push(SYSEX_END);
        message
    }

    /// Header of the "set entire grid" message, for families that have one.
    pub fn full_grid_header(self) -> Option<Vec<u8>> {
        match self {
            Family::Pro | Family::Cfw => {
                let mut header = NOVATION_PRO.to_vec();
                header.extend_from_slice(&[CMD_FULL_GRID, 0x00]);
                Some(header)
            }
            _ => None,
        }
    }

    /// Header of the compressed update extension (without the 5F command).
    pub fn compressed_header(self) -> Option<&'static [u8]> {
        match self {
            Family::Mk2 | Family::Cfw | Family::MatrixFe | Family::MatrixPro | Family::Mf64 => {
                Some(self.vendor_header())
            }
            _ => None,
        }
    }

    pub fn compressed_ceiling(self) -> usize {
        match self {
            Family::Mk2 => 312,
            Family::Cfw => 320,
            Family::MatrixFe | Family::MatrixPro => 256,
            Family::Mf64 => 192,
            _ => 0,
        }
    }

    /// Distinct-colour limit of the compressed form on the classic lineage.
    pub fn color_ceiling(self) -> Option<usize> {
        match self {
            Family::Mk2 | Family::Cfw => Some(16),
            _ => None,
        }
    }

    /// Whether stock builds of this family understand the compressed form.
    pub fn compresses_by_default(self) -> bool {
        matches!(
            self,
            Family::Cfw | Family::MatrixFe | Family::MatrixPro | Family::Mf64
        )
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Mk2 => "Launchpad MK2",
            Family::Pro => "Launchpad Pro",
            Family::Cfw => "Launchpad Pro (CFW)",
            Family::X => "Launchpad X",
            Family::MiniMk3 => "Launchpad Mini MK3",
            Family::ProMk3 => "Launchpad Pro MK3",
            Family::MatrixFe => "Matrix FE",
            Family::MatrixPro => "Matrix Pro",
            Family::Mf64 => "Midi Fighter 64",
            Family::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Result of a successful handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub family: Family,
    pub firmware: Option<u16>,
    pub compression: bool,
}

impl Identity {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            firmware: None,
            compression: family.compresses_by_default(),
        }
    }

    pub fn with_firmware(mut self, firmware: u16) -> Self {
        self.firmware = Some(firmware);
        self
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression && self.family.compressed_header().is_some();
        self
    }

    pub fn unknown() -> Self {
        Self::new(Family::Unknown)
    }

    pub fn is_known(&self) -> bool {
        self.family != Family::Unknown
    }
}
