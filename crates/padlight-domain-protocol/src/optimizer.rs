use crate::family::{Family, Identity};
use crate::mf64;
use padlight_domain_signal::{Color, PadUpdate};
use padlight_ports::midi::{SYSEX_END, SYSEX_START};
use padlight_ports::types::{PadIndex, MODE_LIGHT, PAD_COUNT};

/// Command byte of the compressed update extension.
pub const COMPRESSED_COMMAND: u8 = 0x5F;

const ROW_TOKEN_BASE: u8 = 100;
const COLUMN_TOKEN_BASE: u8 = 110;
const INLINE_COUNT_MAX: usize = 7;
const FLAG_BIT: u8 = 0x40;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimizeError {
    #[error("compression not supported by {0}")]
    Unsupported(Family),
    #[error("too many colors: {count} > {limit}")]
    TooManyColors { count: usize, limit: usize },
    #[error("message too large: {size} > {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("not a compressed message for {0}")]
    Header(Family),
    #[error("truncated group at byte {0}")]
    Truncated(usize),
    #[error("invalid position token {0}")]
    Token(u8),
}

/// Encode an update batch (already rotated) into one compressed message.
///
/// `Ok(None)` means nothing visible is left once absent pads are dropped.
/// Errors are recoverable: the caller falls back to plain RGB messages.
pub fn optimize(identity: &Identity, updates: &[PadUpdate]) -> Result<Option<Vec<u8>>, OptimizeError> {
    let family = identity.family;
    let header = match family.compressed_header() {
        Some(header) if identity.compression => header,
        _ => return Err(OptimizeError::Unsupported(family)),
    };

    let groups = group_by_color(family, updates);
    if groups.is_empty() {
        return Ok(None);
    }

    if let Some(limit) = family.color_ceiling() {
        if groups.len() > limit {
            return Err(OptimizeError::TooManyColors {
                count: groups.len(),
                limit,
            });
        }
    }

    let mut message = Vec::with_capacity(family.compressed_ceiling());
    message.push(SYSEX_START);
    message.extend_from_slice(header);
    message.push(COMPRESSED_COMMAND);

    for (color, indices) in &groups {
        let tokens = if family == Family::Mf64 {
            mf64::encode(indices)
        } else {
            classic_tokens(indices)
        };
        push_group(&mut message, color, &tokens);
    }
    message.push(SYSEX_END);

    let limit = family.compressed_ceiling();
    if message.len() > limit {
        return Err(OptimizeError::TooLarge {
            size: message.len(),
            limit,
        });
    }
    Ok(Some(message))
}

/// Later updates for the same pad win; groups keep first-appearance order.
fn group_by_color(family: Family, updates: &[PadUpdate]) -> Vec<(Color, Vec<PadIndex>)> {
    let mut latest: [Option<Color>; PAD_COUNT] = [None; PAD_COUNT];
    let mut order = Vec::new();
    for update in updates {
        if family.is_forbidden(update.index) {
            continue;
        }
        let slot = &mut latest[update.index as usize];
        if slot.is_none() {
            order.push(update.index);
        }
        *slot = Some(update.color);
    }

    let mut groups: Vec<(Color, Vec<PadIndex>)> = Vec::new();
    for index in order {
        let Some(color) = latest[index as usize] else {
            continue;
        };
        match groups.iter_mut().find(|(c, _)| *c == color) {
            Some((_, indices)) => indices.push(index),
            None => groups.push((color, vec![index])),
        }
    }
    groups
}

fn push_group(message: &mut Vec<u8>, color: &Color, tokens: &[u8]) {
    let [r, g, b] = color.to_array();
    let count = tokens.len();
    if count <= INLINE_COUNT_MAX {
        // Count rides in bit 6 of each channel byte: r = bit 2, g = bit 1, b = bit 0.
        let flag = |bit: usize| if count & (1 << bit) != 0 { FLAG_BIT } else { 0 };
        message.extend_from_slice(&[r | flag(2), g | flag(1), b | flag(0)]);
    } else {
        message.extend_from_slice(&[r, g, b, count as u8]);
    }
    message.extend_from_slice(tokens);
}

fn row_full(present: &[bool; PAD_COUNT], row: u8) -> bool {
    (1..=8).all(|col| present[(row * 10 + col) as usize])
}

fn column_full(present: &[bool; PAD_COUNT], col: u8) -> bool {
    (1..=8).all(|row| present[(row * 10 + col) as usize])
}

/// Position tokens for the 10x10 families: single indices, full inner rows
/// and full inner columns.
pub fn classic_tokens(indices: &[PadIndex]) -> Vec<u8> {
    let mut present = [false; PAD_COUNT];
    for index in indices {
        if let Some(slot) = present.get_mut(*index as usize) {
            *slot = true;
        }
    }
    let mut covered = [false; PAD_COUNT];
    let mut tokens = Vec::new();

    let rows: Vec<u8> = (1..=8).filter(|row| row_full(&present, *row)).collect();
    let columns: Vec<u8> = if rows.len() == 8 {
        Vec::new()
    } else {
        (1..=8).filter(|col| column_full(&present, *col)).collect()
    };

    for row in &rows {
        tokens.push(ROW_TOKEN_BASE + row);
        (1..=8).for_each(|col| covered[(row * 10 + col) as usize] = true);
    }
    for col in &columns {
        tokens.push(COLUMN_TOKEN_BASE + col);
        (1..=8).for_each(|row| covered[(row * 10 + col) as usize] = true);
    }

    for index in 0..PAD_COUNT {
        if present[index] && !covered[index] {
            tokens.push(index as u8);
        }
    }
    tokens
}

fn decode_classic_token(token: u8) -> Option<Vec<PadIndex>> {
    match token {
        0..=MODE_LIGHT => Some(vec![token]),
        101..=108 => {
            let row = token - ROW_TOKEN_BASE;
            Some((1..=8).map(|col| row * 10 + col).collect())
        }
        111..=118 => {
            let col = token - COLUMN_TOKEN_BASE;
            Some((1..=8).map(|row| row * 10 + col).collect())
        }
        _ => None,
    }
}

/// Replay a compressed message back into the updates it describes.
/// Overlapping tokens (row and column sharing a cell) yield the cell twice.
pub fn decode_compressed(identity: &Identity, message: &[u8]) -> Result<Vec<PadUpdate>, DecodeError> {
    let family = identity.family;
    let header = family
        .compressed_header()
        .ok_or(DecodeError::Header(family))?;

    let prefix_len = 1 + header.len() + 1;
    let valid = message.len() >= prefix_len + 1
        && message[0] == SYSEX_START
        && &message[1..1 + header.len()] == header
        && message[prefix_len - 1] == COMPRESSED_COMMAND
        && message[message.len() - 1] == SYSEX_END;
    if !valid {
        return Err(DecodeError::Header(family));
    }

    let body = &message[prefix_len..message.len() - 1];
    let mut updates = Vec::new();
    let mut cursor = 0;
    while cursor < body.len() {
        let channels = body
            .get(cursor..cursor + 3)
            .ok_or(DecodeError::Truncated(prefix_len + cursor))?;
        let flags = channels
            .iter()
            .fold(0usize, |acc, byte| (acc << 1) | ((byte & FLAG_BIT) >> 6) as usize);
        let color = Color::new(
            channels[0] & !FLAG_BIT,
            channels[1] & !FLAG_BIT,
            channels[2] & !FLAG_BIT,
        );
        cursor += 3;

        let count = if flags == 0 {
            let count = *body
                .get(cursor)
                .ok_or(DecodeError::Truncated(prefix_len + cursor))?;
            cursor += 1;
            count as usize
        } else {
            flags
        };

        let tokens = body
            .get(cursor..cursor + count)
            .ok_or(DecodeError::Truncated(prefix_len + cursor))?;
        cursor += count;

        for token in tokens {
            let indices = if family == Family::Mf64 {
                mf64::decode_token(*token)
            } else {
                decode_classic_token(*token)
            }
            .ok_or(DecodeError::Token(*token))?;
            updates.extend(indices.into_iter().map(|index| PadUpdate::new(index, color)));
        }
    }
    Ok(updates)
}
