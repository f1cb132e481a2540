//! Dense position tokens for the Midi Fighter 64 compressed form.
//!
//! Cells of the 8x8 grid are numbered `id = (row - 1) * 8 + (col - 1)`, so
//! bits 3..6 hold the row and bits 0..3 the column. Point-symmetric cells are
//! exact bit complements of each other (`id ^ 63`), which lets one token
//! address both.

use padlight_ports::types::PadIndex;

const PAIR_BASE: u8 = 64;
const ROW_BASE: u8 = 96;
const COLUMN_BASE: u8 = 104;
const SQUARE_BASE: u8 = 112;

const CELLS: usize = 64;

pub fn cell_id(index: PadIndex) -> Option<u8> {
    let (row, col) = (index / 10, index % 10);
    if (1..=8).contains(&row) && (1..=8).contains(&col) && index < 100 {
        Some((row - 1) * 8 + (col - 1))
    } else {
        None
    }
}

pub fn cell_index(id: u8) -> PadIndex {
    (id / 8 + 1) * 10 + id % 8 + 1
}

fn row_cells(row: u8) -> impl Iterator<Item = u8> {
    (0..8).map(move |col| row * 8 + col)
}

fn column_cells(col: u8) -> impl Iterator<Item = u8> {
    (0..8).map(move |row| row * 8 + col)
}

fn square_cells(quadrant: u8) -> impl Iterator<Item = u8> {
    let (row0, col0) = ((quadrant / 2) * 4, (quadrant % 2) * 4);
    (0..16).map(move |k| (row0 + k / 4) * 8 + col0 + k % 4)
}

/// Encode a set of logical indices into MF64 position tokens.
/// Indices outside the 8x8 grid are ignored.
pub fn encode(indices: &[PadIndex]) -> Vec<u8> {
    let mut present = [false; CELLS];
    for id in indices.iter().filter_map(|index| cell_id(*index)) {
        present[id as usize] = true;
    }
    let mut covered = [false; CELLS];
    let mut tokens = Vec::new();

    let full_rows: Vec<u8> = (0..8)
        .filter(|row| row_cells(*row).all(|id| present[id as usize]))
        .collect();
    for row in &full_rows {
        tokens.push(ROW_BASE + row);
        row_cells(*row).for_each(|id| covered[id as usize] = true);
    }

    // A full grid is already described by its rows.
    if full_rows.len() < 8 {
        for col in 0..8 {
            if column_cells(col).all(|id| present[id as usize]) {
                tokens.push(COLUMN_BASE + col);
                column_cells(col).for_each(|id| covered[id as usize] = true);
            }
        }
    }

    for quadrant in 0..4 {
        let full = square_cells(quadrant).all(|id| present[id as usize]);
        let redundant = square_cells(quadrant).all(|id| covered[id as usize]);
        if full && !redundant {
            tokens.push(SQUARE_BASE + quadrant);
            square_cells(quadrant).for_each(|id| covered[id as usize] = true);
        }
    }

    // Remaining cells: pack complement pairs, everything else stays single.
    let mut excluded = covered;
    for id in 0..CELLS as u8 {
        let (i, mirror) = (id as usize, (id ^ 63) as usize);
        if !present[i] || excluded[i] {
            continue;
        }
        if id < 32 && present[mirror] && !excluded[mirror] {
            tokens.push(PAIR_BASE + id);
            excluded[mirror] = true;
        } else {
            tokens.push(id);
        }
        excluded[i] = true;
    }

    tokens
}

/// Expand one MF64 token back into logical indices.
pub fn decode_token(token: u8) -> Option<Vec<PadIndex>> {
    let ids: Vec<u8> = match token {
        0..=63 => vec![token],
        64..=95 => {
            let id = token - PAIR_BASE;
            vec![id, id ^ 63]
        }
        96..=103 => row_cells(token - ROW_BASE).collect(),
        104..=111 => column_cells(token - COLUMN_BASE).collect(),
        112..=115 => square_cells(token - SQUARE_BASE).collect(),
        _ => return None,
    };
    Some(ids.into_iter().map(cell_index).collect())
}
