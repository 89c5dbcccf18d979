//! Dictionary lookup with rotation and bit-error tolerance.

use crate::Dictionary;

/// Best dictionary entry for an observed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    /// Quarter turns `r` with `observed == rotate_code_u64(code[id], n, r)`
    /// (up to `hamming` flipped bits).
    pub rotation: u8,
    pub hamming: u8,
}

/// Exhaustive matcher over every id and rotation.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    /// `rotations[id][r]` is code `id` turned `r` times.
    rotations: Vec<[u64; 4]>,
}

impl Matcher {
    /// `max_hamming` is capped at the dictionary's correction capacity.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotations = dict
            .codes
            .iter()
            .map(|&code| std::array::from_fn(|r| rotate_code_u64(code, n, r as u8)))
            .collect();
        Self {
            max_hamming: max_hamming.min(dict.max_correction_bits),
            dict,
            rotations,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest entry within `max_hamming`; ties go to the lowest id, then
    /// the lowest rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        self.rotations
            .iter()
            .enumerate()
            .flat_map(|(id, turned)| {
                turned.iter().enumerate().map(move |(r, &code)| Match {
                    id: id as u32,
                    rotation: r as u8,
                    hamming: (observed ^ code).count_ones() as u8,
                })
            })
            .filter(|m| m.hamming <= self.max_hamming)
            .min_by_key(|m| m.hamming)
    }
}

/// Turn an `n x n` row-major code (`bit = y * n + x`) clockwise by `rot`
/// quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    (0..rot & 3).fold(code, |c, _| quarter_turn(c, n))
}

fn quarter_turn(code: u64, n: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            // Destination (x, y) comes from source column y, row n - 1 - x.
            let bit = (code >> ((n - 1 - x) * n + y)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}
