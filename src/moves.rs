// Copyright 2019 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The four-character move codec and the fixed universal move
//! alphabet `L` used to index policy vectors.

use crate::board::{HEIGHT, WIDTH};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Square {
    pub file: u8,
    pub row: u8,
}

impl Square {
    pub fn new(file: i32, row: i32) -> Option<Square> {
        if file >= 0 && (file as usize) < WIDTH && row >= 0 && (row as usize) < HEIGHT {
            Some(Square {
                file: file as u8,
                row: row as u8,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.row)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Move {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = Error;

    fn from_str(s: &str) -> Result<Move> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 4 {
            return Err(Error::MalformedState(s.to_string()));
        }
        let parse_square = |file_ch: char, row_ch: char| -> Option<Square> {
            if !('a'..='i').contains(&file_ch) {
                return None;
            }
            let file = file_ch as i32 - 'a' as i32;
            let row = row_ch.to_digit(10)? as i32;
            Square::new(file, row)
        };
        let from = parse_square(chars[0], chars[1]).ok_or_else(|| Error::MalformedState(s.to_string()))?;
        let to = parse_square(chars[2], chars[3]).ok_or_else(|| Error::MalformedState(s.to_string()))?;
        Ok(Move::new(from, to))
    }
}

const KNIGHT_DELTAS: [(i32, i32); 8] = [
    (-1, -2),
    (1, -2),
    (-2, -1),
    (2, -1),
    (-2, 1),
    (2, 1),
    (-1, 2),
    (1, 2),
];

/// Advisor diagonal one-step moves are not reachable from the
/// same-rank/same-file/knight-delta generation below; ported verbatim
/// from the reference implementation's hardcoded list.
const ADVISOR_EXTRA: [&str; 16] = [
    "d0e1", "e1d0", "f0e1", "e1f0", "d2e1", "e1d2", "f2e1", "e1f2", "d9e8", "e8d9", "f9e8", "e8f9",
    "d7e8", "e8d7", "f7e8", "e8f7",
];

/// Bishop two-square diagonal moves, likewise ported verbatim: the
/// seven-point elephant lattice reachable from the real starting
/// squares `c`/`g`, including the row-4/row-5 river-bar crossings.
const BISHOP_EXTRA: [&str; 32] = [
    "c0a2", "a2c0", "c0e2", "e2c0", "g0e2", "e2g0", "g0i2", "i2g0", "c4a2", "a2c4", "c4e2", "e2c4",
    "g4e2", "e2g4", "g4i2", "i2g4", "c9a7", "a7c9", "c9e7", "e7c9", "g9e7", "e7g9", "g9i7", "i7g9",
    "c5a7", "a7c5", "c5e7", "e7c5", "g5e7", "e7g5", "g5i7", "i7g5",
];

fn generate_alphabet() -> Vec<Move> {
    let mut labels = Vec::new();
    for row in 0..HEIGHT as i32 {
        for file in 0..WIDTH as i32 {
            let origin = Square::new(file, row).unwrap();
            let mut destinations: Vec<(i32, i32)> = Vec::new();
            for r2 in 0..HEIGHT as i32 {
                destinations.push((file, r2));
            }
            for f2 in 0..WIDTH as i32 {
                destinations.push((f2, row));
            }
            for (df, dr) in KNIGHT_DELTAS.iter() {
                destinations.push((file + df, row + dr));
            }
            for (f2, r2) in destinations {
                if (f2, r2) == (file, row) {
                    continue;
                }
                if let Some(dest) = Square::new(f2, r2) {
                    labels.push(Move::new(origin, dest));
                }
            }
        }
    }
    for uci in ADVISOR_EXTRA.iter().chain(BISHOP_EXTRA.iter()) {
        labels.push(uci.parse().expect("hardcoded move literal is well-formed"));
    }
    labels
}

lazy_static::lazy_static! {
    pub static ref MOVE_ALPHABET: Vec<Move> = generate_alphabet();
    pub static ref MOVE_INDEX: HashMap<Move, usize> =
        MOVE_ALPHABET.iter().enumerate().map(|(i, &m)| (m, i)).collect();
}

pub fn index_of(mv: Move) -> Option<usize> {
    MOVE_INDEX.get(&mv).copied()
}

pub fn alphabet_len() -> usize {
    MOVE_ALPHABET.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_round_trips_through_display_and_parse() {
        let mv: Move = "a0b2".parse().unwrap();
        assert_eq!(mv.to_string(), "a0b2");
    }

    #[test]
    fn flying_general_shape_is_in_the_alphabet() {
        let mv: Move = "e0e9".parse().unwrap();
        assert!(index_of(mv).is_some());
    }

    #[test]
    fn advisor_and_bishop_extras_are_indexed() {
        for uci in ADVISOR_EXTRA.iter().chain(BISHOP_EXTRA.iter()) {
            let mv: Move = uci.parse().unwrap();
            assert!(index_of(mv).is_some(), "{uci} missing from alphabet");
        }
    }

    #[test]
    fn every_move_has_a_unique_index() {
        assert_eq!(MOVE_ALPHABET.len(), MOVE_INDEX.len());
    }
}
