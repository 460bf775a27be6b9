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

//! Board representation and the canonical state string.
//!
//! Row 0 is the first `/`-separated rank segment of the placement
//! string; row 9 is the last. In canonical frame the mover's pieces
//! are always lowercase and occupy rows 0..=4 before crossing the
//! river -- see `flip`.

use crate::error::{Error, Result};
use std::fmt;

pub const WIDTH: usize = 9;
pub const HEIGHT: usize = 10;

pub const INITIAL_PLACEMENT: &str =
    "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PieceKind {
    King,
    Advisor,
    Bishop,
    Knight,
    Rook,
    Cannon,
    Pawn,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn from_char(c: char) -> Option<Piece> {
        let color = if c.is_ascii_uppercase() {
            Color::Red
        } else {
            Color::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'k' => PieceKind::King,
            'a' => PieceKind::Advisor,
            'b' => PieceKind::Bishop,
            'n' => PieceKind::Knight,
            'r' => PieceKind::Rook,
            'c' => PieceKind::Cannon,
            'p' => PieceKind::Pawn,
            _ => return None,
        };
        Some(Piece { kind, color })
    }

    pub fn to_char(self) -> char {
        let c = match self.kind {
            PieceKind::King => 'k',
            PieceKind::Advisor => 'a',
            PieceKind::Bishop => 'b',
            PieceKind::Knight => 'n',
            PieceKind::Rook => 'r',
            PieceKind::Cannon => 'c',
            PieceKind::Pawn => 'p',
        };
        match self.color {
            Color::Red => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

/// A parsed 10x9 grid. Cheap to rebuild from a `State`; callers on a
/// hot path should prefer working with the `State` string directly
/// when only a handful of cells need inspecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; WIDTH]; HEIGHT],
}

impl Board {
    pub fn empty() -> Board {
        Board {
            cells: [[None; WIDTH]; HEIGHT],
        }
    }

    pub fn initial() -> Board {
        Board::parse(INITIAL_PLACEMENT).expect("INITIAL_PLACEMENT is well-formed")
    }

    pub fn get(&self, row: usize, file: usize) -> Option<Piece> {
        self.cells[row][file]
    }

    pub fn set(&mut self, row: usize, file: usize, piece: Option<Piece>) {
        self.cells[row][file] = piece;
    }

    pub fn parse(placement: &str) -> Result<Board> {
        let placement = placement.split_whitespace().next().unwrap_or("");
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != HEIGHT {
            return Err(Error::MalformedState(placement.to_string()));
        }

        let mut board = Board::empty();
        for (row, rank) in ranks.iter().enumerate() {
            let mut file = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c)
                        .ok_or_else(|| Error::MalformedState(placement.to_string()))?;
                    if file >= WIDTH {
                        return Err(Error::MalformedState(placement.to_string()));
                    }
                    board.set(row, file, Some(piece));
                    file += 1;
                }
            }
            if file != WIDTH {
                return Err(Error::MalformedState(placement.to_string()));
            }
        }
        Ok(board)
    }

    pub fn to_state(&self) -> State {
        let mut ranks = Vec::with_capacity(HEIGHT);
        for row in 0..HEIGHT {
            let mut rank = String::new();
            let mut empties = 0u32;
            for file in 0..WIDTH {
                match self.get(row, file) {
                    Some(piece) => {
                        if empties > 0 {
                            rank.push_str(&empties.to_string());
                            empties = 0;
                        }
                        rank.push(piece.to_char());
                    }
                    None => empties += 1,
                }
            }
            if empties > 0 {
                rank.push_str(&empties.to_string());
            }
            ranks.push(rank);
        }
        State(ranks.join("/"))
    }
}

/// A canonical Xiangqi placement string. See the module docs for the
/// row-numbering and mover-case conventions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct State(String);

impl State {
    pub fn new(s: impl Into<String>) -> State {
        State(s.into())
    }

    pub fn initial() -> State {
        State::new(INITIAL_PLACEMENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_board(&self) -> Result<Board> {
        Board::parse(&self.0)
    }

    /// Reverses rank order and swaps case. Applied to normalize
    /// side-to-move into the canonical (lowercase-mover) frame, and
    /// unconditionally by `rules::step` after every move.
    pub fn flip(&self) -> State {
        let ranks: Vec<String> = self
            .0
            .split('/')
            .rev()
            .map(|rank| {
                rank.chars()
                    .map(|c| {
                        if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else {
                            c.to_ascii_uppercase()
                        }
                    })
                    .collect()
            })
            .collect();
        State(ranks.join("/"))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_board_round_trips() {
        let board = Board::initial();
        assert_eq!(board.to_state().as_str(), INITIAL_PLACEMENT);
    }

    #[test]
    fn flip_is_an_involution() {
        let state = State::initial();
        assert_eq!(state.flip().flip(), state);
    }

    #[test]
    fn flip_swaps_case_and_reverses_ranks() {
        let state = State::new("4k4/9/9/9/9/9/9/9/9/4K4");
        assert_eq!(state.flip().as_str(), "4k4/9/9/9/9/9/9/9/9/4K4");
    }

    #[test]
    fn malformed_placement_is_rejected() {
        assert!(Board::parse("not-a-board").is_err());
    }
}
