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

//! Legal-move generation, state transition, and terminal detection.
//!
//! Every function here operates in canonical frame: the mover's
//! pieces are always lowercase and, before crossing the river, confined
//! to rows `0..=4`. `step` always flips the result, so the state handed
//! back is canonical for the opponent.

use crate::board::{Board, Color, PieceKind, State, HEIGHT, WIDTH};
use crate::error::{Error, Result};
use crate::moves::{Move, Square};

const RIVER_ROW: i32 = 5;

fn same_color(board: &Board, row: i32, file: i32, color: Color) -> bool {
    if row < 0 || file < 0 || row as usize >= HEIGHT || file as usize >= WIDTH {
        return false;
    }
    matches!(board.get(row as usize, file as usize), Some(p) if p.color == color)
}

fn occupant(board: &Board, row: i32, file: i32) -> Option<crate::board::Piece> {
    if row < 0 || file < 0 || row as usize >= HEIGHT || file as usize >= WIDTH {
        None
    } else {
        board.get(row as usize, file as usize)
    }
}

fn push_if_legal(board: &Board, moves: &mut Vec<Move>, origin: Square, row: i32, file: i32) {
    if let Some(dest) = Square::new(file, row) {
        if !same_color(board, row, file, Color::Black) {
            moves.push(Move::new(origin, dest));
        }
    }
}

pub fn legal_moves(state: &State) -> Result<Vec<Move>> {
    let board = state.to_board()?;
    let mut moves = Vec::new();

    for row in 0..HEIGHT as i32 {
        for file in 0..WIDTH as i32 {
            let Some(piece) = occupant(&board, row, file) else {
                continue;
            };
            if piece.color != Color::Black {
                continue;
            }
            let origin = Square::new(file, row).unwrap();

            match piece.kind {
                PieceKind::King => {
                    for (df, dr) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                        let (f2, r2) = (file + df, row + dr);
                        if (3..=5).contains(&f2) && (0..=2).contains(&r2) {
                            push_if_legal(&board, &mut moves, origin, r2, f2);
                        }
                    }
                    flying_general(&board, &mut moves, origin, row, file);
                }
                PieceKind::Advisor => {
                    for (df, dr) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
                        let (f2, r2) = (file + df, row + dr);
                        if (3..=5).contains(&f2) && (0..=2).contains(&r2) {
                            push_if_legal(&board, &mut moves, origin, r2, f2);
                        }
                    }
                }
                PieceKind::Bishop => {
                    for (df, dr) in [(-2, -2), (2, -2), (2, 2), (-2, 2)] {
                        let (f2, r2) = (file + df, row + dr);
                        if r2 > 4 {
                            continue;
                        }
                        let (mf, mr) = (file + df / 2, row + dr / 2);
                        if occupant(&board, mr, mf).is_some() {
                            continue;
                        }
                        push_if_legal(&board, &mut moves, origin, r2, f2);
                    }
                }
                PieceKind::Knight => {
                    for (df, dr) in [
                        (-1i32, -2i32),
                        (1, -2),
                        (-2, -1),
                        (2, -1),
                        (-2, 1),
                        (2, 1),
                        (-1, 2),
                        (1, 2),
                    ] {
                        let (hf, hr) = if df.abs() == 2 { (file + df / 2, row) } else { (file, row + dr / 2) };
                        if occupant(&board, hr, hf).is_some() {
                            continue;
                        }
                        push_if_legal(&board, &mut moves, origin, row + dr, file + df);
                    }
                }
                PieceKind::Rook => slide(&board, &mut moves, origin, row, file, true),
                PieceKind::Cannon => cannon(&board, &mut moves, origin, row, file),
                PieceKind::Pawn => {
                    push_if_legal(&board, &mut moves, origin, row + 1, file);
                    if row >= RIVER_ROW {
                        push_if_legal(&board, &mut moves, origin, row, file - 1);
                        push_if_legal(&board, &mut moves, origin, row, file + 1);
                    }
                }
            }
        }
    }

    Ok(moves)
}

fn flying_general(board: &Board, moves: &mut Vec<Move>, origin: Square, row: i32, file: i32) {
    for r2 in (row + 1)..HEIGHT as i32 {
        match occupant(board, r2, file) {
            None => continue,
            Some(p) if p.kind == PieceKind::King && p.color == Color::Red => {
                moves.push(Move::new(origin, Square::new(file, r2).unwrap()));
                return;
            }
            Some(_) => return,
        }
    }
}

fn slide(board: &Board, moves: &mut Vec<Move>, origin: Square, row: i32, file: i32, _rook: bool) {
    for (df, dr) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
        let mut r2 = row + dr;
        let mut f2 = file + df;
        while r2 >= 0 && (r2 as usize) < HEIGHT && f2 >= 0 && (f2 as usize) < WIDTH {
            match occupant(board, r2, f2) {
                None => {
                    moves.push(Move::new(origin, Square::new(f2, r2).unwrap()));
                }
                Some(p) => {
                    if p.color != Color::Black {
                        moves.push(Move::new(origin, Square::new(f2, r2).unwrap()));
                    }
                    break;
                }
            }
            r2 += dr;
            f2 += df;
        }
    }
}

fn cannon(board: &Board, moves: &mut Vec<Move>, origin: Square, row: i32, file: i32) {
    for (df, dr) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
        let mut r2 = row + dr;
        let mut f2 = file + df;
        // slide over empties (no capture)
        while r2 >= 0 && (r2 as usize) < HEIGHT && f2 >= 0 && (f2 as usize) < WIDTH {
            if occupant(board, r2, f2).is_some() {
                break;
            }
            moves.push(Move::new(origin, Square::new(f2, r2).unwrap()));
            r2 += dr;
            f2 += df;
        }
        // jump exactly one screen piece, land on an enemy
        r2 += dr;
        f2 += df;
        while r2 >= 0 && (r2 as usize) < HEIGHT && f2 >= 0 && (f2 as usize) < WIDTH {
            if let Some(p) = occupant(board, r2, f2) {
                if p.color != Color::Black {
                    moves.push(Move::new(origin, Square::new(f2, r2).unwrap()));
                }
                break;
            }
            r2 += dr;
            f2 += df;
        }
    }
}

/// Applies `mv` to `state`, verifying it is legal, and returns the
/// canonical state for the opponent's turn.
pub fn step(state: &State, mv: Move) -> Result<State> {
    let legal = legal_moves(state)?;
    if !legal.contains(&mv) {
        return Err(Error::IllegalMove {
            mv: mv.to_string(),
            state: state.as_str().to_string(),
        });
    }
    let mut board = state.to_board()?;
    let piece = board.get(mv.from.row as usize, mv.from.file as usize);
    board.set(mv.from.row as usize, mv.from.file as usize, None);
    board.set(mv.to.row as usize, mv.to.file as usize, piece);
    Ok(board.to_state().flip())
}

/// `+1` if the opponent's king is missing (mover wins), `-1` if the
/// mover's own king is missing, else `0`.
pub fn game_over(state: &State) -> i8 {
    let s = state.as_str();
    let has_mover_king = s.contains('k');
    let has_opponent_king = s.contains('K');
    if !has_mover_king {
        -1
    } else if !has_opponent_king {
        1
    } else {
        0
    }
}

fn piece_value(kind: PieceKind) -> f32 {
    match kind {
        PieceKind::Rook => 14.0,
        PieceKind::Knight => 7.0,
        PieceKind::Bishop => 3.0,
        PieceKind::Advisor => 2.0,
        PieceKind::King => 1.0,
        PieceKind::Cannon => 5.0,
        PieceKind::Pawn => 1.0,
    }
}

/// Material heuristic used for tie-breaking adjudication only. Clamps
/// the raw ratio to `[-1, 1]` before squashing (the source instead
/// asserted this bound, which can fail under extreme imbalance).
pub fn material_eval(state: &State) -> f32 {
    let mut mover = 0.0f32;
    let mut opponent = 0.0f32;
    let mut total = 0.0f32;
    for c in state.as_str().chars() {
        let Some(piece) = crate::board::Piece::from_char(c) else {
            continue;
        };
        let value = piece_value(piece.kind);
        match piece.color {
            Color::Black => mover += value,
            Color::Red => opponent += value,
        }
        total += value;
    }
    let ratio = if total > 0.0 {
        (mover - opponent) / total
    } else {
        0.0
    };
    (3.0 * ratio.clamp(-1.0, 1.0)).tanh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::State;

    #[test]
    fn initial_position_has_forty_four_legal_moves() {
        let state = State::initial();
        assert_eq!(legal_moves(&state).unwrap().len(), 44);
    }

    #[test]
    fn cannon_needs_exactly_one_screen_to_capture() {
        // cannon and pawn are both black (same color): no capture
        let no_screen_same_color = State::new("4k4/9/9/9/9/9/9/4p4/9/4c3K");
        let moves = legal_moves(&no_screen_same_color).unwrap();
        assert!(!moves.iter().any(|m| m.to.row == 7 && m.to.file == 4));

        // cannon, one enemy screen, enemy target beyond it: legal capture
        let with_enemy_target = State::new("4k4/9/9/9/4P4/9/9/4P4/9/4c3K");
        let moves = legal_moves(&with_enemy_target).unwrap();
        assert!(moves.iter().any(|m| m.to.row == 4 && m.to.file == 4));
    }

    #[test]
    fn flying_general_ends_the_game() {
        let state = State::new("4k4/9/9/9/9/9/9/9/9/4K4");
        let moves = legal_moves(&state).unwrap();
        let flying: Move = "e0e9".parse().unwrap();
        assert!(moves.contains(&flying));

        let next = step(&state, flying).unwrap();
        assert_eq!(game_over(&next), -1);
    }

    #[test]
    fn bishop_cannot_cross_the_river() {
        // bishop at e4 (file 4, row 4): c2/g2 are reachable, c6/g6 would
        // cross the river and must never appear.
        let state = State::new("4k4/9/9/9/4b4/9/9/9/9/4K4");
        let moves = legal_moves(&state).unwrap();
        let to_c2 = moves.iter().any(|m| m.to.file == 2 && m.to.row == 2);
        let to_g2 = moves.iter().any(|m| m.to.file == 6 && m.to.row == 2);
        let crosses_river = moves.iter().any(|m| m.to.row > 4);
        assert!(to_c2 && to_g2 && !crosses_river);
    }

    #[test]
    fn material_eval_is_clamped() {
        let lopsided = State::new("4k4/9/9/9/9/9/9/9/9/RRRRKRRRR");
        let v = material_eval(&lopsided);
        assert!((-1.0..=1.0).contains(&v));
    }

    #[test]
    fn illegal_move_is_rejected() {
        let state = State::initial();
        let bogus: Move = "a0a9".parse().unwrap();
        assert!(step(&state, bogus).is_err());
    }
}
