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

//! Universal invariants checked across a handful of early-game
//! positions instead of a full random-state generator, since a
//! `proptest` strategy over arbitrary placements would mostly produce
//! malformed or already-won positions.

use proptest::prelude::*;
use xiangqi_zero::board::State;
use xiangqi_zero::moves;
use xiangqi_zero::rules;

fn reachable_states(depth: u32) -> Vec<State> {
    let mut frontier = vec![State::initial()];
    let mut all = frontier.clone();
    for _ in 0..depth {
        let mut next = Vec::new();
        for state in &frontier {
            if rules::game_over(state) != 0 {
                continue;
            }
            for mv in rules::legal_moves(state).unwrap() {
                next.push(rules::step(state, mv).unwrap());
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
        if frontier.len() > 64 {
            frontier.truncate(64);
        }
    }
    all
}

#[test]
fn every_legal_move_on_a_representative_set_of_positions_has_an_alphabet_index() {
    for state in reachable_states(4) {
        if rules::game_over(&state) != 0 {
            continue;
        }
        for mv in rules::legal_moves(&state).unwrap() {
            assert!(
                moves::index_of(mv).is_some(),
                "{mv} missing from the move alphabet"
            );
        }
    }
}

proptest! {
    #[test]
    fn every_move_returned_by_legal_moves_is_accepted_by_step(index in 0u32..200) {
        let states = reachable_states(3);
        let state = &states[index as usize % states.len()];
        for mv in rules::legal_moves(state).unwrap() {
            prop_assert!(rules::step(state, mv).is_ok());
        }
    }

    #[test]
    fn flip_is_always_its_own_inverse(index in 0u32..200) {
        let states = reachable_states(3);
        let state = &states[index as usize % states.len()];
        prop_assert_eq!(state.flip().flip(), state.clone());
    }

    #[test]
    fn a_canonical_state_always_has_lowercase_pieces_confined_near_the_mover(index in 0u32..200) {
        let states = reachable_states(2);
        let state = &states[index as usize % states.len()];
        // every legal move must originate from a lowercase (mover) piece
        let board = state.to_board().unwrap();
        for mv in rules::legal_moves(state).unwrap() {
            let piece = board.get(mv.from.row as usize, mv.from.file as usize).unwrap();
            prop_assert_eq!(piece.color, xiangqi_zero::board::Color::Black);
        }
    }
}
