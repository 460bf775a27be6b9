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

//! Maps a canonical state to the fixed-shape `(14, 10, 9)` input tensor.

use crate::board::{State, HEIGHT, WIDTH};
use crate::error::Result;

pub const PLANES: usize = 14;
const PLANE_ORDER: [char; PLANES] = [
    'K', 'A', 'B', 'N', 'R', 'C', 'P', 'k', 'a', 'b', 'n', 'r', 'c', 'p',
];

/// Row-major `(plane, row, file)` flattened tensor, one-hot per piece
/// identity. Input must already be in canonical frame.
pub fn encode(state: &State) -> Result<Vec<f32>> {
    let board = state.to_board()?;
    let mut tensor = vec![0f32; PLANES * HEIGHT * WIDTH];
    for row in 0..HEIGHT {
        for file in 0..WIDTH {
            let Some(piece) = board.get(row, file) else {
                continue;
            };
            let ch = piece.to_char();
            let plane = PLANE_ORDER
                .iter()
                .position(|&c| c == ch)
                .expect("every piece character has a plane");
            tensor[plane * HEIGHT * WIDTH + row * WIDTH + file] = 1.0;
        }
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_the_fixed_shape() {
        let tensor = encode(&State::initial()).unwrap();
        assert_eq!(tensor.len(), PLANES * HEIGHT * WIDTH);
    }

    #[test]
    fn flip_involution_preserves_encoding() {
        let state = State::initial();
        let twice_flipped = state.flip().flip();
        assert_eq!(encode(&twice_flipped).unwrap(), encode(&state).unwrap());
    }

    #[test]
    fn red_king_occupies_the_k_plane_at_its_square() {
        let state = State::new("4k4/9/9/9/9/9/9/9/9/4K4");
        let tensor = encode(&state).unwrap();
        // plane 0 is 'K', red king at row 9 file 4
        let idx = 0 * HEIGHT * WIDTH + 9 * WIDTH + 4;
        assert_eq!(tensor[idx], 1.0);
    }
}
