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

//! Fixed-size move history used to adjudicate repetition draws. A
//! cyclic game is detected when the move played four plies ago recurs;
//! a run of four such recurrences in a row is called a draw.

use crate::moves::Move;

const LOOKBACK: usize = 4;

/// Circular buffer over the last `N` moves, `N >= LOOKBACK`.
pub struct RepetitionTracker<const N: usize> {
    position: usize,
    filled: usize,
    buf: [Option<Move>; N],
    streak: u32,
}

impl<const N: usize> RepetitionTracker<N> {
    pub fn new() -> RepetitionTracker<N> {
        assert!(N >= LOOKBACK, "history must be at least {LOOKBACK} deep");
        RepetitionTracker {
            position: 0,
            filled: 0,
            buf: [None; N],
            streak: 0,
        }
    }

    /// Records `mv` as having just been played and updates the
    /// repetition streak. Returns the move played `LOOKBACK` plies
    /// earlier, if any, so callers can veto repeating it.
    pub fn push(&mut self, mv: Move) -> Option<Move> {
        let four_plies_ago = self.at(LOOKBACK);
        if four_plies_ago == Some(mv) {
            self.streak += 1;
        } else {
            self.streak = 0;
        }

        self.buf[self.position] = Some(mv);
        self.position = (self.position + 1) % N;
        self.filled = (self.filled + 1).min(N);
        four_plies_ago
    }

    /// The move pushed `ago` pushes before the one about to be made
    /// (`ago = 1` is the previous push).
    fn at(&self, ago: usize) -> Option<Move> {
        if ago == 0 || ago > self.filled {
            return None;
        }
        let index = (self.position + N - ago) % N;
        self.buf[index]
    }

    /// True once the same move has recurred every `LOOKBACK` plies for
    /// four consecutive cycles.
    pub fn is_draw(&self) -> bool {
        self.streak >= 4
    }
}

impl<const N: usize> Default for RepetitionTracker<N> {
    fn default() -> Self {
        RepetitionTracker::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[test]
    fn four_cycles_of_the_same_pair_of_moves_is_a_draw() {
        let mut tracker: RepetitionTracker<8> = RepetitionTracker::new();
        let a = mv("a0a1");
        let b = mv("b0b1");
        for _ in 0..4 {
            tracker.push(a);
            tracker.push(b);
        }
        // after the fourth repeat of `a` (and of `b`) the streak closes
        assert!(tracker.is_draw());
    }

    #[test]
    fn non_repeating_moves_never_draw() {
        let mut tracker: RepetitionTracker<8> = RepetitionTracker::new();
        for i in 0..20 {
            let from_row = i % 9;
            let mv: Move = format!("a{from_row}b{}", (from_row + 1) % 9).parse().unwrap();
            tracker.push(mv);
        }
        assert!(!tracker.is_draw());
    }

    #[test]
    fn lookback_returns_none_before_history_fills() {
        let mut tracker: RepetitionTracker<8> = RepetitionTracker::new();
        assert_eq!(tracker.push(mv("a0a1")), None);
        assert_eq!(tracker.push(mv("a1a2")), None);
    }
}
