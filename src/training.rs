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

//! The `(state, policy, z)` triples a completed game emits for
//! training.

use crate::board::State;
use crate::nn::Policy;

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    pub state: State,
    pub policy: Policy,
    pub z: f32,
}

/// Assigns `z` to the last recorded `(state, policy)` pair and
/// alternates sign walking back through earlier plies, since each ply
/// is from the mover-at-the-time's own canonical perspective.
pub fn finish_game(history: Vec<(State, Policy)>, z: f32) -> Vec<TrainingSample> {
    let mut samples: Vec<TrainingSample> = Vec::with_capacity(history.len());
    let mut value = z;
    for (state, policy) in history.into_iter().rev() {
        samples.push(TrainingSample { state, policy, z: value });
        value = -value;
    }
    samples.reverse();
    samples
}
