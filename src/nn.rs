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

//! The external policy/value network interface. The network itself
//! is out of scope -- the core only needs something that implements
//! this trait.

/// A probability distribution over the move alphabet `L`.
pub type Policy = Vec<f32>;

pub trait Network: Send + Sync {
    /// Blocking. Returns `(policies, values)` in the same row order as
    /// `batch`.
    fn predict_on_batch(&self, batch: &[Vec<f32>]) -> (Vec<Policy>, Vec<f32>);
}
