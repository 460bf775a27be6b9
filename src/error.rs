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

use thiserror::Error;

/// Structural failures that propagate to the caller. Recoverable
/// search-level conditions (cycles, terminals, resignation) are never
/// represented here -- they become back-up values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("illegal move {mv} in state {state}")]
    IllegalMove { mv: String, state: String },

    #[error("malformed board placement `{0}`")]
    MalformedState(String),

    #[error("broker pipe disconnected")]
    PipeClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
