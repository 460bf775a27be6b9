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

//! Core self-play engine for Xiangqi: board representation, rules,
//! feature encoding, a batched-inference broker, and a parallel PUCT
//! search on top of it.

pub mod board;
pub mod broker;
pub mod encode;
pub mod error;
pub mod mcts;
pub mod moves;
pub mod nn;
pub mod repetition;
pub mod rules;
pub mod selfplay;
pub mod training;
pub mod tree;

pub use board::{Board, Color, Piece, PieceKind, State};
pub use error::{Error, Result};
pub use moves::Move;
