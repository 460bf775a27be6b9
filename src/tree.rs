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

//! The concurrent search tree: `State -> VisitStats`, one lock per
//! entry, no global tree lock. Transpositions collapse naturally
//! because nodes key on state.

use crate::board::State;
use crate::moves::Move;
use crate::nn::Policy;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
pub struct ActionStats {
    pub n: u32,
    pub q: f32,
    pub p: f32,
    pub next: Option<State>,
}

impl Default for ActionStats {
    fn default() -> Self {
        ActionStats {
            n: 0,
            q: 0.0,
            p: 0.0,
            next: None,
        }
    }
}

pub struct VisitStats {
    pub sum_n: u32,
    pub w: f32,
    pub p: Option<Policy>,
    pub legal_moves: Vec<Move>,
    pub waiting: bool,
    pub visitors: Vec<Trajectory>,
    pub edges: HashMap<Move, ActionStats>,
}

impl VisitStats {
    /// A node starts with `sum_n=1` (the expansion visit) and
    /// `waiting=true` until the broker delivers its prior.
    pub fn expanding(legal_moves: Vec<Move>) -> VisitStats {
        VisitStats {
            sum_n: 1,
            w: 0.0,
            p: None,
            legal_moves,
            waiting: true,
            visitors: Vec::new(),
            edges: HashMap::new(),
        }
    }
}

pub type Node = Arc<Mutex<VisitStats>>;

/// One simulation's path from the root: `states[i+1] == step(states[i], moves[i])`.
#[derive(Clone, Debug)]
pub struct Trajectory {
    pub states: Vec<State>,
    pub moves: Vec<Move>,
}

impl Trajectory {
    pub fn root(state: State) -> Trajectory {
        Trajectory {
            states: vec![state],
            moves: Vec::new(),
        }
    }

    pub fn leaf(&self) -> &State {
        self.states.last().expect("trajectory always has a leaf")
    }

    pub fn push(&mut self, mv: Move, next: State) {
        self.moves.push(mv);
        self.states.push(next);
    }

    /// True if `state` occurs strictly before the current leaf.
    pub fn revisits(&self, state: &State) -> bool {
        self.states[..self.states.len() - 1]
            .iter()
            .any(|s| s == state)
    }
}

pub struct Tree {
    nodes: DashMap<State, Node>,
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            nodes: DashMap::new(),
        }
    }

    pub fn get(&self, state: &State) -> Option<Node> {
        self.nodes.get(state).map(|entry| entry.clone())
    }

    /// Atomic get-or-create: `make` runs at most once per absent key,
    /// under the map's own insertion guard, never under a node's own
    /// `Mutex`.
    pub fn get_or_create_with<F: FnOnce() -> VisitStats>(&self, state: &State, make: F) -> (Node, bool) {
        match self.nodes.entry(state.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let node = Arc::new(Mutex::new(make()));
                entry.insert(node.clone());
                (node, true)
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}
