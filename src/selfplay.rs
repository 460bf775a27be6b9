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

//! Plays one self-play game to completion, driving a `Player` ply by
//! ply and turning the result into training samples.

use crate::board::State;
use crate::error::Result;
use crate::mcts::param::Config;
use crate::mcts::Player;
use crate::repetition::RepetitionTracker;
use crate::rules;
use crate::training::{self, TrainingSample};
use log::info;

const REPETITION_HISTORY: usize = 8;
/// Temperature is annealed to near-zero after this many plies, as in
/// the reference self-play schedule.
const TEMPERATURE_CUTOFF_PLY: u32 = 30;

pub struct GameRecord {
    pub samples: Vec<TrainingSample>,
    pub resigned: bool,
    pub plies: u32,
}

/// Plays a single game against itself with `player`, returning the
/// training samples for every ply.
pub fn play_one_game(player: &Player, config: &Config) -> Result<GameRecord> {
    let mut state = State::initial();
    let mut history: Vec<(State, crate::nn::Policy)> = Vec::new();
    let mut repetition: RepetitionTracker<REPETITION_HISTORY> = RepetitionTracker::new();
    let mut low_q_streak = 0u32;
    let mut ply = 0u32;
    let mut z = 0.0f32;
    let mut resigned = false;

    loop {
        let outcome = rules::game_over(&state);
        if outcome != 0 {
            z = outcome as f32;
            break;
        }
        if repetition.is_draw() {
            z = 0.0;
            break;
        }
        if ply >= config.max_game_length {
            z = rules::material_eval(&state);
            break;
        }

        let temperature = if ply < TEMPERATURE_CUTOFF_PLY { 1.0 } else { 1e-3 };
        let (mv, policy, best_q) = player.action(&state, temperature, true)?;

        if let Some(threshold) = config.resign_threshold {
            if best_q < threshold && ply >= config.min_resign_turn {
                low_q_streak += 1;
            } else {
                low_q_streak = 0;
            }
            if low_q_streak >= 2 {
                z = -1.0;
                resigned = true;
                break;
            }
        }

        history.push((state.clone(), policy));
        repetition.push(mv);
        state = rules::step(&state, mv)?;
        ply += 1;
    }

    info!("self-play game finished after {ply} plies, z={z}, resigned={resigned}");
    let samples = training::finish_game(history, z);
    Ok(GameRecord { samples, resigned, plies: ply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::nn::{Network, Policy};
    use std::sync::atomic::AtomicBool;
    use std::thread;

    struct UniformNetwork;

    impl Network for UniformNetwork {
        fn predict_on_batch(&self, batch: &[Vec<f32>]) -> (Vec<Policy>, Vec<f32>) {
            let policies = batch
                .iter()
                .map(|_| vec![1.0; crate::moves::alphabet_len()])
                .collect();
            let values = batch.iter().map(|_| 0.0).collect();
            (policies, values)
        }
    }

    #[test]
    fn a_short_game_terminates_and_emits_samples() {
        let mut broker = Broker::new();
        let pipe = broker.connect();
        let shutdown = AtomicBool::new(false);
        let network = UniformNetwork;
        let broker_thread = thread::spawn(move || broker.run(&network, &shutdown));

        let config = Config {
            simulation_num_per_move: 8,
            search_threads: 2,
            max_game_length: 6,
            resign_threshold: None,
            ..Config::default()
        };
        let player = Player::new(pipe, config.clone());
        let record = play_one_game(&player, &config).unwrap();

        assert_eq!(record.samples.len(), record.plies as usize);
        for sample in &record.samples {
            assert!((-1.0..=1.0).contains(&sample.z));
        }

        let _ = broker_thread;
    }
}
