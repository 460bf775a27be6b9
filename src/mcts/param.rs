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

//! Search hyperparameters, loaded from a TOML config file or defaulted
//! to AlphaZero-paper-style values.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation_num_per_move: u32,
    pub search_threads: usize,
    pub c_puct: f32,
    pub noise_eps: f32,
    pub dirichlet_alpha: f32,
    pub tau_decay_rate: f32,
    pub virtual_loss: u32,
    /// Resign if the root's best action value drops below this for
    /// `min_resign_turn` plies in a row. `None` disables resignation.
    pub resign_threshold: Option<f32>,
    pub min_resign_turn: u32,
    pub max_game_length: u32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            simulation_num_per_move: 800,
            search_threads: 16,
            c_puct: 1.5,
            noise_eps: 0.25,
            dirichlet_alpha: 0.2,
            tau_decay_rate: 0.98,
            virtual_loss: 3,
            resign_threshold: Some(-0.8),
            min_resign_turn: 5,
            max_game_length: 200,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> crate::error::Result<Config> {
        toml::from_str(text).map_err(|e| crate::error::Error::MalformedState(e.to_string()))
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).expect("Config always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = config.to_toml();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(Config::from_toml("not = [valid").is_err());
    }
}
