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

//! Root exploration noise: a draw from `Dirichlet(alpha)` over `n`
//! categories, built from independent Gamma draws (there is no
//! dedicated Dirichlet distribution in `rand_distr` prior to 0.5).

use rand::Rng;
use rand_distr::{Distribution, Gamma};

pub fn sample<R: Rng + ?Sized>(rng: &mut R, alpha: f32, n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let gamma = Gamma::new(alpha as f64, 1.0).expect("alpha must be positive");
    let draws: Vec<f64> = (0..n).map(|_| gamma.sample(rng)).collect();
    let sum: f64 = draws.iter().sum();
    if sum <= 0.0 {
        return vec![1.0 / n as f32; n];
    }
    draws.into_iter().map(|x| (x / sum) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sample_is_a_probability_distribution() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = sample(&mut rng, 0.3, 10);
        assert_eq!(noise.len(), 10);
        let sum: f32 = noise.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(noise.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn zero_categories_yields_empty_vector() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample(&mut rng, 0.3, 0).is_empty());
    }
}
