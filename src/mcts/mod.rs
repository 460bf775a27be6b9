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

//! Parallel PUCT search. A `Player` owns nothing across plies except
//! its pipe to the broker and its `Config` -- the tree, the worker
//! pool and the in-flight evaluation queue are all built fresh inside
//! `action` and torn down before it returns.

pub mod dirichlet;
pub mod param;

use crate::board::State;
use crate::broker::PipeEndpoint;
use crate::encode;
use crate::error::Result;
use crate::moves::{self, Move};
use crate::nn::Policy;
use crate::rules;
use crate::tree::{ActionStats, Trajectory, Tree, VisitStats};
use log::warn;
use param::Config;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

enum Job {
    Search(Trajectory),
    Shutdown,
}

struct PendingEval {
    state: State,
    trajectory: Trajectory,
}

const SEND_LIMIT: usize = 256;
const POLL_TIMEOUT: Duration = Duration::from_millis(1);

pub struct Player {
    pipe: Arc<PipeEndpoint>,
    config: Config,
}

impl Player {
    pub fn new(pipe: PipeEndpoint, config: Config) -> Player {
        Player {
            pipe: Arc::new(pipe),
            config,
        }
    }

    /// Runs `simulation_num_per_move` PUCT simulations from `state` and
    /// returns the move to play together with the full visit-count
    /// policy (indexed by the universal move alphabet). `add_noise`
    /// mixes Dirichlet exploration noise into the root prior, as is
    /// done during self-play but not during evaluation matches.
    pub fn action(&self, state: &State, temperature: f32, add_noise: bool) -> Result<(Move, Policy, f32)> {
        let tree = Arc::new(Tree::new());
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let pending: Arc<Mutex<Vec<PendingEval>>> = Arc::new(Mutex::new(Vec::new()));
        let in_flight: Arc<Mutex<VecDeque<Vec<Trajectory>>>> = Arc::new(Mutex::new(VecDeque::new()));
        let outstanding = Arc::new(AtomicIsize::new(self.config.simulation_num_per_move as isize));
        let done = Arc::new((Mutex::new(false), Condvar::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let root_state = state.clone();

        let mut workers = Vec::new();
        for _ in 0..self.config.search_threads {
            let tree = tree.clone();
            let job_rx = job_rx.clone();
            let pending = pending.clone();
            let config = self.config.clone();
            let outstanding = outstanding.clone();
            let done = done.clone();
            workers.push(thread::spawn(move || loop {
                match job_rx.recv() {
                    Ok(Job::Search(trajectory)) => {
                        run_simulation(&tree, &pending, &config, &outstanding, &done, trajectory);
                    }
                    Ok(Job::Shutdown) | Err(_) => return,
                }
            }));
        }

        let sender = {
            let pending = pending.clone();
            let in_flight = in_flight.clone();
            let shutdown = shutdown.clone();
            let pipe = self.pipe.clone();
            thread::spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let batch: Vec<PendingEval> = {
                        let mut guard = pending.lock().unwrap();
                        let take = guard.len().min(SEND_LIMIT);
                        guard.drain(..take).collect()
                    };
                    if batch.is_empty() {
                        thread::sleep(POLL_TIMEOUT);
                        continue;
                    }
                    let mut planes = Vec::with_capacity(batch.len());
                    let mut trajectories = Vec::with_capacity(batch.len());
                    for eval in batch {
                        if let Ok(encoded) = encode::encode(&eval.state) {
                            planes.push(encoded);
                            trajectories.push(eval.trajectory);
                        }
                    }
                    if planes.is_empty() {
                        continue;
                    }
                    in_flight.lock().unwrap().push_back(trajectories);
                    if pipe.send(planes).is_err() {
                        warn!("broker pipe closed while a player was mid-search");
                        return;
                    }
                }
            })
        };

        let receiver = {
            let tree = tree.clone();
            let job_tx = job_tx.clone();
            let in_flight = in_flight.clone();
            let outstanding = outstanding.clone();
            let done = done.clone();
            let shutdown = shutdown.clone();
            let pipe = self.pipe.clone();
            let root_state = root_state.clone();
            let config = self.config.clone();
            thread::spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let response = match pipe.recv_timeout(POLL_TIMEOUT) {
                        Ok(response) => response,
                        Err(_) => continue,
                    };
                    let trajectories = match in_flight.lock().unwrap().pop_front() {
                        Some(trajectories) => trajectories,
                        None => {
                            warn!("broker response with no matching in-flight batch");
                            continue;
                        }
                    };
                    debug_assert_eq!(trajectories.len(), response.len());
                    for (trajectory, (policy, value)) in trajectories.into_iter().zip(response.into_iter()) {
                        backup_leaf_evaluation(
                            &tree,
                            &job_tx,
                            &root_state,
                            &config,
                            add_noise,
                            trajectory,
                            policy,
                            value,
                        );
                        complete_simulation(&outstanding, &done);
                    }
                }
            })
        };

        for _ in 0..self.config.simulation_num_per_move {
            job_tx
                .send(Job::Search(Trajectory::root(state.clone())))
                .expect("worker pool outlives this loop");
        }

        {
            let (lock, cvar) = &*done;
            let mut finished = lock.lock().unwrap();
            while !*finished {
                finished = cvar.wait(finished).unwrap();
            }
        }

        shutdown.store(true, Ordering::Release);
        for _ in 0..self.config.search_threads {
            let _ = job_tx.send(Job::Shutdown);
        }
        drop(job_tx);
        for worker in workers {
            let _ = worker.join();
        }
        let _ = sender.join();
        let _ = receiver.join();

        let root_node = tree
            .get(&root_state)
            .expect("the root was expanded by at least one simulation");
        let guard = root_node.lock().unwrap();
        let policy = calc_policy(&guard, &root_state)?;
        let best_q = best_root_q(&guard);
        drop(guard);

        let tempered = apply_temperature(&policy, temperature);
        let chosen = sample_index(&tempered);
        let mv = *moves::MOVE_ALPHABET
            .get(chosen)
            .expect("sampled index is within the alphabet");

        Ok((mv, tempered, best_q))
    }
}

fn run_simulation(
    tree: &Arc<Tree>,
    pending: &Arc<Mutex<Vec<PendingEval>>>,
    config: &Config,
    outstanding: &Arc<AtomicIsize>,
    done: &Arc<(Mutex<bool>, Condvar)>,
    mut trajectory: Trajectory,
) {
    loop {
        let state = trajectory.leaf().clone();
        let outcome = rules::game_over(&state);
        if outcome != 0 {
            backup_terminal(tree, &trajectory, outcome as f32);
            complete_simulation(outstanding, done);
            return;
        }
        if trajectory.revisits(&state) {
            backup_terminal(tree, &trajectory, 0.0);
            complete_simulation(outstanding, done);
            return;
        }

        let legal = match rules::legal_moves(&state) {
            Ok(legal) => legal,
            Err(_) => {
                backup_terminal(tree, &trajectory, -1.0);
                complete_simulation(outstanding, done);
                return;
            }
        };
        if legal.is_empty() {
            backup_terminal(tree, &trajectory, -1.0);
            complete_simulation(outstanding, done);
            return;
        }

        let (node, created) = tree.get_or_create_with(&state, || VisitStats::expanding(legal.clone()));
        if created {
            pending.lock().unwrap().push(PendingEval {
                state,
                trajectory,
            });
            return;
        }

        let mv = {
            let mut guard = node.lock().unwrap();
            if guard.waiting {
                guard.visitors.push(trajectory);
                return;
            }

            let mv = select_move(&guard, &legal, config.c_puct);
            guard.sum_n += config.virtual_loss;
            let stat = guard.edges.entry(mv).or_insert_with(ActionStats::default);
            stat.n += config.virtual_loss;
            mv
        };

        let next = match rules::step(&state, mv) {
            Ok(next) => next,
            Err(_) => {
                backup_terminal(tree, &trajectory, -1.0);
                complete_simulation(outstanding, done);
                return;
            }
        };
        trajectory.push(mv, next);
    }
}

/// Decrements the shared in-flight counter and wakes `Player::action`
/// once every submitted simulation -- whatever path it finished
/// through -- has reported back.
fn complete_simulation(outstanding: &AtomicIsize, done: &(Mutex<bool>, Condvar)) {
    if outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
        *done.0.lock().unwrap() = true;
        done.1.notify_all();
    }
}

fn backup_terminal(tree: &Arc<Tree>, trajectory: &Trajectory, value: f32) {
    backup_walk(tree, trajectory, value);
}

fn backup_leaf_evaluation(
    tree: &Arc<Tree>,
    job_tx: &crossbeam_channel::Sender<Job>,
    root_state: &State,
    config: &Config,
    add_noise: bool,
    trajectory: Trajectory,
    raw_policy: Policy,
    value: f32,
) {
    let leaf_state = trajectory.leaf().clone();
    let node = tree.get(&leaf_state).expect("leaf node was created before evaluation");

    let visitors = {
        let mut guard = node.lock().unwrap();
        let legal = guard.legal_moves.clone();
        let installed = install_prior(config, &raw_policy, &legal, leaf_state == *root_state && add_noise);
        for mv in &legal {
            let p = installed.get(mv).copied().unwrap_or(0.0);
            guard.edges.entry(*mv).or_insert_with(ActionStats::default).p = p;
        }
        guard.p = Some(raw_policy);
        guard.waiting = false;
        std::mem::take(&mut guard.visitors)
    };

    for visitor in visitors {
        let _ = job_tx.send(Job::Search(visitor));
    }

    let z = {
        let mut guard = node.lock().unwrap();
        guard.w += value;
        guard.w / guard.sum_n as f32
    };

    backup_walk(tree, &trajectory, z);
}

/// Normalizes the network's full-alphabet policy over the legal moves
/// at a node, optionally mixing in Dirichlet noise for root
/// exploration.
fn install_prior(
    config: &Config,
    raw_policy: &Policy,
    legal: &[Move],
    add_noise: bool,
) -> std::collections::HashMap<Move, f32> {
    let mut weights: Vec<f32> = legal
        .iter()
        .map(|mv| moves::index_of(*mv).and_then(|i| raw_policy.get(i).copied()).unwrap_or(0.0).max(0.0))
        .collect();
    let sum: f32 = weights.iter().sum();
    if sum > 1e-8 {
        for w in &mut weights {
            *w /= sum;
        }
    } else {
        let uniform = 1.0 / legal.len() as f32;
        weights = vec![uniform; legal.len()];
    }

    if add_noise {
        let mut rng = thread_rng();
        let noise = dirichlet::sample(&mut rng, config.dirichlet_alpha, legal.len());
        for (w, n) in weights.iter_mut().zip(noise.into_iter()) {
            *w = (1.0 - config.noise_eps) * *w + config.noise_eps * n;
        }
    }

    legal.iter().copied().zip(weights.into_iter()).collect()
}

/// Walks the trajectory from the leaf back to the root. The raw value
/// is only ever sign-flipped once per ply, never rescaled by an
/// ancestor's own visit count; each edge's `q` is set separately, to
/// the negation of the child node's own just-updated mean.
fn backup_walk(tree: &Arc<Tree>, trajectory: &Trajectory, leaf_value: f32) {
    let mut v = leaf_value;
    let mut child_z = leaf_value;
    for i in (0..trajectory.moves.len()).rev() {
        v = -v;
        let ancestor = tree
            .get(&trajectory.states[i])
            .expect("every ancestor on a trajectory is already in the tree");
        let mut guard = ancestor.lock().unwrap();
        guard.w += v;
        if let Some(stat) = guard.edges.get_mut(&trajectory.moves[i]) {
            stat.q = -child_z;
        }
        child_z = guard.w / guard.sum_n as f32;
    }
}

fn select_move(guard: &VisitStats, legal: &[Move], c_puct: f32) -> Move {
    let sum_n = guard.sum_n as f32;
    let mut best_mv = legal[0];
    let mut best_score = f32::NEG_INFINITY;
    for &mv in legal {
        let stat = guard.edges.get(&mv).cloned().unwrap_or_default();
        let score = if stat.n == 0 {
            f32::INFINITY
        } else {
            stat.q + c_puct * stat.p * (sum_n + 1.0).sqrt() / (1.0 + stat.n as f32)
        };
        if score > best_score {
            best_score = score;
            best_mv = mv;
        }
    }
    best_mv
}

fn calc_policy(guard: &VisitStats, _root: &State) -> Result<Policy> {
    let mut policy = vec![0f32; moves::alphabet_len()];
    let total: u32 = guard
        .legal_moves
        .iter()
        .map(|mv| guard.edges.get(mv).map(|s| s.n).unwrap_or(0))
        .sum();

    if total == 0 {
        let uniform = 1.0 / guard.legal_moves.len() as f32;
        for mv in &guard.legal_moves {
            if let Some(i) = moves::index_of(*mv) {
                policy[i] = uniform;
            }
        }
    } else {
        for mv in &guard.legal_moves {
            let n = guard.edges.get(mv).map(|s| s.n).unwrap_or(0);
            if let Some(i) = moves::index_of(*mv) {
                policy[i] = n as f32 / total as f32;
            }
        }
    }
    Ok(policy)
}

fn apply_temperature(policy: &Policy, tau: f32) -> Policy {
    if tau <= 1e-3 {
        let mut out = vec![0f32; policy.len()];
        if let Some((i, _)) = policy
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        {
            out[i] = 1.0;
        }
        return out;
    }

    let exponent = 1.0 / tau;
    let mut out: Vec<f32> = policy.iter().map(|&p| p.powf(exponent)).collect();
    let sum: f32 = out.iter().sum();
    if sum > 1e-8 {
        for p in &mut out {
            *p /= sum;
        }
    }
    out
}

fn sample_index(policy: &Policy) -> usize {
    let mut rng = thread_rng();
    let weights: Vec<f32> = policy.clone();
    let sum: f32 = weights.iter().sum();
    if sum <= 1e-8 {
        return weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
    }
    let indices: Vec<usize> = (0..weights.len()).collect();
    *indices
        .choose_weighted(&mut rng, |&i| weights[i])
        .unwrap_or(&0)
}

/// The value of the root's most-visited action, used for resignation.
fn best_root_q(guard: &VisitStats) -> f32 {
    guard
        .edges
        .values()
        .map(|stat| stat.q)
        .fold(f32::NEG_INFINITY, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::Network;
    use crate::broker::Broker;

    struct UniformNetwork;

    impl Network for UniformNetwork {
        fn predict_on_batch(&self, batch: &[Vec<f32>]) -> (Vec<Policy>, Vec<f32>) {
            let policies = batch.iter().map(|_| vec![1.0; moves::alphabet_len()]).collect();
            let values = batch.iter().map(|_| 0.0).collect();
            (policies, values)
        }
    }

    #[test]
    fn action_returns_a_legal_move_under_a_uniform_network() {
        let mut broker = Broker::new();
        let pipe = broker.connect();
        let shutdown = AtomicBool::new(false);
        let network = UniformNetwork;
        let broker_thread = thread::spawn(move || broker.run(&network, &shutdown));

        let config = Config {
            simulation_num_per_move: 16,
            search_threads: 2,
            ..Config::default()
        };
        let player = Player::new(pipe, config);
        let state = State::initial();
        let (mv, policy, _best_q) = player.action(&state, 1.0, true).unwrap();

        let legal = rules::legal_moves(&state).unwrap();
        assert!(legal.contains(&mv));
        assert!((policy.iter().sum::<f32>() - 1.0).abs() < 1e-3);

        let _ = broker_thread;
    }
}
