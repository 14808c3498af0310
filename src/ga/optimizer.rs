use std::time::Instant;

use hashbrown::{HashMap, HashSet};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tokio::sync::{broadcast, watch};

use crate::dataset::{PairKey, SchedulingDataSet};
use crate::ga::fitness::FitnessEvaluator;
use crate::ga::individual::{
    build_individual, has_conflict, Assignment, Individual, DEFAULT_SLOT_STARTS,
};
use crate::models::{GaConfig, OptimizationProgress};

/// Result of one evolutionary run.
#[derive(Debug)]
pub struct GaOutcome {
    pub best: Individual,
    pub best_fitness: f64,
    /// Best fitness per generation, for convergence diagnostics.
    pub fitness_history: Vec<f64>,
    pub generations_run: usize,
}

/// Population-based search over candidate timetables: tournament selection,
/// pair-grouped crossover, single-point mutation, and elitism across a fixed
/// number of generations.
pub struct GeneticOptimizer<'a> {
    data: &'a SchedulingDataSet,
    config: GaConfig,
    rng: StdRng,
}

impl<'a> GeneticOptimizer<'a> {
    pub fn new(data: &'a SchedulingDataSet, config: GaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { data, config, rng }
    }

    /// Runs the search to completion. The stop signal is only observed at
    /// generation boundaries; progress sends are non-blocking and dropped
    /// when nobody subscribes.
    pub fn run(
        &mut self,
        progress: Option<&broadcast::Sender<OptimizationProgress>>,
        stop: Option<&watch::Receiver<bool>>,
    ) -> GaOutcome {
        let start = Instant::now();
        let pop_size = self.config.population_size.max(1);
        let evaluator = FitnessEvaluator::new(self.data);

        let mut population: Vec<Individual> = (0..pop_size)
            .map(|_| build_individual(self.data, &mut self.rng))
            .collect();

        let mut history: Vec<f64> = Vec::with_capacity(self.config.generations);

        for generation in 0..self.config.generations {
            if stop.is_some_and(|rx| *rx.borrow()) {
                debug!("stop requested, halting before generation {generation}");
                break;
            }

            let scores: Vec<f64> = population
                .par_iter()
                .map(|individual| evaluator.score(individual))
                .collect();
            let best_idx = argmin(&scores);
            history.push(scores[best_idx]);

            if generation % 10 == 0 {
                debug!(
                    "generation {generation}: best fitness {:.2}, {} assignments",
                    scores[best_idx],
                    population[best_idx].len()
                );
            }
            if let Some(tx) = progress {
                let _ = tx.send(OptimizationProgress {
                    generation,
                    elapsed_time: start.elapsed(),
                    best_fitness: scores[best_idx],
                    is_finished: false,
                });
            }

            let mut next: Vec<Individual> = Vec::with_capacity(pop_size);
            next.push(population[best_idx].clone()); // elitism

            while next.len() < pop_size {
                let (i1, i2) = (self.tournament(&scores), self.tournament(&scores));
                let (mut c1, mut c2) = self.crossover(&population[i1], &population[i2]);
                self.mutate(&mut c1);
                self.mutate(&mut c2);
                next.push(c1);
                if next.len() < pop_size {
                    next.push(c2);
                }
            }
            population = next;
        }

        let generations_run = history.len();
        let final_scores: Vec<f64> = population
            .par_iter()
            .map(|individual| evaluator.score(individual))
            .collect();
        let best_idx = argmin(&final_scores);
        let best_fitness = final_scores[best_idx];
        let best = population.swap_remove(best_idx);

        if let Some(tx) = progress {
            let _ = tx.send(OptimizationProgress {
                generation: generations_run,
                elapsed_time: start.elapsed(),
                best_fitness,
                is_finished: true,
            });
        }

        GaOutcome {
            best,
            best_fitness,
            fitness_history: history,
            generations_run,
        }
    }

    /// Tournament of three sampled without replacement; lowest score wins.
    fn tournament(&mut self, scores: &[f64]) -> usize {
        let entrants = rand::seq::index::sample(&mut self.rng, scores.len(), 3.min(scores.len()));
        entrants
            .iter()
            .min_by(|a, b| scores[*a].total_cmp(&scores[*b]))
            .unwrap_or(0)
    }

    /// Pair-grouped midpoint crossover. Each child inherits the complete
    /// assignment group of a pair from one parent, so multi-day and split
    /// sessions travel as a unit; the key list covers both parents plus the
    /// canonical pair list so no required pair is silently lost.
    fn crossover(&mut self, p1: &Individual, p2: &Individual) -> (Individual, Individual) {
        if !self.rng.random_bool(self.config.crossover_rate.clamp(0.0, 1.0)) {
            return (p1.clone(), p2.clone());
        }

        let g1 = group_by_pair(p1);
        let g2 = group_by_pair(p2);

        // canonical pairs first, then any stragglers found only in a parent,
        // in a deterministic order ahead of the shuffle
        let mut keys: Vec<PairKey> = Vec::new();
        let mut seen: HashSet<PairKey> = HashSet::new();
        for pair in self.data.pairs() {
            let key = pair.key();
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        for a in p1.iter().chain(p2.iter()) {
            let key = a.pair_key();
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        keys.shuffle(&mut self.rng);
        let split_point = keys.len() / 2;

        let mut child1 = Individual::new();
        let mut child2 = Individual::new();
        for (i, key) in keys.iter().enumerate() {
            let from1 = g1.get(key);
            let from2 = g2.get(key);
            let (first, second) = if i < split_point {
                (from1, from2)
            } else {
                (from2, from1)
            };
            if let Some(group) = first.or(second) {
                child1.extend(group.iter().map(|&a| a.clone()));
            }
            if let Some(group) = second.or(first) {
                child2.extend(group.iter().map(|&a| a.clone()));
            }
        }
        (child1, child2)
    }

    /// Mutates at most one assignment: either a room reassignment within the
    /// pair's eligible pool or a conflict-avoiding slot change. Members of a
    /// split group are never touched individually.
    fn mutate(&mut self, child: &mut Individual) {
        if child.is_empty() || !self.rng.random_bool(self.config.mutation_rate.clamp(0.0, 1.0)) {
            return;
        }
        let idx = self.rng.random_range(0..child.len());
        if child[idx].is_split {
            return;
        }

        if self.rng.random_bool(0.5) {
            self.mutate_room(child, idx);
        } else {
            self.mutate_slot(child, idx);
        }
    }

    fn mutate_room(&mut self, child: &mut [Assignment], idx: usize) {
        let Some(pair) = self.data.pair_demand(&child[idx].course_id) else {
            return;
        };
        if let Some(room) = pair.room_pool.choose(&mut self.rng) {
            child[idx].room_id = room.clone();
        }
    }

    fn mutate_slot(&mut self, child: &mut Individual, idx: usize) {
        let (day, duration, instructor, room, division) = {
            let a = &child[idx];
            (
                a.day.clone(),
                a.duration_minutes,
                a.instructor_id.clone(),
                a.room_id.clone(),
                a.division_id.clone(),
            )
        };
        let mut slots = DEFAULT_SLOT_STARTS.to_vec();
        slots.shuffle(&mut self.rng);
        for slot in slots {
            let end = slot + duration;
            let free = !has_conflict(
                child,
                &day,
                slot,
                end,
                &instructor,
                std::slice::from_ref(&room),
                Some(&division),
                Some(idx),
            );
            if free {
                child[idx].start_minute = slot;
                child[idx].end_minute = end;
                return;
            }
        }
        // no conflict-free candidate slot; leave the assignment unchanged
    }
}

fn argmin(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score < scores[best] {
            best = i;
        }
    }
    best
}

fn group_by_pair(individual: &Individual) -> HashMap<PairKey, Vec<&Assignment>> {
    let mut groups: HashMap<PairKey, Vec<&Assignment>> = HashMap::new();
    for a in individual {
        groups.entry(a.pair_key()).or_default().push(a);
    }
    groups
}
