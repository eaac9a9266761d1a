//! Execution planning: flatten test data into the sequence sent for prediction.

use crate::types::{Example, TestData};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// The flat examples of one run and where each of them belongs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionPlan {
    /// Examples in the order they are sent to the predictor.
    pub examples: Vec<Example>,
    /// Original case index for each entry of `examples`.
    pub result_indexes: Vec<usize>,
    /// Selected case indices, `None` when every case runs.
    pub run_idxs: Option<Vec<usize>>,
}

impl ExecutionPlan {
    /// Build the plan for a run.
    ///
    /// With `subsample`, `min(subsample, data.len())` distinct cases are drawn
    /// with an RNG seeded from `seed` and kept in ascending order. Groups are
    /// always expanded whole.
    #[must_use]
    pub fn build(data: &TestData, subsample: Option<usize>, seed: Option<u64>) -> Self {
        let run_idxs = subsample
            .map(|n| sample_indices(data.len(), n, seed))
            .filter(|picked| picked.len() < data.len());

        let selected: Vec<usize> = run_idxs
            .clone()
            .unwrap_or_else(|| (0..data.len()).collect());

        let mut examples = Vec::with_capacity(selected.len());
        let mut result_indexes = Vec::with_capacity(selected.len());
        for &index in &selected {
            for example in data.case(index) {
                examples.push(example.clone());
                result_indexes.push(index);
            }
        }

        Self {
            examples,
            result_indexes,
            run_idxs,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// RNG for every sampling entry point. Without a seed, draws from OS entropy.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Pick `min(amount, len)` distinct indices below `len`, sorted ascending.
#[must_use]
pub fn sample_indices(len: usize, amount: usize, seed: Option<u64>) -> Vec<usize> {
    let mut rng = seeded_rng(seed);
    let mut picked = rand::seq::index::sample(&mut rng, len, amount.min(len)).into_vec();
    picked.sort_unstable();
    picked
}
