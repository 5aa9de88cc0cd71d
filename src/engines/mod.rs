pub mod analysis;
pub mod evaluation;
pub mod generation;
pub mod grid;

use crate::error::{NeurofitError, Result};

/// Worker pool for parallel evaluation; `workers == 0` uses rayon's default.
pub(crate) fn worker_pool(workers: usize) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if workers > 0 {
        builder = builder.num_threads(workers);
    }
    builder
        .build()
        .map_err(|e| NeurofitError::Configuration(format!("Failed to create thread pool: {}", e)))
}
