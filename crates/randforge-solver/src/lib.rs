//! RandForge Solver
//!
//! This crate connects the backend-agnostic randomizer to z3:
//! - Lowering of terms to typed z3 ASTs
//! - The `Z3Backend`

pub mod lower;
pub mod z3_backend;

pub use lower::{Lowered, Lowering};
pub use z3_backend::Z3Backend;

use randforge_config::RandomizeConfig;
use randforge_core::Randomizer;

/// Builds a z3-backed randomizer from configuration.
///
/// The seed comes from `random_seed` when set, otherwise from the OS.
pub fn randomizer_from_config(config: &RandomizeConfig) -> Randomizer<Z3Backend> {
    let randomizer = Randomizer::new(Z3Backend::from_config(config))
        .with_weights(config.weights())
        .with_timeout(config.timeout())
        .with_integer_bias(config.bias.integers);
    match config.random_seed {
        Some(seed) => randomizer.with_seed(seed),
        None => randomizer,
    }
}
