//! Randomization entry points that hide backend wiring.
//!
//! `randforge.toml` is read from the working directory on first use and
//! cached for the rest of the process; a missing file means defaults. Each
//! call builds a fresh z3-backed randomizer. Per-call seeds come from a
//! thread-local generator, seeded from the config's `random_seed` on first
//! use or explicitly through [`seed`].

use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use randforge_config::{ConfigError, RandomizeConfig};
use randforge_core::{Aggregate, Constraint, Native, Randomizer, Result, Var};
use randforge_solver::{randomizer_from_config, Z3Backend};
use tracing::{debug, trace, warn};

/// Configuration file looked up by [`Randomize::randomize`].
pub const CONFIG_FILE: &str = "randforge.toml";

static CONFIG: OnceLock<RandomizeConfig> = OnceLock::new();

thread_local! {
    static SEEDS: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Reseeds this thread's randomization; subsequent calls are reproducible.
pub fn seed(seed: u64) {
    SEEDS.with(|seeds| *seeds.borrow_mut() = Some(StdRng::seed_from_u64(seed)));
}

fn next_seed(config: &RandomizeConfig) -> u64 {
    SEEDS.with(|seeds| {
        let mut seeds = seeds.borrow_mut();
        let rng = seeds.get_or_insert_with(|| match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        });
        rng.random()
    })
}

/// Reads the configuration at `path`, falling back to defaults.
///
/// A missing file is silent; an unreadable or invalid one is reported
/// with a warning.
fn load_config(path: &Path) -> RandomizeConfig {
    match RandomizeConfig::load(path) {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded randomization config");
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            RandomizeConfig::default()
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Ignoring randomization config, using defaults"
            );
            RandomizeConfig::default()
        }
    }
}

fn config() -> &'static RandomizeConfig {
    CONFIG.get_or_init(|| load_config(Path::new(CONFIG_FILE)))
}

fn randomizer() -> Randomizer<Z3Backend> {
    #[cfg(feature = "console")]
    crate::console::init();

    let config = config();
    let seed = next_seed(config);
    trace!(seed, "Building randomizer");
    randomizer_from_config(config).with_seed(seed)
}

/// `randomize()` for aggregates.
pub trait Randomize: Aggregate {
    /// Solves the aggregate's variables against its enabled constraints.
    ///
    /// On failure every variable keeps its previous value.
    fn randomize(&mut self) -> Result<()> {
        randomizer().randomize(self)
    }

    /// Like [`randomize`](Randomize::randomize) with extra constraints for
    /// this call only.
    fn randomize_with(&mut self, hard: &[Constraint], soft: &[Constraint]) -> Result<()> {
        randomizer().randomize_with(self, hard, soft)
    }
}

impl<A: Aggregate> Randomize for A {}

/// `randomize()` for standalone variables.
pub trait RandomizeVar {
    /// Draws a value satisfying the variable's own constraints.
    fn randomize(&mut self) -> Result<()>;
}

impl<T: Native> RandomizeVar for Var<T> {
    fn randomize(&mut self) -> Result<()> {
        randomizer().randomize_var(self)
    }
}
