//! z3 backend.
//!
//! Each check lowers the session into a fresh z3 optimization context:
//! hard formulas are asserted, soft formulas become weighted MaxSMT goals.
//! Values of the session's symbols are read back through the model.

use std::time::{Duration, Instant};

use randforge_config::RandomizeConfig;
use randforge_core::{Backend, BackendError, Model, Session, Verdict};
use tracing::{debug, trace};
use z3::{Config, Context, Optimize, SatResult};

use crate::lower::Lowering;

/// Solves sessions with z3.
#[derive(Debug, Clone, Default)]
pub struct Z3Backend {
    timeout: Option<Duration>,
}

impl Z3Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout used when the session does not carry its own.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &RandomizeConfig) -> Self {
        Self::new().with_timeout(config.timeout())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Backend for Z3Backend {
    fn check(&mut self, session: &Session) -> Result<Verdict, BackendError> {
        let started = Instant::now();

        let mut cfg = Config::new();
        if let Some(timeout) = session.timeout().or(self.timeout) {
            cfg.set_timeout_msec(timeout.as_millis() as u64);
        }
        let ctx = Context::new(&cfg);
        let lowering = Lowering::new(&ctx);
        let optimize = Optimize::new(&ctx);

        for formula in session.hard() {
            optimize.assert(&lowering.boolean(formula)?);
        }
        for (formula, weight) in session.soft() {
            optimize.assert_soft(&lowering.boolean(formula)?, *weight, None);
        }
        trace!(goals = %optimize, "z3 goals");

        let verdict = match optimize.check(&[]) {
            SatResult::Sat => {
                let model = optimize
                    .get_model()
                    .ok_or_else(|| BackendError::Solver("z3 reported sat without a model".into()))?;
                let mut values = Model::new();
                for (symbol, sort) in session.symbols() {
                    match lowering.read(&model, &symbol, sort) {
                        Some(value) => values.insert(symbol, value),
                        None => trace!(symbol = %symbol, "No value in z3 model"),
                    }
                }
                Verdict::Sat(values)
            }
            SatResult::Unsat => Verdict::Unsat,
            SatResult::Unknown => Verdict::Unknown(
                optimize
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        };

        debug!(
            event = "solver_check",
            hard = session.hard().len(),
            soft = session.soft().len(),
            sat = matches!(verdict, Verdict::Sat(_)),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "z3 check finished"
        );
        Ok(verdict)
    }
}
