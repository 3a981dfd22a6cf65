//! Solver sessions and the backend seam.
//!
//! A [`Session`] collects the hard and weighted soft formulas of a single
//! randomization call. It is created fresh per call and handed to a
//! [`Backend`], which answers with a [`Verdict`].

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{BackendError, FormulaError};
use crate::id::VarId;
use crate::sort::{Literal, Sort};
use crate::term::Term;

/// Soft constraint weights for the two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weights {
    /// Weight of each per-bit uniformity coin.
    pub uniformity: u32,
    /// Weight of each declared soft constraint.
    pub declared: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            uniformity: 1,
            declared: 1000,
        }
    }
}

/// Formulas of one randomization call.
#[derive(Debug)]
pub struct Session {
    hard: Vec<Term>,
    soft: Vec<(Term, u32)>,
    weights: Weights,
    bias_integers: bool,
    timeout: Option<Duration>,
    coins: StdRng,
}

impl Session {
    /// Creates an empty session whose coin flips are seeded by `seed`.
    pub fn new(weights: Weights, seed: u64) -> Self {
        Self {
            hard: Vec::new(),
            soft: Vec::new(),
            weights,
            bias_integers: true,
            timeout: None,
            coins: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables the per-bit bias on integer variables.
    pub fn with_integer_bias(mut self, enabled: bool) -> Self {
        self.bias_integers = enabled;
        self
    }

    /// Asserts a formula that must hold.
    ///
    /// # Errors
    ///
    /// Returns an error if the formula is malformed or not boolean.
    pub fn add_hard(&mut self, formula: Term) -> Result<(), FormulaError> {
        check_boolean(&formula)?;
        self.hard.push(formula);
        Ok(())
    }

    /// Adds a weighted goal.
    pub fn add_soft(&mut self, formula: Term, weight: u32) -> Result<(), FormulaError> {
        check_boolean(&formula)?;
        self.soft.push((formula, weight));
        Ok(())
    }

    /// Adds a goal at the declared tier.
    pub fn add_declared(&mut self, formula: Term) -> Result<(), FormulaError> {
        self.add_soft(formula, self.weights.declared)
    }

    /// Adds a goal at the uniformity tier.
    pub fn add_uniformity(&mut self, formula: Term) -> Result<(), FormulaError> {
        self.add_soft(formula, self.weights.uniformity)
    }

    /// Auxiliary bit-vector owned by `owner` (`v<id>_bits`).
    pub fn aux_bits(&self, owner: VarId, width: u32) -> Term {
        Term::symbol(format!("{}_bits", owner.symbol()), Sort::unsigned(width))
    }

    /// Independent fair coin.
    pub fn coin(&mut self) -> bool {
        self.coins.random_bool(0.5)
    }

    /// Adds one uniformity goal per bit of `bits`, pinning it to a coin.
    pub fn bias_bits(&mut self, bits: &Term, width: u32) -> Result<(), FormulaError> {
        for b in 0..width {
            let coin = self.coin() as u64;
            self.add_uniformity(bits.bit(b).eq(Term::bits(coin, 1)))?;
        }
        Ok(())
    }

    pub fn bias_integers(&self) -> bool {
        self.bias_integers
    }

    pub fn hard(&self) -> &[Term] {
        &self.hard
    }

    pub fn soft(&self) -> &[(Term, u32)] {
        &self.soft
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.soft.is_empty()
    }

    /// Every free symbol used by the session's formulas.
    pub fn symbols(&self) -> BTreeMap<String, Sort> {
        let mut out = BTreeMap::new();
        for term in self.hard.iter().chain(self.soft.iter().map(|(t, _)| t)) {
            term.collect_symbols(&mut out);
        }
        out
    }
}

fn check_boolean(formula: &Term) -> Result<(), FormulaError> {
    match formula.sort()? {
        Sort::Bool => Ok(()),
        other => Err(FormulaError::NotBoolean(other)),
    }
}

/// Values assigned by a satisfying model, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    values: BTreeMap<String, Literal>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, value: Literal) {
        self.values.insert(symbol.into(), value);
    }

    pub fn get(&self, symbol: &str) -> Option<&Literal> {
        self.values.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Literal)> for Model {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a satisfiability query.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Sat(Model),
    Unsat,
    /// The backend gave up; carries its reason.
    Unknown(String),
}

/// A solver able to decide a [`Session`].
pub trait Backend {
    /// Decides the session, maximizing the total weight of satisfied soft
    /// formulas subject to all hard formulas.
    fn check(&mut self, session: &Session) -> Result<Verdict, BackendError>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn check(&mut self, session: &Session) -> Result<Verdict, BackendError> {
        (**self).check(session)
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn check(&mut self, session: &Session) -> Result<Verdict, BackendError> {
        (**self).check(session)
    }
}
