//! Backend-agnostic randomization.
//!
//! [`Randomizer`] drives one solve per call: it collects the variables of
//! an aggregate into a per-call [`Registry`], builds a fresh [`Session`]
//! from aggregate, local and ad hoc constraints, asks the [`Backend`] for a
//! model and writes the result back. Variables are only written once a
//! complete model is available.
//!
//! Constraints of aggregates embedded by value are part of the solve.
//! Arguments naming variables outside the solve, such as those of a
//! [`Shared`](crate::object::Shared) aggregate, are read as constants.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::constraint::{Arg, Constraint, ConstraintTable};
use crate::error::{BackendError, RandomizeError, Result};
use crate::field::collect_vars;
use crate::id::VarId;
use crate::object::{Aggregate, Named, Object};
use crate::session::{Backend, Model, Session, Verdict, Weights};
use crate::sort::Literal;
use crate::term::Term;
use crate::var::{live_value, AnyVar};


/// Per-call arena of the variables taking part in a solve.
///
/// Each variable is held once, keyed by identity. The registry lives only
/// as long as the call that built it, so lookups never see a stale
/// variable.
#[derive(Default)]
pub struct Registry<'a> {
    vars: Vec<&'a mut dyn AnyVar>,
    index: HashMap<VarId, usize>,
}

impl<'a> Registry<'a> {
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers `var`. Returns false if its identity is already present.
    pub fn insert(&mut self, var: &'a mut dyn AnyVar) -> bool {
        let id = var.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.vars.len());
        self.vars.push(var);
        true
    }

    pub fn get(&self, id: VarId) -> Option<&dyn AnyVar> {
        let slot = *self.index.get(&id)?;
        Some(&*self.vars[slot])
    }

    pub fn get_mut(&mut self, id: VarId) -> Option<&mut (dyn AnyVar + 'a)> {
        let slot = *self.index.get(&id)?;
        Some(&mut *self.vars[slot])
    }

    /// Maps a solver symbol (`v<id>`) to a registered identity.
    pub fn resolve_symbol(&self, symbol: &str) -> Option<VarId> {
        VarId::from_symbol(symbol).filter(|id| self.index.contains_key(id))
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn AnyVar + 'a)> {
        self.vars.iter().map(|v| &**v)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn AnyVar + 'a)> {
        self.vars.iter_mut().map(|v| &mut **v)
    }
}

impl<'a> FromIterator<&'a mut dyn AnyVar> for Registry<'a> {
    fn from_iter<I: IntoIterator<Item = &'a mut dyn AnyVar>>(iter: I) -> Self {
        let mut registry = Self::new();
        for var in iter {
            registry.insert(var);
        }
        registry
    }
}

/// Which registered variables receive new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    AutoRandom,
    All,
}

/// Randomizes aggregates and variables through a [`Backend`].
pub struct Randomizer<B> {
    backend: B,
    rng: StdRng,
    weights: Weights,
    timeout: Option<Duration>,
    bias_integers: bool,
}

impl<B: Backend> Randomizer<B> {
    /// Creates a randomizer seeded from the operating system.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            rng: StdRng::from_os_rng(),
            weights: Weights::default(),
            timeout: None,
            bias_integers: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_integer_bias(mut self, enabled: bool) -> Self {
        self.bias_integers = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Randomizes every auto-random variable of `aggregate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the constraints are unsatisfiable, malformed or
    /// reference dropped variables, or if the backend gives up. The
    /// aggregate's variables are left untouched in that case.
    pub fn randomize<A: Aggregate>(&mut self, aggregate: &mut A) -> Result<()> {
        self.randomize_with(aggregate, &[], &[])
    }

    /// Like [`Randomizer::randomize`], with extra constraints that apply
    /// to this call only. Their predicates receive the resolved arguments.
    pub fn randomize_with<A: Aggregate>(
        &mut self,
        aggregate: &mut A,
        hard: &[Constraint],
        soft: &[Constraint],
    ) -> Result<()> {
        aggregate.pre_randomize();
        let label = aggregate.full_name();
        let tables = constraint_tables(aggregate);
        {
            let mut registry: Registry<'_> = collect_vars(aggregate).into_iter().collect();
            self.solve(&label, &mut registry, &tables, hard, soft, Selection::AutoRandom)?;
        }
        aggregate.post_randomize();
        Ok(())
    }

    /// Randomizes a single variable through its local constraints,
    /// regardless of its auto-random flag.
    pub fn randomize_var(&mut self, var: &mut dyn AnyVar) -> Result<()> {
        let label = var.id().symbol();
        let mut registry = Registry::new();
        registry.insert(var);
        self.solve(&label, &mut registry, &[], &[], &[], Selection::All)
    }

    fn solve(
        &mut self,
        label: &str,
        registry: &mut Registry<'_>,
        tables: &[(String, ConstraintTable)],
        hard: &[Constraint],
        soft: &[Constraint],
        selection: Selection,
    ) -> Result<()> {
        let started = Instant::now();
        debug!(
            event = "randomize_start",
            object = %label,
            variables = registry.len(),
            "Randomizing"
        );

        let mut bindings: HashMap<VarId, Term> = HashMap::new();
        let mut selected: HashSet<VarId> = HashSet::new();
        for var in registry.iter_mut() {
            let id = var.id();
            if selection == Selection::All || var.is_auto_random() {
                bindings.insert(id, var.term());
                selected.insert(id);
            } else {
                bindings.insert(id, var.current());
            }
        }

        let resolve = |constraint: &str, arg: &Arg| -> Result<Term> {
            match arg {
                Arg::Term(term) => Ok(term.clone()),
                Arg::Var(id) => bindings
                    .get(id)
                    .cloned()
                    .or_else(|| live_value(*id))
                    .ok_or_else(|| RandomizeError::UnknownArgument {
                        constraint: constraint.to_string(),
                        id: *id,
                    }),
            }
        };
        let formula = |name: &str, constraint: &Constraint| -> Result<Term> {
            let operands = constraint
                .args
                .iter()
                .map(|arg| resolve(name, arg))
                .collect::<Result<Vec<_>>>()?;
            constraint
                .predicate
                .apply(&operands)
                .map_err(|e| RandomizeError::formula(name, e))
        };

        let involved: HashSet<VarId> = tables
            .iter()
            .flat_map(|(_, table)| table.var_ids())
            .chain(hard.iter().chain(soft).flat_map(Constraint::var_ids))
            .collect();

        let mut session = Session::new(self.weights, self.rng.random())
            .with_timeout(self.timeout)
            .with_integer_bias(self.bias_integers);

        for (prefix, table) in tables {
            for (name, constraint) in table.hard() {
                let name = format!("{prefix}{name}");
                session
                    .add_hard(formula(name.as_str(), constraint)?)
                    .map_err(|e| RandomizeError::formula(&name, e))?;
            }
            for (name, constraint) in table.soft() {
                let name = format!("{prefix}{name}");
                session
                    .add_declared(formula(name.as_str(), constraint)?)
                    .map_err(|e| RandomizeError::formula(&name, e))?;
            }
        }

        let mut constrained = 0usize;
        for var in registry.iter() {
            let id = var.id();
            if !selected.contains(&id) {
                continue;
            }
            if selection == Selection::All
                || involved.contains(&id)
                || !var.constraints().is_empty()
            {
                var.apply_local_constraints(&mut session, &resolve)?;
                constrained += 1;
            }
        }

        for (i, constraint) in hard.iter().enumerate() {
            let name = format!("hard[{i}]");
            session
                .add_hard(formula(name.as_str(), constraint)?)
                .map_err(|e| RandomizeError::formula(&name, e))?;
        }
        for (i, constraint) in soft.iter().enumerate() {
            let name = format!("soft[{i}]");
            session
                .add_declared(formula(name.as_str(), constraint)?)
                .map_err(|e| RandomizeError::formula(&name, e))?;
        }

        let model = if session.is_empty() {
            Model::new()
        } else {
            self.query(label, &session)?
        };

        let mut values: HashMap<VarId, Literal> = HashMap::new();
        for (symbol, literal) in model.iter() {
            match registry.resolve_symbol(symbol).filter(|id| selected.contains(id)) {
                Some(id) => {
                    values.insert(id, literal.clone());
                }
                None => trace!(symbol, "Skipping model symbol"),
            }
        }

        let mut drawn = 0usize;
        for var in registry.iter_mut() {
            let id = var.id();
            if !selected.contains(&id) {
                continue;
            }
            match values.get(&id) {
                Some(literal) => var.assign(literal),
                None => {
                    var.randomize_unconstrained(&mut self.rng);
                    drawn += 1;
                }
            }
        }

        info!(
            event = "randomize_done",
            object = %label,
            variables = selected.len(),
            constrained,
            drawn,
            hard = session.hard().len(),
            soft = session.soft().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Randomized"
        );
        Ok(())
    }

    fn query(&mut self, label: &str, session: &Session) -> Result<Model> {
        match self.backend.check(session) {
            Ok(Verdict::Sat(model)) => Ok(model),
            Ok(Verdict::Unsat) => Err(RandomizeError::Unsatisfiable {
                object: label.to_string(),
            }),
            Ok(Verdict::Unknown(reason)) => Err(RandomizeError::Unknown {
                object: label.to_string(),
                reason,
            }),
            Err(BackendError::Formula(source)) => Err(RandomizeError::formula(label, source)),
            Err(BackendError::Solver(message)) => Err(RandomizeError::Backend(message)),
        }
    }
}

/// The aggregate's own constraints followed by those of every aggregate it
/// embeds by value. Embedded names are prefixed with the aggregate's full
/// name.
fn constraint_tables<A: Aggregate>(aggregate: &mut A) -> Vec<(String, ConstraintTable)> {
    let own: *const Object = aggregate.object();
    let mut tables = vec![(String::new(), aggregate.object().constraints().clone())];
    aggregate.visit_objects(&mut |object| {
        if !std::ptr::eq(&*object, own) {
            tables.push((format!("{}.", object.full_name()), object.constraints().clone()));
        }
    });
    tables
}

impl<B> std::fmt::Debug for Randomizer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Randomizer")
            .field("weights", &self.weights)
            .field("timeout", &self.timeout)
            .field("bias_integers", &self.bias_integers)
            .finish_non_exhaustive()
    }
}
