//! Named constraints and constraint tables.
//!
//! A constraint pairs a [`Predicate`] (a pure function from operand terms to
//! a boolean term) with argument handles. Handles name variables by
//! identity, so copying an aggregate only has to rewrite the handles.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{CopyError, FormulaError};
use crate::id::VarId;
use crate::term::Term;

type PredicateFn = dyn Fn(&[Term]) -> Term + Send + Sync;

/// Shared predicate body with a declared arity.
#[derive(Clone)]
pub struct Predicate {
    arity: Option<usize>,
    body: Arc<PredicateFn>,
}

impl Predicate {
    /// Predicate over exactly `arity` operands.
    pub fn new(arity: usize, f: impl Fn(&[Term]) -> Term + Send + Sync + 'static) -> Self {
        Self {
            arity: Some(arity),
            body: Arc::new(f),
        }
    }

    /// Predicate accepting any number of operands.
    pub fn variadic(f: impl Fn(&[Term]) -> Term + Send + Sync + 'static) -> Self {
        Self {
            arity: None,
            body: Arc::new(f),
        }
    }

    pub fn unary(f: impl Fn(&Term) -> Term + Send + Sync + 'static) -> Self {
        Self::new(1, move |args| f(&args[0]))
    }

    pub fn binary(f: impl Fn(&Term, &Term) -> Term + Send + Sync + 'static) -> Self {
        Self::new(2, move |args| f(&args[0], &args[1]))
    }

    pub fn ternary(f: impl Fn(&Term, &Term, &Term) -> Term + Send + Sync + 'static) -> Self {
        Self::new(3, move |args| f(&args[0], &args[1], &args[2]))
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Evaluates the predicate on resolved operands.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Arity`] if the operand count does not match.
    pub fn apply(&self, args: &[Term]) -> Result<Term, FormulaError> {
        if let Some(expected) = self.arity {
            if args.len() != expected {
                return Err(FormulaError::Arity {
                    expected,
                    found: args.len(),
                });
            }
        }
        Ok((self.body)(args))
    }

    pub fn ptr_eq(&self, other: &Predicate) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(n) => write!(f, "Predicate(arity = {n})"),
            None => write!(f, "Predicate(variadic)"),
        }
    }
}

/// Argument handle of a constraint.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Resolves to the variable's symbolic term when it is randomized,
    /// otherwise to its current value.
    Var(VarId),
    /// Constant operand.
    Term(Term),
}

impl Arg {
    pub fn var_id(&self) -> Option<VarId> {
        match self {
            Arg::Var(id) => Some(*id),
            Arg::Term(_) => None,
        }
    }
}

impl From<VarId> for Arg {
    fn from(id: VarId) -> Self {
        Arg::Var(id)
    }
}

impl From<Term> for Arg {
    fn from(term: Term) -> Self {
        Arg::Term(term)
    }
}

/// A predicate with its argument handles.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub predicate: Predicate,
    pub args: Vec<Arg>,
}

impl Constraint {
    pub fn new(predicate: Predicate, args: impl IntoIterator<Item = Arg>) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    /// Identities of every variable argument.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        self.args.iter().filter_map(Arg::var_id)
    }

    fn remap(&self, conversion: &HashMap<VarId, VarId>) -> Result<Constraint, VarId> {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Var(id) => conversion.get(id).map(|new| Arg::Var(*new)).ok_or(*id),
                Arg::Term(t) => Ok(Arg::Term(t.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Constraint {
            predicate: self.predicate.clone(),
            args,
        })
    }
}

/// Constraint tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strength {
    /// Must hold.
    Hard,
    /// Weighted goal.
    Soft,
}

/// Hard and soft constraints keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    hard: BTreeMap<String, Constraint>,
    soft: BTreeMap<String, Constraint>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint, replacing any entry of the same name in the same
    /// tier. Returns the replaced entry.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        constraint: Constraint,
        strength: Strength,
    ) -> Option<Constraint> {
        let name = name.into();
        let bucket = match strength {
            Strength::Hard => &mut self.hard,
            Strength::Soft => &mut self.soft,
        };
        let replaced = bucket.insert(name.clone(), constraint);
        if replaced.is_some() {
            warn!(constraint = %name, ?strength, "Overriding existing constraint");
        }
        replaced
    }

    /// Removes `name` from both tiers. Returns true if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let hard = self.hard.remove(name).is_some();
        let soft = self.soft.remove(name).is_some();
        hard || soft
    }

    pub fn get(&self, name: &str, strength: Strength) -> Option<&Constraint> {
        match strength {
            Strength::Hard => self.hard.get(name),
            Strength::Soft => self.soft.get(name),
        }
    }

    pub fn hard(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.hard.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn soft(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.soft.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.hard.len() + self.soft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.soft.is_empty()
    }

    /// Identities referenced by any constraint.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        self.hard
            .values()
            .chain(self.soft.values())
            .flat_map(Constraint::var_ids)
    }

    /// Rewrites every variable handle through `conversion`.
    ///
    /// # Errors
    ///
    /// Fails on the first handle missing from `conversion`.
    pub fn patched(&self, conversion: &HashMap<VarId, VarId>) -> Result<Self, CopyError> {
        let remap = |bucket: &BTreeMap<String, Constraint>| {
            bucket
                .iter()
                .map(|(name, c)| {
                    c.remap(conversion)
                        .map(|c| (name.clone(), c))
                        .map_err(|id| CopyError::UnresolvedVariable {
                            constraint: name.clone(),
                            id,
                        })
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
        };
        Ok(Self {
            hard: remap(&self.hard)?,
            soft: remap(&self.soft)?,
        })
    }

    /// Rewrites the handles present in `conversion`, leaving others as is.
    pub fn retarget(&mut self, conversion: &HashMap<VarId, VarId>) {
        for constraint in self.hard.values_mut().chain(self.soft.values_mut()) {
            for arg in &mut constraint.args {
                if let Arg::Var(id) = arg {
                    if let Some(new) = conversion.get(id) {
                        *id = *new;
                    }
                }
            }
        }
    }
}
