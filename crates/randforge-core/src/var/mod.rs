//! Randomizable variables.
//!
//! A [`Var`] holds one native scalar together with everything the
//! randomizer needs: a process-unique identity, a lazily created symbolic
//! term, local constraints and the auto-random policy.
//!
//! # Examples
//!
//! ```
//! use randforge_core::{Format, Var};
//!
//! let mut len: Var<u8> = Var::new(0).with_format(Format::Hex);
//! len.add_constraint("small", |x| x.ult(16));
//! len += 0x1f;
//! assert_eq!(len.value(), 0x1f);
//! assert_eq!(len.to_string(), "0x1f");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops;
use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::constraint::{Arg, Constraint, ConstraintTable, Predicate, Strength};
use crate::error::{RandomizeError, Result};
use crate::id::VarId;
use crate::native::{Arith, Integer, Native};
use crate::session::Session;
use crate::sort::{Literal, Sort};
use crate::term::Term;
use directory::Slot;

mod directory;

#[cfg(test)]
mod tests;

pub(crate) use directory::current as live_value;

/// Display format of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    #[default]
    Dec,
    Hex,
    Bin,
    /// Omitted from tables.
    Hidden,
}

/// Labels of an enumerated variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    labels: Vec<(String, u64)>,
}

impl Domain {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = (S, u64)>) -> Self {
        Self {
            labels: labels.into_iter().map(|(l, v)| (l.into(), v)).collect(),
        }
    }

    /// Smallest width holding every value (at least one bit).
    pub fn width(&self) -> u32 {
        let max = self.values().max().unwrap_or(0);
        (u64::BITS - max.leading_zeros()).max(1)
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.labels.iter().map(|(_, v)| *v)
    }

    pub fn value_of(&self, label: &str) -> Option<u64> {
        self.labels.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    pub fn label_of(&self, value: u64) -> Option<&str> {
        self.labels
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A randomizable scalar.
#[derive(Debug)]
pub struct Var<T: Native> {
    id: VarId,
    value: T,
    width: u32,
    auto_random: bool,
    format: Format,
    domain: Option<Arc<Domain>>,
    constraints: ConstraintTable,
    symbolic: Option<Term>,
    slot: Arc<Slot>,
}

pub type Bool = Var<bool>;
pub type Uint8 = Var<u8>;
pub type Uint16 = Var<u16>;
pub type Uint32 = Var<u32>;
pub type Uint64 = Var<u64>;
pub type Int8 = Var<i8>;
pub type Int16 = Var<i16>;
pub type Int32 = Var<i32>;
pub type Int64 = Var<i64>;
/// Unsigned bit-vector of up to 64 bits.
pub type Logic = Var<u64>;
pub type Fp16 = Var<half::f16>;
pub type Fp32 = Var<f32>;
pub type Fp64 = Var<f64>;

impl<T: Native> Var<T> {
    /// Creates an auto-random variable of the native width.
    pub fn new(value: T) -> Self {
        Self::with_width(value, T::WIDTH)
    }

    /// Creates a variable narrowed to `width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero, exceeds the native width, or narrows a
    /// type that cannot be narrowed (floats, booleans).
    pub fn with_width(value: T, width: u32) -> Self {
        assert!(
            width >= 1 && width <= T::WIDTH,
            "width {width} out of range 1..={}",
            T::WIDTH
        );
        assert!(
            T::NARROWABLE || width == T::WIDTH,
            "width of {} variables is fixed at {}",
            std::any::type_name::<T>(),
            T::WIDTH
        );
        let id = VarId::next();
        let value = value.fit(width);
        Self {
            id,
            value,
            width,
            auto_random: true,
            format: Format::Dec,
            domain: None,
            constraints: ConstraintTable::new(),
            symbolic: None,
            slot: directory::register(id, T::sort(width), value.to_raw(width)),
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_auto_random(mut self, auto_random: bool) -> Self {
        self.auto_random = auto_random;
        self
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn value(&self) -> T {
        self.value
    }

    /// Sets the value, wrapping it to the declared width.
    pub fn set(&mut self, value: T) {
        self.store(value.fit(self.width));
    }

    fn store(&mut self, value: T) {
        self.value = value;
        self.slot.store(value.to_raw(self.width));
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    pub fn is_auto_random(&self) -> bool {
        self.auto_random
    }

    pub fn set_auto_random(&mut self, auto_random: bool) {
        self.auto_random = auto_random;
    }

    pub fn sort(&self) -> Sort {
        T::sort(self.width)
    }

    /// Bounds for unconstrained draws.
    pub fn range(&self) -> (T, T) {
        T::range(self.width)
    }

    /// Converts a foreign value into this variable's representation.
    pub fn cast(&self, literal: &Literal) -> T {
        T::cast(literal, self.width)
    }

    /// Stores a foreign value through [`Var::cast`].
    pub fn assign(&mut self, literal: &Literal) {
        self.store(self.cast(literal));
    }

    /// Draws a value uniformly within `bounds` (defaults to the range).
    /// Enumerations draw from their labels.
    pub fn random_value<R: RngCore + ?Sized>(&self, rng: &mut R, bounds: Option<(T, T)>) -> T {
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            let pick = rng.random_range(0..domain.len());
            let value = domain.labels[pick].1;
            return T::from_raw(value, self.width);
        }
        let (lo, hi) = bounds.unwrap_or_else(|| self.range());
        T::sample(rng, lo, hi).fit(self.width)
    }

    /// Solver term of this variable, created on first use.
    pub fn term(&mut self) -> Term {
        self.symbolic
            .get_or_insert_with(|| Term::symbol(self.id.symbol(), T::sort(self.width)))
            .clone()
    }

    pub fn symbolic(&self) -> Option<&Term> {
        self.symbolic.as_ref()
    }

    /// Handle for use as a constraint argument.
    pub fn arg(&self) -> Arg {
        Arg::Var(self.id)
    }

    /// Adds a hard constraint over this variable's own term.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Term) -> Term + Send + Sync + 'static,
    ) {
        self.add_constraint_with(name, Predicate::unary(f), Vec::new(), Strength::Hard);
    }

    /// Adds a soft constraint over this variable's own term.
    pub fn add_soft_constraint(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Term) -> Term + Send + Sync + 'static,
    ) {
        self.add_constraint_with(name, Predicate::unary(f), Vec::new(), Strength::Soft);
    }

    /// Adds a constraint whose predicate receives this variable's term
    /// followed by the resolved `args`.
    pub fn add_constraint_with(
        &mut self,
        name: impl Into<String>,
        predicate: Predicate,
        args: Vec<Arg>,
        strength: Strength,
    ) {
        self.constraints
            .add(name, Constraint::new(predicate, args), strength);
    }

    pub fn remove_constraint(&mut self, name: &str) -> bool {
        self.constraints.remove(name)
    }

    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    /// Raw encoding in the low [`Var::width`] bits.
    pub fn to_bits(&self) -> u64 {
        self.value.to_raw(self.width)
    }

    /// Replaces the value from a raw encoding (bit-exact for floats).
    pub fn from_bits(&mut self, raw: u64) {
        self.store(T::from_raw(raw, self.width));
    }

    /// Copy with a fresh identity and no symbolic term.
    pub(crate) fn duplicate(&self) -> Self {
        let id = VarId::next();
        Self {
            id,
            value: self.value,
            width: self.width,
            auto_random: self.auto_random,
            format: self.format,
            domain: self.domain.clone(),
            constraints: self.constraints.clone(),
            symbolic: None,
            slot: directory::register(id, self.sort(), self.to_bits()),
        }
    }

    fn render_as(&self, format: Format) -> String {
        match format {
            Format::Hidden => String::new(),
            Format::Hex => format!("{:#x}", self.to_bits()),
            Format::Bin => format!("0b{:0width$b}", self.to_bits(), width = self.width as usize),
            Format::Dec => match self.label() {
                Some(label) => label.to_string(),
                None => self.value.to_string(),
            },
        }
    }

    /// Label of the current value, for enumerations.
    pub fn label(&self) -> Option<&str> {
        self.domain.as_deref()?.label_of(self.to_bits())
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_deref()
    }
}

impl Var<u64> {
    /// Bit-vector of `width` bits.
    pub fn logic(width: u32, value: u64) -> Self {
        Self::with_width(value, width)
    }

    /// Enumerated variable starting at `initial`.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is not one of the labels.
    pub fn enumeration<S: Into<String>>(
        labels: impl IntoIterator<Item = (S, u64)>,
        initial: &str,
    ) -> Self {
        let domain = Domain::new(labels);
        let value = domain
            .value_of(initial)
            .unwrap_or_else(|| panic!("'{initial}' is not an enumeration label"));
        let mut var = Self::with_width(value, domain.width());
        var.domain = Some(Arc::new(domain));
        var
    }

    /// Sets an enumeration by label. Returns false for unknown labels.
    pub fn set_label(&mut self, label: &str) -> bool {
        match self.domain.as_deref().and_then(|d| d.value_of(label)) {
            Some(value) => {
                self.store(value);
                true
            }
            None => false,
        }
    }
}

impl Var<bool> {
    pub fn toggle(&mut self) {
        self.store(!self.value);
    }
}

impl<T: Native> Drop for Var<T> {
    fn drop(&mut self) {
        directory::forget(self.id);
    }
}

impl<T: Native + Default> Default for Var<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Native> fmt::Display for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_as(self.format))
    }
}

// Comparisons act on values and follow IEEE semantics for floats: any
// comparison with NaN is false except `!=`.

impl<T: Native> PartialEq for Var<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Native> PartialEq<T> for Var<T> {
    fn eq(&self, other: &T) -> bool {
        self.value == *other
    }
}

impl<T: Native> PartialOrd for Var<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Native> PartialOrd<T> for Var<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.value.partial_cmp(other)
    }
}

macro_rules! arith_assign {
    ($($trait:ident :: $method:ident => $op:ident;)*) => {$(
        impl<T: Arith> ops::$trait<T> for Var<T> {
            fn $method(&mut self, rhs: T) {
                self.set(Arith::$op(self.value, rhs));
            }
        }
    )*};
}

arith_assign! {
    AddAssign::add_assign => add;
    SubAssign::sub_assign => sub;
    MulAssign::mul_assign => mul;
}

impl<T: Integer> ops::BitAndAssign<T> for Var<T> {
    fn bitand_assign(&mut self, rhs: T) {
        self.set(self.value & rhs);
    }
}

impl<T: Integer> ops::BitOrAssign<T> for Var<T> {
    fn bitor_assign(&mut self, rhs: T) {
        self.set(self.value | rhs);
    }
}

impl<T: Integer> ops::BitXorAssign<T> for Var<T> {
    fn bitxor_assign(&mut self, rhs: T) {
        self.set(self.value ^ rhs);
    }
}

impl<T: Integer> ops::ShlAssign<u32> for Var<T> {
    fn shl_assign(&mut self, rhs: u32) {
        self.set(self.value.wrapping_shl(rhs));
    }
}

impl<T: Integer> ops::ShrAssign<u32> for Var<T> {
    fn shr_assign(&mut self, rhs: u32) {
        self.set(self.value.wrapping_shr(rhs));
    }
}

/// Resolves a constraint argument to a term; receives the constraint name
/// for error reporting.
pub type ArgResolver<'a> = dyn Fn(&str, &Arg) -> Result<Term> + 'a;

/// Type-erased view of a variable used by traversal and the randomizer.
pub trait AnyVar {
    fn id(&self) -> VarId;

    fn sort(&self) -> Sort;

    fn width(&self) -> u32;

    fn is_auto_random(&self) -> bool;

    /// Materializes and returns the symbolic term.
    fn term(&mut self) -> Term;

    /// Constant holding the current value.
    fn current(&self) -> Term;

    fn constraints(&self) -> &ConstraintTable;

    fn constraints_mut(&mut self) -> &mut ConstraintTable;

    /// Adds the local, enumeration and intrinsic constraints to `session`.
    /// The variable's term must have been materialized.
    fn apply_local_constraints(&self, session: &mut Session, resolve: &ArgResolver<'_>)
        -> Result<()>;

    fn assign(&mut self, literal: &Literal);

    /// Replaces the value with an unconstrained draw.
    fn randomize_unconstrained(&mut self, rng: &mut dyn RngCore);

    fn to_bits(&self) -> u64;

    fn from_bits(&mut self, raw: u64);

    /// Renders the value, overriding the variable's own format if given.
    fn render(&self, format: Option<Format>) -> String;
}

impl<T: Native> AnyVar for Var<T> {
    fn id(&self) -> VarId {
        self.id
    }

    fn sort(&self) -> Sort {
        T::sort(self.width)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn is_auto_random(&self) -> bool {
        self.auto_random
    }

    fn term(&mut self) -> Term {
        Var::term(self)
    }

    fn current(&self) -> Term {
        self.value.constant(self.width)
    }

    fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    fn constraints_mut(&mut self) -> &mut ConstraintTable {
        &mut self.constraints
    }

    fn apply_local_constraints(
        &self,
        session: &mut Session,
        resolve: &ArgResolver<'_>,
    ) -> Result<()> {
        let term = self.symbolic.clone().ok_or_else(|| {
            RandomizeError::Backend(format!("variable {} has no symbolic term", self.id))
        })?;

        let entries = self
            .constraints
            .hard()
            .map(|e| (Strength::Hard, e))
            .chain(self.constraints.soft().map(|e| (Strength::Soft, e)));
        for (strength, (name, constraint)) in entries {
            let mut operands = Vec::with_capacity(constraint.args.len() + 1);
            operands.push(term.clone());
            for arg in &constraint.args {
                operands.push(resolve(name, arg)?);
            }
            let formula = constraint
                .predicate
                .apply(&operands)
                .map_err(|e| RandomizeError::formula(name, e))?;
            let added = match strength {
                Strength::Hard => session.add_hard(formula),
                Strength::Soft => session.add_declared(formula),
            };
            added.map_err(|e| RandomizeError::formula(name, e))?;
        }

        if let Some(domain) = &self.domain {
            let sort = self.sort();
            let members = domain.values().map(|v| term.eq(Term::bits_of(v, sort)));
            session
                .add_hard(Term::any(members))
                .map_err(|e| RandomizeError::formula(self.id.symbol(), e))?;
        }

        T::apply_intrinsic(&term, self.id, self.width, session)
            .map_err(|e| RandomizeError::formula(self.id.symbol(), e))
    }

    fn assign(&mut self, literal: &Literal) {
        Var::assign(self, literal);
    }

    fn randomize_unconstrained(&mut self, rng: &mut dyn RngCore) {
        let value = self.random_value(rng, None);
        self.store(value);
    }

    fn to_bits(&self) -> u64 {
        Var::to_bits(self)
    }

    fn from_bits(&mut self, raw: u64) {
        Var::from_bits(self, raw);
    }

    fn render(&self, format: Option<Format>) -> String {
        self.render_as(format.unwrap_or(self.format))
    }
}
