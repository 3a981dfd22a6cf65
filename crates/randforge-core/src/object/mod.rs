//! Aggregates: named, constrained collections of variables.
//!
//! An aggregate is a user struct that embeds an [`Object`] and derives
//! `Fields`. The object carries the aggregate's name, its place in the
//! component hierarchy, the named aggregate constraints, per-field report
//! attributes and the table layout.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::constraint::{Arg, Constraint, ConstraintTable, Predicate, Strength};
use crate::copy::{CopyContext, CopyDepth};
use crate::error::CopyError;
use crate::field::{collect_vars, Field, Fields, VarSink};
use crate::table::{render_fields, TableFormat};
use crate::var::Format;

#[cfg(test)]
mod tests;

/// Anything with a hierarchical name.
pub trait Named {
    fn name(&self) -> &str;

    fn full_name(&self) -> String;
}

/// Report attributes of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAttributes {
    /// Overrides the field's own display format.
    pub format: Option<Format>,
    /// Whether [`Aggregate::compare`] looks at the field.
    pub compare: bool,
}

impl Default for FieldAttributes {
    fn default() -> Self {
        Self {
            format: None,
            compare: true,
        }
    }
}

/// Per-aggregate state shared by every aggregate type.
#[derive(Debug, Clone, Default)]
pub struct Object {
    name: String,
    parent: Option<String>,
    attributes: BTreeMap<String, FieldAttributes>,
    constraints: ConstraintTable,
    table: TableFormat,
}

impl Object {
    /// Creates an object named `name` below `parent`.
    pub fn new(name: impl Into<String>, parent: Option<&dyn Named>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(Named::full_name),
            ..Self::default()
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_parent(&mut self, parent: Option<&dyn Named>) {
        self.parent = parent.map(Named::full_name);
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintTable {
        &mut self.constraints
    }

    pub fn set_field_attributes(&mut self, field: impl Into<String>, attributes: FieldAttributes) {
        self.attributes.insert(field.into(), attributes);
    }

    pub fn field_attributes(&self, field: &str) -> Option<&FieldAttributes> {
        self.attributes.get(field)
    }

    pub fn remove_field_attributes(&mut self, field: &str) -> Option<FieldAttributes> {
        self.attributes.remove(field)
    }

    /// Display format override of `field`.
    pub fn format_of(&self, field: &str) -> Option<Format> {
        self.attributes.get(field).and_then(|a| a.format)
    }

    /// Whether `field` takes part in comparisons (true unless disabled).
    pub fn compares(&self, field: &str) -> bool {
        self.attributes.get(field).map_or(true, |a| a.compare)
    }

    pub fn table_format(&self) -> TableFormat {
        self.table
    }

    pub fn set_table_format(&mut self, format: TableFormat) {
        self.table = format;
    }

    pub fn debug(&self, message: impl fmt::Display) {
        debug!(group = %self.full_name(), "{message}");
    }

    pub fn info(&self, message: impl fmt::Display) {
        info!(group = %self.full_name(), "{message}");
    }

    pub fn warn(&self, message: impl fmt::Display) {
        warn!(group = %self.full_name(), "{message}");
    }

    pub fn error(&self, message: impl fmt::Display) {
        error!(group = %self.full_name(), "{message}");
    }
}

impl Named for Object {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

// The aggregate copy replaces the cloned constraint tables with patched
// ones once every variable has its new identity.
impl Field for Object {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        f(self)
    }

    fn copy_field(&self, _cx: &mut CopyContext) -> Self {
        self.clone()
    }

    fn render(&self, _format: Option<Format>) -> String {
        self.full_name()
    }

    fn same_value(&self, _other: &Self) -> bool {
        true
    }
}

/// Access to the embedded [`Object`], as generated by `#[derive(Fields)]`
/// for the field marked `#[randforge(object)]`.
pub trait AsObject {
    fn object(&self) -> &Object;

    fn object_mut(&mut self) -> &mut Object;
}

/// A constrained collection of variables.
///
/// Implement the hooks to run code around every randomization; everything
/// else is provided.
pub trait Aggregate: Fields + AsObject + Sized {
    /// Runs before the solver is consulted.
    fn pre_randomize(&mut self) {}

    /// Runs after the new values were assigned.
    fn post_randomize(&mut self) {}

    fn name(&self) -> &str {
        self.object().name()
    }

    fn full_name(&self) -> String {
        self.object().full_name()
    }

    /// Adds (or replaces) a named hard constraint. `args` are handed to
    /// `predicate` in order.
    fn add_constraint(&mut self, name: impl Into<String>, predicate: Predicate, args: Vec<Arg>) {
        self.object_mut()
            .constraints_mut()
            .add(name, Constraint::new(predicate, args), Strength::Hard);
    }

    /// Adds (or replaces) a named soft constraint.
    fn add_soft_constraint(
        &mut self,
        name: impl Into<String>,
        predicate: Predicate,
        args: Vec<Arg>,
    ) {
        self.object_mut()
            .constraints_mut()
            .add(name, Constraint::new(predicate, args), Strength::Soft);
    }

    /// Removes a constraint of either strength.
    fn remove_constraint(&mut self, name: &str) -> bool {
        self.object_mut().constraints_mut().remove(name)
    }

    /// Copies every variable; shared data stays shared.
    ///
    /// # Errors
    ///
    /// Fails if an aggregate constraint, the constraints of embedded
    /// aggregates included, references a variable the aggregate does not
    /// own.
    fn shallow_copy(&self) -> Result<Self, CopyError> {
        copy_aggregate(self, CopyDepth::Shallow)
    }

    /// Copies every variable and clones shared data once per allocation.
    ///
    /// # Errors
    ///
    /// Fails if an aggregate constraint, the constraints of embedded
    /// aggregates included, references a variable the aggregate does not
    /// own.
    fn deep_copy(&self) -> Result<Self, CopyError> {
        copy_aggregate(self, CopyDepth::Deep)
    }

    /// Compares field values with `other`, logging each mismatch as an
    /// error and, when `verbose`, each match as info. Fields whose
    /// attributes disable comparison are ignored.
    fn compare(&self, other: &Self, verbose: bool) -> bool {
        let object = self.object();
        let differing = self.differing_fields(other);
        let ours = self.describe(&|field| object.format_of(field));
        let theirs = other.describe(&|field| object.format_of(field));

        let mut matched = true;
        for (field, lhs) in &ours {
            if !object.compares(field) {
                continue;
            }
            let rhs = theirs
                .iter()
                .find(|(name, _)| name == field)
                .map_or("", |(_, value)| value.as_str());
            if differing.contains(field) {
                matched = false;
                object.error(format_args!("{field}: {lhs} != {rhs}"));
            } else if verbose {
                object.info(format_args!("{field}: {lhs} == {rhs}"));
            }
        }
        matched
    }

    /// Renders the fields as a table, honoring per-field formats; hidden
    /// fields are left out.
    fn table(&self) -> String {
        let object = self.object();
        let rows: Vec<(String, String)> = self
            .describe(&|field| object.format_of(field))
            .into_iter()
            .filter(|(field, _)| object.format_of(field) != Some(Format::Hidden))
            .map(|(field, value)| (field.to_string(), value))
            .collect();
        render_fields(&rows, object.table_format())
    }

    fn debug(&self, message: impl fmt::Display) {
        self.object().debug(message);
    }

    fn info(&self, message: impl fmt::Display) {
        self.object().info(message);
    }

    fn warn(&self, message: impl fmt::Display) {
        self.object().warn(message);
    }

    fn error(&self, message: impl fmt::Display) {
        self.object().error(message);
    }
}

fn copy_aggregate<A: Aggregate>(original: &A, depth: CopyDepth) -> Result<A, CopyError> {
    let mut cx = CopyContext::new(depth);
    let mut copy = original.copy_field(&mut cx);
    let constraints = cx.patch(original.object().constraints())?;
    *copy.object_mut().constraints_mut() = constraints;

    // Embedded aggregates carry their own tables.
    let own: *const Object = copy.object();
    let mut nested = Ok(());
    copy.visit_objects(&mut |object| {
        if std::ptr::eq(&*object, own) || nested.is_err() {
            return;
        }
        match cx.patch(object.constraints()) {
            Ok(patched) => *object.constraints_mut() = patched,
            Err(e) => nested = Err(e),
        }
    });
    nested?;

    cx.retarget_locals(collect_vars(&mut copy));
    debug!(
        object = %original.full_name(),
        ?depth,
        vars = cx.conversion().len(),
        "Copied aggregate"
    );
    Ok(copy)
}

/// An aggregate referenced from several places.
///
/// Shared aggregates are boundaries: randomizing the owner leaves them
/// alone and copies of the owner share the same instance. Owner
/// constraints may still read their variables, which then count as
/// constants.
pub struct Shared<A>(Rc<RefCell<A>>);

impl<A> Shared<A> {
    pub fn new(aggregate: A) -> Self {
        Self(Rc::new(RefCell::new(aggregate)))
    }

    /// # Panics
    ///
    /// Panics if the aggregate is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, A> {
        self.0.borrow()
    }

    /// # Panics
    ///
    /// Panics if the aggregate is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, A> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<A> Clone for Shared<A> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<A> fmt::Debug for Shared<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:p})", Rc::as_ptr(&self.0))
    }
}

impl<A: Aggregate> Field for Shared<A> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, _cx: &mut CopyContext) -> Self {
        self.clone()
    }

    fn render(&self, _format: Option<Format>) -> String {
        match self.0.try_borrow() {
            Ok(inner) => format!("<{}>", inner.full_name()),
            Err(_) => "<borrowed>".to_string(),
        }
    }

    fn same_value(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.0.try_borrow(), other.0.try_borrow()) {
            (Ok(a), Ok(b)) => a.differing_fields(&b).is_empty(),
            _ => false,
        }
    }
}
