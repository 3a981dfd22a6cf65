//! Field traversal.
//!
//! Every value stored in an aggregate implements [`Field`]. The trait
//! discovers variables (transitively through containers), copies values
//! under a [`CopyContext`], and renders and compares values for reports.
//!
//! Containers traverse their elements. Shared data (`Rc`, `Arc`,
//! [`Opaque`]) is never descended for randomization since it cannot be
//! borrowed mutably; a deep copy clones it once per allocation. Embedded
//! aggregates are reached through [`Field::visit_objects`] so that their
//! constraints join the owner's solve and are re-targeted by copies.

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

use half::f16;
use tracing::warn;

use crate::copy::CopyContext;
use crate::native::Native;
use crate::object::Object;
use crate::var::{AnyVar, Format, Var};


/// Collects mutable references to the variables reached by a traversal.
#[derive(Default)]
pub struct VarSink<'a> {
    vars: Vec<&'a mut dyn AnyVar>,
}

impl<'a> VarSink<'a> {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn push(&mut self, var: &'a mut dyn AnyVar) {
        self.vars.push(var);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn into_vec(self) -> Vec<&'a mut dyn AnyVar> {
        self.vars
    }
}

/// Collects every variable reachable from `root`.
pub fn collect_vars<F: Field + ?Sized>(root: &mut F) -> Vec<&mut dyn AnyVar> {
    let mut sink = VarSink::new();
    root.visit_vars(&mut sink);
    sink.into_vec()
}

/// A value that can live inside an aggregate.
pub trait Field {
    /// Pushes every variable owned by this value.
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>);

    /// Calls `f` on every embedded [`Object`] owned by this value, the
    /// value's own object included. Shared data is not entered.
    fn visit_objects(&mut self, _f: &mut dyn FnMut(&mut Object)) {}

    /// Copies the value; variables get fresh identities.
    fn copy_field(&self, cx: &mut CopyContext) -> Self
    where
        Self: Sized;

    /// Renders the value for tables and log messages.
    fn render(&self, format: Option<Format>) -> String;

    /// Value equality used by aggregate comparison.
    fn same_value(&self, other: &Self) -> bool
    where
        Self: Sized;
}

/// A struct with named fields, as generated by `#[derive(Fields)]`.
pub trait Fields: Field {
    /// Field names in declaration order (skipped fields excluded).
    fn field_names(&self) -> &'static [&'static str];

    /// Renders every field, asking `format_of` for per-field overrides.
    fn describe(&self, format_of: &dyn Fn(&str) -> Option<Format>) -> Vec<(&'static str, String)>;

    /// Names of the fields whose values differ from `other`.
    fn differing_fields(&self, other: &Self) -> Vec<&'static str>
    where
        Self: Sized;
}

impl<T: Native> Field for Var<T> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        sink.push(self);
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        cx.copy_var(self)
    }

    fn render(&self, format: Option<Format>) -> String {
        AnyVar::render(self, format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

macro_rules! plain_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

            fn copy_field(&self, _cx: &mut CopyContext) -> Self {
                self.clone()
            }

            fn render(&self, _format: Option<Format>) -> String {
                self.to_string()
            }

            fn same_value(&self, other: &Self) -> bool {
                self == other
            }
        }
    )*};
}

plain_field!(
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f16,
    f32,
    f64,
    String,
    &'static str,
);

impl Field for () {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, _cx: &mut CopyContext) -> Self {}

    fn render(&self, _format: Option<Format>) -> String {
        "()".to_string()
    }

    fn same_value(&self, _other: &Self) -> bool {
        true
    }
}

fn render_seq<'a, T: Field + 'a>(
    open: &str,
    items: impl Iterator<Item = &'a T>,
    close: &str,
    format: Option<Format>,
) -> String {
    let body: Vec<String> = items.map(|item| item.render(format)).collect();
    format!("{open}{}{close}", body.join(", "))
}

impl<T: Field> Field for Vec<T> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        for item in self.iter_mut() {
            item.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        for item in self.iter_mut() {
            item.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter().map(|item| item.copy_field(cx)).collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_seq("[", self.iter(), "]", format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: Field> Field for VecDeque<T> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        for item in self.iter_mut() {
            item.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        for item in self.iter_mut() {
            item.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter().map(|item| item.copy_field(cx)).collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_seq("[", self.iter(), "]", format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: Field, const N: usize> Field for [T; N] {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        for item in self.iter_mut() {
            item.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        for item in self.iter_mut() {
            item.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        std::array::from_fn(|i| self[i].copy_field(cx))
    }

    fn render(&self, format: Option<Format>) -> String {
        render_seq("[", self.iter(), "]", format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: Field> Field for Option<T> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        if let Some(inner) = self.as_mut() {
            inner.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        if let Some(inner) = self.as_mut() {
            inner.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.as_ref().map(|inner| inner.copy_field(cx))
    }

    fn render(&self, format: Option<Format>) -> String {
        match self {
            Some(inner) => inner.render(format),
            None => "None".to_string(),
        }
    }

    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Field> Field for Box<T> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        self.as_mut().visit_vars(sink);
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        self.as_mut().visit_objects(f);
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        Box::new(self.as_ref().copy_field(cx))
    }

    fn render(&self, format: Option<Format>) -> String {
        self.as_ref().render(format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.as_ref().same_value(other.as_ref())
    }
}

macro_rules! tuple_field {
    ($(($($name:ident . $idx:tt),+))*) => {$(
        impl<$($name: Field),+> Field for ($($name,)+) {
            fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
                $(self.$idx.visit_vars(sink);)+
            }

            fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
                $(self.$idx.visit_objects(f);)+
            }

            fn copy_field(&self, cx: &mut CopyContext) -> Self {
                ($(self.$idx.copy_field(cx),)+)
            }

            fn render(&self, format: Option<Format>) -> String {
                let parts: Vec<String> = vec![$(self.$idx.render(format)),+];
                format!("({})", parts.join(", "))
            }

            fn same_value(&self, other: &Self) -> bool {
                $(self.$idx.same_value(&other.$idx))&&+
            }
        }
    )*};
}

tuple_field! {
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
}

fn render_map<'a, K: Field + 'a, V: Field + 'a>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    format: Option<Format>,
) -> String {
    let body: Vec<String> = entries
        .map(|(k, v)| format!("{}: {}", k.render(None), v.render(format)))
        .collect();
    format!("{{{}}}", body.join(", "))
}

impl<K: Field + Ord, V: Field> Field for BTreeMap<K, V> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        for value in self.values_mut() {
            value.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        for value in self.values_mut() {
            value.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter()
            .map(|(k, v)| (k.copy_field(cx), v.copy_field(cx)))
            .collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_map(self.iter(), format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.same_value(w)))
    }
}

impl<K: Field + Eq + Hash, V: Field> Field for HashMap<K, V> {
    fn visit_vars<'a>(&'a mut self, sink: &mut VarSink<'a>) {
        for value in self.values_mut() {
            value.visit_vars(sink);
        }
    }

    fn visit_objects(&mut self, f: &mut dyn FnMut(&mut Object)) {
        for value in self.values_mut() {
            value.visit_objects(f);
        }
    }

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter()
            .map(|(k, v)| (k.copy_field(cx), v.copy_field(cx)))
            .collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_map(self.iter(), format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.same_value(w)))
    }
}

// Set elements are immutable in place, so they are copied but never
// randomized.

impl<T: Field + Ord> Field for BTreeSet<T> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter().map(|item| item.copy_field(cx)).collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_seq("{", self.iter(), "}", format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Field + Eq + Hash> Field for HashSet<T> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        self.iter().map(|item| item.copy_field(cx)).collect()
    }

    fn render(&self, format: Option<Format>) -> String {
        render_seq("{", self.iter(), "}", format)
    }

    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Field + 'static> Field for Rc<T> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        if !cx.is_deep() {
            return Rc::clone(self);
        }
        let address = Rc::as_ptr(self) as *const () as usize;
        cx.memoized(address, |cx| Rc::new(self.as_ref().copy_field(cx)))
    }

    fn render(&self, format: Option<Format>) -> String {
        self.as_ref().render(format)
    }

    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || self.as_ref().same_value(other.as_ref())
    }
}

impl<T: Field + 'static> Field for Arc<T> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        if !cx.is_deep() {
            return Arc::clone(self);
        }
        let address = Arc::as_ptr(self) as *const () as usize;
        cx.memoized(address, |cx| Arc::new(self.as_ref().copy_field(cx)))
    }

    fn render(&self, format: Option<Format>) -> String {
        self.as_ref().render(format)
    }

    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || self.as_ref().same_value(other.as_ref())
    }
}

/// Foreign data that may not know how to clone itself.
///
/// A shallow copy shares the value. A deep copy uses the cloner given at
/// construction; without one the value is shared and a warning is logged.
pub struct Opaque<T> {
    inner: Rc<T>,
    cloner: Option<fn(&T) -> T>,
}

impl<T> Opaque<T> {
    pub fn new(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            inner: Rc::new(value),
            cloner: Some(T::clone),
        }
    }

    pub fn with_cloner(value: T, cloner: fn(&T) -> T) -> Self {
        Self {
            inner: Rc::new(value),
            cloner: Some(cloner),
        }
    }

    /// Wraps a value that cannot be cloned.
    pub fn uncloneable(value: T) -> Self {
        Self {
            inner: Rc::new(value),
            cloner: None,
        }
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn share(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            cloner: self.cloner,
        }
    }
}

impl<T: 'static> Field for Opaque<T> {
    fn visit_vars<'a>(&'a mut self, _sink: &mut VarSink<'a>) {}

    fn copy_field(&self, cx: &mut CopyContext) -> Self {
        if !cx.is_deep() {
            return self.share();
        }
        let Some(cloner) = self.cloner else {
            warn!(
                value_type = type_name::<T>(),
                "Deep copy of uncloneable value, sharing the original"
            );
            return self.share();
        };
        let address = Rc::as_ptr(&self.inner) as *const () as usize;
        let inner = cx.memoized(address, |_| Rc::new(cloner(&self.inner)));
        Self {
            inner,
            cloner: self.cloner,
        }
    }

    fn render(&self, _format: Option<Format>) -> String {
        format!("<{}>", type_name::<T>())
    }

    fn same_value(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> std::fmt::Debug for Opaque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Opaque<{}>", type_name::<T>())
    }
}
