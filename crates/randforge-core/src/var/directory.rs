//! Process-wide lookup of live variable values.
//!
//! Every [`Var`](super::Var) publishes its raw value to a [`Slot`] that is
//! registered here under its identity. Constraint arguments naming a
//! variable outside the randomized aggregate resolve through this table
//! to a constant holding that variable's current value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use crate::id::VarId;
use crate::sort::Sort;
use crate::term::Term;

/// Raw value of one variable.
#[derive(Debug)]
pub(crate) struct Slot {
    bits: AtomicU64,
    sort: Sort,
}

impl Slot {
    pub fn store(&self, bits: u64) {
        self.bits.store(bits, Ordering::Release);
    }

    fn constant(&self) -> Term {
        let bits = self.bits.load(Ordering::Acquire);
        match self.sort {
            Sort::Bool => Term::bool(bits != 0),
            Sort::Bits { .. } => Term::bits_of(bits, self.sort),
            Sort::Float(format) => Term::float(bits, format),
        }
    }
}

type Directory = Mutex<HashMap<VarId, Weak<Slot>>>;

static DIRECTORY: OnceLock<Directory> = OnceLock::new();

fn directory() -> &'static Directory {
    DIRECTORY.get_or_init(Directory::default)
}

/// Creates and registers the slot of `id`.
pub(crate) fn register(id: VarId, sort: Sort, bits: u64) -> Arc<Slot> {
    let slot = Arc::new(Slot {
        bits: AtomicU64::new(bits),
        sort,
    });
    directory()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, Arc::downgrade(&slot));
    slot
}

pub(crate) fn forget(id: VarId) {
    directory()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
}

/// Constant holding the current value of `id`, if that variable is alive.
pub(crate) fn current(id: VarId) -> Option<Term> {
    let slot = directory()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .and_then(Weak::upgrade)?;
    Some(slot.constant())
}
