//! Identity-preserving copy state.
//!
//! Copying an aggregate clones every variable it owns under a fresh
//! identity. [`CopyContext`] records the resulting identity map so the
//! clone's constraint handles can be re-targeted afterwards, and memoizes
//! shared allocations so sharing within the copied graph is preserved.

use std::any::Any;
use std::collections::HashMap;

use crate::constraint::ConstraintTable;
use crate::error::CopyError;
use crate::id::VarId;
use crate::native::Native;
use crate::var::{AnyVar, Var};

/// How far a copy reaches into shared data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDepth {
    /// Shared plain data stays shared.
    Shallow,
    /// Shared plain data is cloned once per original allocation.
    Deep,
}

/// State threaded through a copy traversal.
pub struct CopyContext {
    depth: CopyDepth,
    conversion: HashMap<VarId, VarId>,
    memo: HashMap<usize, Box<dyn Any>>,
}

impl CopyContext {
    pub fn new(depth: CopyDepth) -> Self {
        Self {
            depth,
            conversion: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    pub fn depth(&self) -> CopyDepth {
        self.depth
    }

    pub fn is_deep(&self) -> bool {
        self.depth == CopyDepth::Deep
    }

    /// Clones `var` under a fresh identity and records the mapping.
    pub fn copy_var<T: Native>(&mut self, var: &Var<T>) -> Var<T> {
        let copy = var.duplicate();
        self.conversion.insert(var.id(), copy.id());
        copy
    }

    /// Original identity to clone identity.
    pub fn conversion(&self) -> &HashMap<VarId, VarId> {
        &self.conversion
    }

    /// Returns the copy already made for `address`, or makes and records it.
    pub fn memoized<T: Clone + 'static>(
        &mut self,
        address: usize,
        make: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if let Some(hit) = self.memo.get(&address).and_then(|b| b.downcast_ref::<T>()) {
            return hit.clone();
        }
        let value = make(self);
        self.memo.insert(address, Box::new(value.clone()));
        value
    }

    /// Rewrites an aggregate constraint table onto the clones.
    ///
    /// # Errors
    ///
    /// Fails if a constraint references a variable that was not copied.
    pub fn patch(&self, table: &ConstraintTable) -> Result<ConstraintTable, CopyError> {
        table.patched(&self.conversion)
    }

    /// Re-targets variable-local constraint handles that point into the
    /// copied graph. Handles to outside variables are kept.
    pub fn retarget_locals<'a>(&self, vars: impl IntoIterator<Item = &'a mut dyn AnyVar>) {
        for var in vars {
            var.constraints_mut().retarget(&self.conversion);
        }
    }
}

impl std::fmt::Debug for CopyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyContext")
            .field("depth", &self.depth)
            .field("conversion", &self.conversion)
            .field("memoized", &self.memo.len())
            .finish()
    }
}
