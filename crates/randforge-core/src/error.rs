//! Error types for RandForge

use thiserror::Error;

use crate::id::VarId;
use crate::sort::Sort;

/// Main error type for randomization.
///
/// None of these errors leave a partial assignment behind: variables are
/// only written once the backend produced a complete model.
#[derive(Debug, Error)]
pub enum RandomizeError {
    /// The hard constraints admit no assignment.
    #[error("Failed to randomize {object}: constraints are unsatisfiable")]
    Unsatisfiable { object: String },

    /// The backend gave up (typically a timeout).
    #[error("Failed to randomize {object}: solver returned unknown ({reason})")]
    Unknown { object: String, reason: String },

    /// A predicate produced a malformed formula.
    #[error("Malformed constraint '{constraint}': {source}")]
    Formula {
        constraint: String,
        #[source]
        source: FormulaError,
    },

    /// A constraint argument names a variable that no longer exists.
    #[error("Constraint '{constraint}' references unknown variable {id}")]
    UnknownArgument { constraint: String, id: VarId },

    /// Internal backend failure (should not occur in normal operation).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RandomizeError {
    pub(crate) fn formula(constraint: impl Into<String>, source: FormulaError) -> Self {
        Self::Formula {
            constraint: constraint.into(),
            source,
        }
    }
}

/// Errors raised while checking or building a symbolic term.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("predicate expects {expected} operands, got {found}")]
    Arity { expected: usize, found: usize },

    #[error("operator '{op}' cannot combine {left} and {right}")]
    SortMismatch {
        op: &'static str,
        left: Sort,
        right: Sort,
    },

    #[error("operator '{op}' is not defined for {sort}")]
    Unsupported { op: &'static str, sort: Sort },

    #[error("constraint must be boolean, found {0}")]
    NotBoolean(Sort),

    #[error("extract [{hi}:{lo}] is out of range for {sort}")]
    Extract { hi: u32, lo: u32, sort: Sort },
}

/// Errors raised while patching a copied aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// The constraint references a variable outside the copied subgraph.
    #[error("Constraint '{constraint}' references variable {id} outside the copied object")]
    UnresolvedVariable { constraint: String, id: VarId },
}

/// Errors reported by a [`Backend`](crate::session::Backend).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("{0}")]
    Solver(String),
}

/// Result type alias for randomization.
pub type Result<T> = std::result::Result<T, RandomizeError>;
