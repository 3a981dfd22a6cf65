//! RandForge Core - Core types and traits for constrained randomization
//!
//! This crate provides the fundamental abstractions for RandForge:
//! - Native scalars, sorts and symbolic terms
//! - Randomizable variables with local constraints
//! - Field traversal, aggregates and identity-preserving copies
//! - Fixed-layout (packed) structures
//! - The solver session, the backend seam and the randomizer

pub mod constraint;
pub mod copy;
pub mod error;
pub mod field;
pub mod id;
pub mod native;
pub mod object;
pub mod packed;
pub mod randomize;
pub mod session;
pub mod sort;
pub mod table;
pub mod term;
pub mod var;

#[cfg(test)]
mod fixtures;

pub use constraint::{Arg, Constraint, ConstraintTable, Predicate, Strength};
pub use copy::{CopyContext, CopyDepth};
pub use error::{BackendError, CopyError, FormulaError, RandomizeError, Result};
pub use field::{collect_vars, Field, Fields, Opaque, VarSink};
pub use id::VarId;
pub use native::{Arith, FloatNative, Integer, Native};
pub use object::{Aggregate, AsObject, FieldAttributes, Named, Object, Shared};
pub use packed::{pack_fields, unpack_fields, Packed, Struct, MAX_PACKED_WIDTH};
pub use randomize::{Randomizer, Registry};
pub use session::{Backend, Model, Session, Verdict, Weights};
pub use sort::{FpFormat, Literal, Sort};
pub use table::{TableFormat, TableStyle};
pub use term::{IntoOperand, Term};
pub use var::{
    AnyVar, Bool, Domain, Format, Fp16, Fp32, Fp64, Int16, Int32, Int64, Int8, Logic, Uint16,
    Uint32, Uint64, Uint8, Var,
};

pub use half::f16;
