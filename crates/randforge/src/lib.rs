//! RandForge - Constrained-random stimulus generation in Rust
//!
//! Declare variables inside an aggregate, attach named constraints and call
//! `randomize()`. Constraints are solved by z3; unconstrained bits are
//! spread uniformly by weighted soft coins.
//!
//! # Example
//!
//! ```rust
//! use randforge::prelude::*;
//!
//! let mut x = Uint8::new(0);
//! x.add_constraint("small", |x| x.lt(10u8));
//! assert_eq!(x.value(), 0);
//! assert_eq!(x.width(), 8);
//! ```

// Derive macros share their names with the traits they implement.
pub use randforge_macros::{Fields, Struct};

pub use randforge_core::{
    collect_vars, f16, pack_fields, unpack_fields, Aggregate, AnyVar, Arg, AsObject, Backend,
    BackendError, Bool, Constraint, ConstraintTable, CopyContext, CopyDepth, CopyError, Domain,
    Field, FieldAttributes, Fields, Format, FormulaError, Fp16, Fp32, Fp64, FpFormat, Int16,
    Int32, Int64, Int8, IntoOperand, Literal, Logic, Model, Named, Native, Object, Opaque, Packed,
    Predicate, RandomizeError, Randomizer, Registry, Result, Session, Shared, Sort, Strength,
    Struct, TableFormat, TableStyle, Term, Uint16, Uint32, Uint64, Uint8, Var, VarId, Verdict,
    Weights, MAX_PACKED_WIDTH,
};

pub use randforge_config::{ConfigError, RandomizeConfig};
pub use randforge_solver::{randomizer_from_config, Z3Backend};

mod randomize;
pub use randomize::{seed, Randomize, RandomizeVar, CONFIG_FILE};

#[cfg(feature = "console")]
pub mod console;

/// Internal types for macro-generated code. Do not use directly.
#[doc(hidden)]
pub mod __internal {
    pub use randforge_core::{
        pack_fields, unpack_fields, AsObject, CopyContext, Field, Fields, Format, Named, Object,
        Packed, Struct, VarSink,
    };
}

pub mod prelude {
    pub use super::{
        Aggregate, AnyVar, Arg, AsObject, Bool, Constraint, Domain, Fields, Format, Fp16, Fp32,
        Fp64, Int16, Int32, Int64, Int8, Logic, Named, Object, Packed, Predicate, Randomize,
        RandomizeVar, Shared, Struct, Term, Uint16, Uint32, Uint64, Uint8, Var,
    };
}
