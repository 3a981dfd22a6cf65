//! Symbolic terms handed to the solver.
//!
//! A [`Term`] is an immutable expression tree over booleans, bit-vectors
//! and IEEE floats. Nodes are shared through `Arc`, so cloning a term is
//! cheap and predicates can freely reuse their operands.
//!
//! Rust numeric literals coerce to the sort of the other operand:
//!
//! ```
//! use randforge_core::{Sort, Term};
//!
//! let x = Term::symbol("x", Sort::unsigned(8));
//! let formula = (x.clone() + 1).ult(100).and(x.bit(0).eq(1));
//! assert_eq!(formula.sort(), Ok(Sort::Bool));
//! ```

use std::collections::BTreeMap;
use std::ops;
use std::sync::Arc;

use half::f16;

use crate::error::FormulaError;
use crate::sort::{mask, FpFormat, Literal, Sort};

#[cfg(test)]
mod tests;

/// Shared handle to an expression node.
#[derive(Clone)]
pub struct Term(Arc<Node>);

/// Expression node.
#[derive(Debug)]
pub enum Node {
    Symbol { name: String, sort: Sort },
    Bool(bool),
    Bits { value: u64, width: u32, signed: bool },
    Float { bits: u64, format: FpFormat },
    Unary { op: UnaryOp, arg: Term },
    Binary { op: BinaryOp, lhs: Term, rhs: Term },
    Connective { op: Connective, args: Vec<Term> },
    Ite { cond: Term, then: Term, otherwise: Term },
    Extract { hi: u32, lo: u32, arg: Term },
    Extend { signed: bool, by: u32, arg: Term },
    /// Reinterprets a bit-vector as a float of the same width.
    FromBits { format: FpFormat, arg: Term },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical not on booleans, bitwise not on bit-vectors.
    Not,
    Neg,
    Abs,
    IsNan,
    IsInfinite,
    IsZero,
    IsNegative,
    IsPositive,
    /// IEEE encoding of a float as a bit-vector.
    ToBits,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "neg",
            UnaryOp::Abs => "abs",
            UnaryOp::IsNan => "is_nan",
            UnaryOp::IsInfinite => "is_infinite",
            UnaryOp::IsZero => "is_zero",
            UnaryOp::IsNegative => "is_negative",
            UnaryOp::IsPositive => "is_positive",
            UnaryOp::ToBits => "to_bits",
        }
    }

    /// Sort of the result given the operand sort.
    pub fn result_sort(self, arg: Sort) -> Result<Sort, FormulaError> {
        let unsupported = Err(FormulaError::Unsupported {
            op: self.name(),
            sort: arg,
        });
        match (self, arg) {
            (UnaryOp::Not, Sort::Bool | Sort::Bits { .. }) => Ok(arg),
            (UnaryOp::Neg, Sort::Bits { .. } | Sort::Float(_)) => Ok(arg),
            (UnaryOp::Abs, Sort::Float(_)) => Ok(arg),
            (
                UnaryOp::IsNan
                | UnaryOp::IsInfinite
                | UnaryOp::IsZero
                | UnaryOp::IsNegative
                | UnaryOp::IsPositive,
                Sort::Float(_),
            ) => Ok(Sort::Bool),
            (UnaryOp::ToBits, Sort::Float(format)) => Ok(Sort::unsigned(format.width())),
            _ => unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// Logical on booleans, bitwise on bit-vectors.
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Concat,
    /// IEEE equality for floats, structural otherwise.
    Eq,
    Ne,
    /// Structural equality (`+0 != -0`, `NaN == NaN`).
    Same,
    Lt,
    Le,
    Gt,
    Ge,
    ULt,
    ULe,
    UGt,
    UGe,
    SLt,
    SLe,
    SGt,
    SGe,
    Implies,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Concat => "concat",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Same => "same",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::ULt => "ult",
            BinaryOp::ULe => "ule",
            BinaryOp::UGt => "ugt",
            BinaryOp::UGe => "uge",
            BinaryOp::SLt => "slt",
            BinaryOp::SLe => "sle",
            BinaryOp::SGt => "sgt",
            BinaryOp::SGe => "sge",
            BinaryOp::Implies => "implies",
        }
    }

    /// Returns true for operators producing a boolean.
    pub fn is_predicate(self) -> bool {
        !matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Rem
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::Concat
        )
    }

    /// Sort of the result given the operand sorts.
    pub fn result_sort(self, lhs: Sort, rhs: Sort) -> Result<Sort, FormulaError> {
        if self == BinaryOp::Concat {
            return match (lhs, rhs) {
                (Sort::Bits { width: a, .. }, Sort::Bits { width: b, .. }) => {
                    Ok(Sort::unsigned(a + b))
                }
                (Sort::Bits { .. }, other) | (other, _) => Err(FormulaError::Unsupported {
                    op: self.name(),
                    sort: other,
                }),
            };
        }
        if !lhs.compatible(rhs) {
            return Err(FormulaError::SortMismatch {
                op: self.name(),
                left: lhs,
                right: rhs,
            });
        }
        let supported = match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                matches!(lhs, Sort::Bits { .. } | Sort::Float(_))
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                matches!(lhs, Sort::Bool | Sort::Bits { .. })
            }
            BinaryOp::Shl | BinaryOp::Shr => matches!(lhs, Sort::Bits { .. }),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Same => true,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                matches!(lhs, Sort::Bits { .. } | Sort::Float(_))
            }
            BinaryOp::ULt
            | BinaryOp::ULe
            | BinaryOp::UGt
            | BinaryOp::UGe
            | BinaryOp::SLt
            | BinaryOp::SLe
            | BinaryOp::SGt
            | BinaryOp::SGe => matches!(lhs, Sort::Bits { .. }),
            BinaryOp::Implies => lhs == Sort::Bool,
            BinaryOp::Concat => unreachable!("handled above"),
        };
        if !supported {
            return Err(FormulaError::Unsupported {
                op: self.name(),
                sort: lhs,
            });
        }
        Ok(if self.is_predicate() { Sort::Bool } else { lhs })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    All,
    Any,
}

/// Values that can stand as the right operand of a term operator.
///
/// Numbers and booleans become constants of the left operand's sort.
pub trait IntoOperand {
    fn into_operand(self, like: Sort) -> Term;
}

impl IntoOperand for Term {
    fn into_operand(self, _like: Sort) -> Term {
        self
    }
}

impl IntoOperand for &Term {
    fn into_operand(self, _like: Sort) -> Term {
        self.clone()
    }
}

impl IntoOperand for bool {
    fn into_operand(self, like: Sort) -> Term {
        match like {
            Sort::Bool => Term::bool(self),
            _ => (self as i64).into_operand(like),
        }
    }
}

macro_rules! int_operand {
    ($($ty:ty),*) => {$(
        impl IntoOperand for $ty {
            fn into_operand(self, like: Sort) -> Term {
                Term::integer(self as i128, like)
            }
        }
    )*};
}

int_operand!(i8, i16, i32, i64, u8, u16, u32, u64);

impl IntoOperand for f64 {
    fn into_operand(self, like: Sort) -> Term {
        match like {
            Sort::Float(format) => Term::float(format.encode(self), format),
            Sort::Bool => Term::bool(self != 0.0),
            Sort::Bits { .. } => Term::integer(self as i64 as i128, like),
        }
    }
}

impl IntoOperand for f32 {
    fn into_operand(self, like: Sort) -> Term {
        (self as f64).into_operand(like)
    }
}

impl IntoOperand for f16 {
    fn into_operand(self, like: Sort) -> Term {
        self.to_f64().into_operand(like)
    }
}

impl Term {
    fn new(node: Node) -> Self {
        Term(Arc::new(node))
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Free constant with the given name and sort.
    pub fn symbol(name: impl Into<String>, sort: Sort) -> Self {
        Self::new(Node::Symbol {
            name: name.into(),
            sort,
        })
    }

    pub fn bool(value: bool) -> Self {
        Self::new(Node::Bool(value))
    }

    /// Unsigned bit-vector constant; `value` is truncated to `width`.
    pub fn bits(value: u64, width: u32) -> Self {
        Self::bits_of(value, Sort::unsigned(width))
    }

    /// Bit-vector constant of the given (bit-vector) sort.
    pub fn bits_of(value: u64, sort: Sort) -> Self {
        let (width, signed) = match sort {
            Sort::Bits { width, signed } => (width, signed),
            other => (other.width(), false),
        };
        Self::new(Node::Bits {
            value: value & mask(width),
            width,
            signed,
        })
    }

    /// Float constant from its encoding.
    pub fn float(bits: u64, format: FpFormat) -> Self {
        Self::new(Node::Float {
            bits: bits & mask(format.width()),
            format,
        })
    }

    pub fn fp16(value: f16) -> Self {
        Self::float(value.to_bits() as u64, FpFormat::HALF)
    }

    pub fn fp32(value: f32) -> Self {
        Self::float(value.to_bits() as u64, FpFormat::SINGLE)
    }

    pub fn fp64(value: f64) -> Self {
        Self::float(value.to_bits(), FpFormat::DOUBLE)
    }

    /// Integer constant of the given sort (wrapped to the width).
    pub fn integer(value: i128, sort: Sort) -> Self {
        match sort {
            Sort::Bool => Self::bool(value != 0),
            Sort::Bits { .. } => Self::bits_of(value as u64, sort),
            Sort::Float(format) => Self::float(format.encode(value as f64), format),
        }
    }

    /// Constant of the given sort holding `literal`.
    pub fn literal(literal: &Literal, sort: Sort) -> Self {
        match (*literal, sort) {
            (Literal::Bool(b), Sort::Bool) => Self::bool(b),
            (Literal::Bits { value, .. }, Sort::Bits { .. }) => Self::bits_of(value, sort),
            (Literal::Bits { value, .. }, Sort::Float(format)) => Self::float(value, format),
            (Literal::Float { bits, format: from }, Sort::Float(format)) if from == format => {
                Self::float(bits, format)
            }
            (Literal::Int(i), _) => Self::integer(i as i128, sort),
            (lit, _) => lit.as_f64().into_operand(sort),
        }
    }

    /// Conjunction of `terms` (true when empty).
    pub fn all(terms: impl IntoIterator<Item = Term>) -> Self {
        Self::new(Node::Connective {
            op: Connective::All,
            args: terms.into_iter().collect(),
        })
    }

    /// Disjunction of `terms` (false when empty).
    pub fn any(terms: impl IntoIterator<Item = Term>) -> Self {
        Self::new(Node::Connective {
            op: Connective::Any,
            args: terms.into_iter().collect(),
        })
    }

    pub fn ite(cond: Term, then: Term, otherwise: impl IntoOperand) -> Self {
        let otherwise = otherwise.into_operand(then.hint());
        Self::new(Node::Ite {
            cond,
            then,
            otherwise,
        })
    }

    /// Reinterprets a bit-vector term as a float of `format`.
    pub fn from_bits(bits: Term, format: FpFormat) -> Self {
        Self::new(Node::FromBits { format, arg: bits })
    }

    fn unary(&self, op: UnaryOp) -> Term {
        Self::new(Node::Unary {
            op,
            arg: self.clone(),
        })
    }

    fn binary(&self, op: BinaryOp, rhs: impl IntoOperand) -> Term {
        let rhs = rhs.into_operand(self.hint());
        Self::new(Node::Binary {
            op,
            lhs: self.clone(),
            rhs,
        })
    }

    pub fn eq(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Ne, rhs)
    }

    /// Structural equality, distinguishing signed zeros and equating NaNs.
    pub fn same(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Same, rhs)
    }

    pub fn lt(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn le(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Le, rhs)
    }

    pub fn gt(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn ge(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Ge, rhs)
    }

    pub fn ult(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::ULt, rhs)
    }

    pub fn ule(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::ULe, rhs)
    }

    pub fn ugt(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::UGt, rhs)
    }

    pub fn uge(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::UGe, rhs)
    }

    pub fn slt(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::SLt, rhs)
    }

    pub fn sle(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::SLe, rhs)
    }

    pub fn sgt(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::SGt, rhs)
    }

    pub fn sge(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::SGe, rhs)
    }

    pub fn and(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn implies(&self, rhs: impl IntoOperand) -> Term {
        self.binary(BinaryOp::Implies, rhs)
    }

    /// `self` in `[lo, hi]` using the sort's own ordering.
    pub fn within(&self, lo: impl IntoOperand, hi: impl IntoOperand) -> Term {
        self.ge(lo).and(self.le(hi))
    }

    /// Bits `hi..=lo` as an unsigned bit-vector.
    pub fn extract(&self, hi: u32, lo: u32) -> Term {
        Self::new(Node::Extract {
            hi,
            lo,
            arg: self.clone(),
        })
    }

    pub fn bit(&self, index: u32) -> Term {
        self.extract(index, index)
    }

    pub fn concat(&self, rhs: &Term) -> Term {
        self.binary(BinaryOp::Concat, rhs)
    }

    pub fn zero_extend(&self, by: u32) -> Term {
        self.extend(false, by)
    }

    pub fn sign_extend(&self, by: u32) -> Term {
        self.extend(true, by)
    }

    fn extend(&self, signed: bool, by: u32) -> Term {
        Self::new(Node::Extend {
            signed,
            by,
            arg: self.clone(),
        })
    }

    pub fn is_nan(&self) -> Term {
        self.unary(UnaryOp::IsNan)
    }

    pub fn is_infinite(&self) -> Term {
        self.unary(UnaryOp::IsInfinite)
    }

    pub fn is_zero(&self) -> Term {
        self.unary(UnaryOp::IsZero)
    }

    pub fn is_negative(&self) -> Term {
        self.unary(UnaryOp::IsNegative)
    }

    pub fn is_positive(&self) -> Term {
        self.unary(UnaryOp::IsPositive)
    }

    pub fn abs(&self) -> Term {
        self.unary(UnaryOp::Abs)
    }

    /// IEEE encoding of a float term.
    pub fn to_bits(&self) -> Term {
        self.unary(UnaryOp::ToBits)
    }

    /// Checks the term and returns its sort.
    pub fn sort(&self) -> Result<Sort, FormulaError> {
        match self.node() {
            Node::Symbol { sort, .. } => Ok(*sort),
            Node::Bool(_) => Ok(Sort::Bool),
            Node::Bits { width, signed, .. } => Ok(Sort::Bits {
                width: *width,
                signed: *signed,
            }),
            Node::Float { format, .. } => Ok(Sort::Float(*format)),
            Node::Unary { op, arg } => op.result_sort(arg.sort()?),
            Node::Binary { op, lhs, rhs } => op.result_sort(lhs.sort()?, rhs.sort()?),
            Node::Connective { op, args } => {
                for arg in args {
                    let sort = arg.sort()?;
                    if sort != Sort::Bool {
                        return Err(FormulaError::Unsupported {
                            op: match op {
                                Connective::All => "all",
                                Connective::Any => "any",
                            },
                            sort,
                        });
                    }
                }
                Ok(Sort::Bool)
            }
            Node::Ite {
                cond,
                then,
                otherwise,
            } => {
                let cond = cond.sort()?;
                if cond != Sort::Bool {
                    return Err(FormulaError::NotBoolean(cond));
                }
                let (a, b) = (then.sort()?, otherwise.sort()?);
                if !a.compatible(b) {
                    return Err(FormulaError::SortMismatch {
                        op: "ite",
                        left: a,
                        right: b,
                    });
                }
                Ok(a)
            }
            Node::Extract { hi, lo, arg } => match arg.sort()? {
                Sort::Bits { width, .. } if lo <= hi && *hi < width => {
                    Ok(Sort::unsigned(hi - lo + 1))
                }
                sort => Err(FormulaError::Extract {
                    hi: *hi,
                    lo: *lo,
                    sort,
                }),
            },
            Node::Extend { signed, by, arg } => match arg.sort()? {
                Sort::Bits { width, .. } => Ok(Sort::Bits {
                    width: width + by,
                    signed: *signed,
                }),
                sort => Err(FormulaError::Unsupported {
                    op: "extend",
                    sort,
                }),
            },
            Node::FromBits { format, arg } => match arg.sort()? {
                Sort::Bits { width, .. } if width == format.width() => Ok(Sort::Float(*format)),
                sort => Err(FormulaError::SortMismatch {
                    op: "from_bits",
                    left: Sort::Float(*format),
                    right: sort,
                }),
            },
        }
    }

    /// Best-effort sort used to coerce literal operands. Never fails; a
    /// malformed term is reported later by [`Term::sort`].
    pub fn hint(&self) -> Sort {
        match self.node() {
            Node::Symbol { sort, .. } => *sort,
            Node::Bool(_) | Node::Connective { .. } => Sort::Bool,
            Node::Bits { width, signed, .. } => Sort::Bits {
                width: *width,
                signed: *signed,
            },
            Node::Float { format, .. } | Node::FromBits { format, .. } => Sort::Float(*format),
            Node::Unary { op, arg } => {
                let arg = arg.hint();
                op.result_sort(arg).unwrap_or(arg)
            }
            Node::Binary { op, lhs, rhs } => {
                if op.is_predicate() {
                    Sort::Bool
                } else if *op == BinaryOp::Concat {
                    Sort::unsigned(lhs.hint().width() + rhs.hint().width())
                } else {
                    lhs.hint()
                }
            }
            Node::Ite { then, .. } => then.hint(),
            Node::Extract { hi, lo, .. } => Sort::unsigned(hi.saturating_sub(*lo) + 1),
            Node::Extend { signed, by, arg } => Sort::Bits {
                width: arg.hint().width() + by,
                signed: *signed,
            },
        }
    }

    /// Collects every free symbol and its sort.
    pub fn collect_symbols(&self, out: &mut BTreeMap<String, Sort>) {
        match self.node() {
            Node::Symbol { name, sort } => {
                out.insert(name.clone(), *sort);
            }
            Node::Bool(_) | Node::Bits { .. } | Node::Float { .. } => {}
            Node::Unary { arg, .. }
            | Node::Extract { arg, .. }
            | Node::Extend { arg, .. }
            | Node::FromBits { arg, .. } => arg.collect_symbols(out),
            Node::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Node::Connective { args, .. } => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
            Node::Ite {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_symbols(out);
                then.collect_symbols(out);
                otherwise.collect_symbols(out);
            }
        }
    }
}

impl std::fmt::Debug for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.node().fmt(f)
    }
}

macro_rules! binary_operators {
    ($($trait:ident :: $method:ident => $op:ident;)*) => {$(
        impl<R: IntoOperand> ops::$trait<R> for Term {
            type Output = Term;

            fn $method(self, rhs: R) -> Term {
                self.binary(BinaryOp::$op, rhs)
            }
        }

        impl<R: IntoOperand> ops::$trait<R> for &Term {
            type Output = Term;

            fn $method(self, rhs: R) -> Term {
                self.binary(BinaryOp::$op, rhs)
            }
        }
    )*};
}

binary_operators! {
    Add::add => Add;
    Sub::sub => Sub;
    Mul::mul => Mul;
    Div::div => Div;
    Rem::rem => Rem;
    BitAnd::bitand => And;
    BitOr::bitor => Or;
    BitXor::bitxor => Xor;
    Shl::shl => Shl;
    Shr::shr => Shr;
}

impl ops::Not for Term {
    type Output = Term;

    fn not(self) -> Term {
        self.unary(UnaryOp::Not)
    }
}

impl ops::Not for &Term {
    type Output = Term;

    fn not(self) -> Term {
        self.unary(UnaryOp::Not)
    }
}

impl ops::Neg for Term {
    type Output = Term;

    fn neg(self) -> Term {
        self.unary(UnaryOp::Neg)
    }
}

impl ops::Neg for &Term {
    type Output = Term;

    fn neg(self) -> Term {
        self.unary(UnaryOp::Neg)
    }
}
