//! Lowering of terms to typed z3 ASTs.
//!
//! Floats travel as their IEEE-754 encoding: a float of format `(e, s)` is
//! a bit-vector of `e + s` bits. Classification, negation, absolute value
//! and the IEEE comparisons are expressed over the sign, exponent and
//! mantissa fields of that encoding, so a float's model value is its bit
//! pattern. Float arithmetic is not lowered.

use randforge_core::term::{BinaryOp, Connective, Node, UnaryOp};
use randforge_core::{FormulaError, FpFormat, Literal, Sort, Term};
use z3::ast::{Ast, Bool, BV};
use z3::Context;

/// A lowered term.
#[derive(Debug, Clone)]
pub enum Lowered<'ctx> {
    Bool(Bool<'ctx>),
    /// Bit-vectors, and floats as their encoding; the sort tells them
    /// apart.
    Bits(BV<'ctx>, Sort),
}

impl Lowered<'_> {
    pub fn sort(&self) -> Sort {
        match self {
            Lowered::Bool(_) => Sort::Bool,
            Lowered::Bits(_, sort) => *sort,
        }
    }
}

/// Builds z3 ASTs for terms within one context.
#[derive(Debug, Clone, Copy)]
pub struct Lowering<'ctx> {
    ctx: &'ctx Context,
}

impl<'ctx> Lowering<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self { ctx }
    }

    /// The z3 constant of a solver symbol.
    pub fn declare(&self, name: &str, sort: Sort) -> Lowered<'ctx> {
        match sort {
            Sort::Bool => Lowered::Bool(Bool::new_const(self.ctx, name)),
            Sort::Bits { width, .. } => Lowered::Bits(BV::new_const(self.ctx, name, width), sort),
            Sort::Float(format) => {
                Lowered::Bits(BV::new_const(self.ctx, name, format.width()), sort)
            }
        }
    }

    /// Value of symbol `name` in `model`, completed with defaults for
    /// symbols the model leaves open.
    pub fn read(&self, model: &z3::Model<'ctx>, name: &str, sort: Sort) -> Option<Literal> {
        match self.declare(name, sort) {
            Lowered::Bool(b) => model.eval(&b, true)?.as_bool().map(Literal::Bool),
            Lowered::Bits(bv, Sort::Float(format)) => {
                let bits = model.eval(&bv, true)?.as_u64()?;
                Some(Literal::Float { bits, format })
            }
            Lowered::Bits(bv, sort) => {
                let value = model.eval(&bv, true)?.as_u64()?;
                Some(Literal::Bits {
                    value,
                    width: sort.width(),
                })
            }
        }
    }

    /// Lowers a formula.
    ///
    /// # Errors
    ///
    /// Fails if `term` is not boolean or contains a sort error.
    pub fn boolean(&self, term: &Term) -> Result<Bool<'ctx>, FormulaError> {
        match self.lower(term)? {
            Lowered::Bool(b) => Ok(b),
            other => Err(FormulaError::NotBoolean(other.sort())),
        }
    }

    /// Lowers any term.
    ///
    /// # Errors
    ///
    /// Returns the first sort error found in the term, or
    /// [`FormulaError::Unsupported`] for float arithmetic.
    pub fn lower(&self, term: &Term) -> Result<Lowered<'ctx>, FormulaError> {
        match term.node() {
            Node::Symbol { name, sort } => Ok(self.declare(name, *sort)),
            Node::Bool(value) => Ok(Lowered::Bool(Bool::from_bool(self.ctx, *value))),
            Node::Bits {
                value,
                width,
                signed,
            } => Ok(Lowered::Bits(
                BV::from_u64(self.ctx, *value, *width),
                Sort::Bits {
                    width: *width,
                    signed: *signed,
                },
            )),
            Node::Float { bits, format } => Ok(Lowered::Bits(
                BV::from_u64(self.ctx, *bits, format.width()),
                Sort::Float(*format),
            )),
            Node::Unary { op, arg } => self.unary(*op, self.lower(arg)?),
            Node::Binary { op, lhs, rhs } => self.binary(*op, self.lower(lhs)?, self.lower(rhs)?),
            Node::Connective { op, args } => {
                let parts = args
                    .iter()
                    .map(|arg| self.boolean(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Bool<'ctx>> = parts.iter().collect();
                let joined = match (op, refs.len()) {
                    (Connective::All, 0) => Bool::from_bool(self.ctx, true),
                    (Connective::Any, 0) => Bool::from_bool(self.ctx, false),
                    (Connective::All, _) => Bool::and(self.ctx, &refs),
                    (Connective::Any, _) => Bool::or(self.ctx, &refs),
                };
                Ok(Lowered::Bool(joined))
            }
            Node::Ite {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.boolean(cond)?;
                match (self.lower(then)?, self.lower(otherwise)?) {
                    (Lowered::Bool(a), Lowered::Bool(b)) => Ok(Lowered::Bool(cond.ite(&a, &b))),
                    (Lowered::Bits(a, left), Lowered::Bits(b, right)) if left.compatible(right) => {
                        Ok(Lowered::Bits(cond.ite(&a, &b), left))
                    }
                    (a, b) => Err(FormulaError::SortMismatch {
                        op: "ite",
                        left: a.sort(),
                        right: b.sort(),
                    }),
                }
            }
            Node::Extract { hi, lo, arg } => match self.lower(arg)? {
                Lowered::Bits(bv, Sort::Bits { width, .. }) if lo <= hi && *hi < width => Ok(
                    Lowered::Bits(bv.extract(*hi, *lo), Sort::unsigned(hi - lo + 1)),
                ),
                other => Err(FormulaError::Extract {
                    hi: *hi,
                    lo: *lo,
                    sort: other.sort(),
                }),
            },
            Node::Extend { signed, by, arg } => match self.lower(arg)? {
                Lowered::Bits(bv, Sort::Bits { width, .. }) => {
                    let extended = if *signed {
                        bv.sign_ext(*by)
                    } else {
                        bv.zero_ext(*by)
                    };
                    Ok(Lowered::Bits(
                        extended,
                        Sort::Bits {
                            width: width + by,
                            signed: *signed,
                        },
                    ))
                }
                other => Err(FormulaError::Unsupported {
                    op: "extend",
                    sort: other.sort(),
                }),
            },
            Node::FromBits { format, arg } => match self.lower(arg)? {
                Lowered::Bits(bv, Sort::Bits { width, .. }) if width == format.width() => {
                    Ok(Lowered::Bits(bv, Sort::Float(*format)))
                }
                other => Err(FormulaError::SortMismatch {
                    op: "from_bits",
                    left: Sort::unsigned(format.width()),
                    right: other.sort(),
                }),
            },
        }
    }

    fn unary(&self, op: UnaryOp, arg: Lowered<'ctx>) -> Result<Lowered<'ctx>, FormulaError> {
        let result = op.result_sort(arg.sort())?;
        let unsupported = FormulaError::Unsupported {
            op: op.name(),
            sort: arg.sort(),
        };
        let lowered = match arg {
            Lowered::Bool(b) => match op {
                UnaryOp::Not => Lowered::Bool(b.not()),
                _ => return Err(unsupported),
            },
            Lowered::Bits(bv, Sort::Float(format)) => {
                let ieee = Ieee::new(self.ctx, &bv, format);
                match op {
                    UnaryOp::Neg => Lowered::Bits(bv.bvxor(&ieee.sign_mask()), result),
                    UnaryOp::Abs => Lowered::Bits(bv.bvand(&ieee.sign_mask().bvnot()), result),
                    UnaryOp::IsNan => Lowered::Bool(ieee.is_nan()),
                    UnaryOp::IsInfinite => Lowered::Bool(ieee.is_infinite()),
                    UnaryOp::IsZero => Lowered::Bool(ieee.is_zero()),
                    UnaryOp::IsNegative => Lowered::Bool(ieee.is_negative()),
                    UnaryOp::IsPositive => Lowered::Bool(ieee.is_positive()),
                    UnaryOp::ToBits => Lowered::Bits(bv, result),
                    UnaryOp::Not => return Err(unsupported),
                }
            }
            Lowered::Bits(bv, _) => match op {
                UnaryOp::Not => Lowered::Bits(bv.bvnot(), result),
                UnaryOp::Neg => Lowered::Bits(bv.bvneg(), result),
                _ => return Err(unsupported),
            },
        };
        Ok(lowered)
    }

    fn binary(
        &self,
        op: BinaryOp,
        lhs: Lowered<'ctx>,
        rhs: Lowered<'ctx>,
    ) -> Result<Lowered<'ctx>, FormulaError> {
        let result = op.result_sort(lhs.sort(), rhs.sort())?;
        match (lhs, rhs) {
            (Lowered::Bool(a), Lowered::Bool(b)) => self.boolean_binary(op, &a, &b),
            (Lowered::Bits(a, Sort::Float(format)), Lowered::Bits(b, _)) => {
                self.float_binary(op, format, &a, &b)
            }
            (Lowered::Bits(a, left), Lowered::Bits(b, _)) => {
                bits_binary(op, left, result, &a, &b)
            }
            (a, b) => Err(FormulaError::SortMismatch {
                op: op.name(),
                left: a.sort(),
                right: b.sort(),
            }),
        }
    }

    fn boolean_binary(
        &self,
        op: BinaryOp,
        a: &Bool<'ctx>,
        b: &Bool<'ctx>,
    ) -> Result<Lowered<'ctx>, FormulaError> {
        let lowered = match op {
            BinaryOp::And => Bool::and(self.ctx, &[a, b]),
            BinaryOp::Or => Bool::or(self.ctx, &[a, b]),
            BinaryOp::Xor => a.xor(b),
            BinaryOp::Eq | BinaryOp::Same => a._eq(b),
            BinaryOp::Ne => a._eq(b).not(),
            BinaryOp::Implies => a.implies(b),
            _ => {
                return Err(FormulaError::Unsupported {
                    op: op.name(),
                    sort: Sort::Bool,
                })
            }
        };
        Ok(Lowered::Bool(lowered))
    }

    fn float_binary(
        &self,
        op: BinaryOp,
        format: FpFormat,
        a: &BV<'ctx>,
        b: &BV<'ctx>,
    ) -> Result<Lowered<'ctx>, FormulaError> {
        let (x, y) = (Ieee::new(self.ctx, a, format), Ieee::new(self.ctx, b, format));
        let lowered = match op {
            BinaryOp::Same => a._eq(b),
            BinaryOp::Eq => x.ieee_eq(&y),
            BinaryOp::Ne => x.ieee_eq(&y).not(),
            BinaryOp::Lt => x.lt(&y),
            BinaryOp::Le => x.le(&y),
            BinaryOp::Gt => y.lt(&x),
            BinaryOp::Ge => y.le(&x),
            _ => {
                return Err(FormulaError::Unsupported {
                    op: op.name(),
                    sort: Sort::Float(format),
                })
            }
        };
        Ok(Lowered::Bool(lowered))
    }
}

fn bits_binary<'ctx>(
    op: BinaryOp,
    left: Sort,
    result: Sort,
    a: &BV<'ctx>,
    b: &BV<'ctx>,
) -> Result<Lowered<'ctx>, FormulaError> {
    let signed = matches!(left, Sort::Bits { signed: true, .. });
    let bits = |bv: BV<'ctx>| -> Result<Lowered<'ctx>, FormulaError> {
        Ok(Lowered::Bits(bv, result))
    };
    let boolean = |b: Bool<'ctx>| -> Result<Lowered<'ctx>, FormulaError> {
        Ok(Lowered::Bool(b))
    };
    match op {
        BinaryOp::Add => bits(a.bvadd(b)),
        BinaryOp::Sub => bits(a.bvsub(b)),
        BinaryOp::Mul => bits(a.bvmul(b)),
        BinaryOp::Div if signed => bits(a.bvsdiv(b)),
        BinaryOp::Div => bits(a.bvudiv(b)),
        BinaryOp::Rem if signed => bits(a.bvsrem(b)),
        BinaryOp::Rem => bits(a.bvurem(b)),
        BinaryOp::And => bits(a.bvand(b)),
        BinaryOp::Or => bits(a.bvor(b)),
        BinaryOp::Xor => bits(a.bvxor(b)),
        BinaryOp::Shl => bits(a.bvshl(b)),
        BinaryOp::Shr if signed => bits(a.bvashr(b)),
        BinaryOp::Shr => bits(a.bvlshr(b)),
        BinaryOp::Concat => bits(a.concat(b)),
        BinaryOp::Eq | BinaryOp::Same => boolean(a._eq(b)),
        BinaryOp::Ne => boolean(a._eq(b).not()),
        BinaryOp::Lt if signed => boolean(a.bvslt(b)),
        BinaryOp::Le if signed => boolean(a.bvsle(b)),
        BinaryOp::Gt if signed => boolean(a.bvsgt(b)),
        BinaryOp::Ge if signed => boolean(a.bvsge(b)),
        BinaryOp::Lt | BinaryOp::ULt => boolean(a.bvult(b)),
        BinaryOp::Le | BinaryOp::ULe => boolean(a.bvule(b)),
        BinaryOp::Gt | BinaryOp::UGt => boolean(a.bvugt(b)),
        BinaryOp::Ge | BinaryOp::UGe => boolean(a.bvuge(b)),
        BinaryOp::SLt => boolean(a.bvslt(b)),
        BinaryOp::SLe => boolean(a.bvsle(b)),
        BinaryOp::SGt => boolean(a.bvsgt(b)),
        BinaryOp::SGe => boolean(a.bvsge(b)),
        BinaryOp::Implies => Err(FormulaError::Unsupported {
            op: op.name(),
            sort: left,
        }),
    }
}

/// Field view of an IEEE-754 encoding.
struct Ieee<'a, 'ctx> {
    ctx: &'ctx Context,
    bits: &'a BV<'ctx>,
    format: FpFormat,
}

impl<'a, 'ctx> Ieee<'a, 'ctx> {
    fn new(ctx: &'ctx Context, bits: &'a BV<'ctx>, format: FpFormat) -> Self {
        Self { ctx, bits, format }
    }

    fn width(&self) -> u32 {
        self.format.width()
    }

    fn mantissa_bits(&self) -> u32 {
        self.format.sbits - 1
    }

    fn sign_mask(&self) -> BV<'ctx> {
        BV::from_u64(self.ctx, 1 << (self.width() - 1), self.width())
    }

    fn sign(&self) -> Bool<'ctx> {
        let top = self.width() - 1;
        self.bits
            .extract(top, top)
            ._eq(&BV::from_u64(self.ctx, 1, 1))
    }

    fn exponent_all_ones(&self) -> Bool<'ctx> {
        let ebits = self.format.ebits;
        let exponent = self
            .bits
            .extract(self.width() - 2, self.mantissa_bits());
        exponent._eq(&BV::from_u64(self.ctx, (1 << ebits) - 1, ebits))
    }

    fn mantissa_is_zero(&self) -> Bool<'ctx> {
        let m = self.mantissa_bits();
        self.bits
            .extract(m - 1, 0)
            ._eq(&BV::from_u64(self.ctx, 0, m))
    }

    fn is_nan(&self) -> Bool<'ctx> {
        Bool::and(
            self.ctx,
            &[&self.exponent_all_ones(), &self.mantissa_is_zero().not()],
        )
    }

    fn is_infinite(&self) -> Bool<'ctx> {
        Bool::and(
            self.ctx,
            &[&self.exponent_all_ones(), &self.mantissa_is_zero()],
        )
    }

    /// Either signed zero.
    fn is_zero(&self) -> Bool<'ctx> {
        let magnitude = self.width() - 1;
        self.bits
            .extract(magnitude - 1, 0)
            ._eq(&BV::from_u64(self.ctx, 0, magnitude))
    }

    fn is_negative(&self) -> Bool<'ctx> {
        Bool::and(self.ctx, &[&self.sign(), &self.is_nan().not()])
    }

    fn is_positive(&self) -> Bool<'ctx> {
        Bool::and(self.ctx, &[&self.sign().not(), &self.is_nan().not()])
    }

    /// Unsigned key that orders non-NaN encodings like their values, with
    /// `-0` just below `+0`.
    fn order_key(&self) -> BV<'ctx> {
        self.sign()
            .ite(&self.bits.bvnot(), &self.bits.bvor(&self.sign_mask()))
    }

    fn ieee_eq(&self, other: &Self) -> Bool<'ctx> {
        let both_zero = Bool::and(self.ctx, &[&self.is_zero(), &other.is_zero()]);
        let equal = Bool::or(self.ctx, &[&self.bits._eq(other.bits), &both_zero]);
        Bool::and(
            self.ctx,
            &[&self.is_nan().not(), &other.is_nan().not(), &equal],
        )
    }

    fn lt(&self, other: &Self) -> Bool<'ctx> {
        let both_zero = Bool::and(self.ctx, &[&self.is_zero(), &other.is_zero()]);
        Bool::and(
            self.ctx,
            &[
                &self.is_nan().not(),
                &other.is_nan().not(),
                &both_zero.not(),
                &self.order_key().bvult(&other.order_key()),
            ],
        )
    }

    fn le(&self, other: &Self) -> Bool<'ctx> {
        let both_zero = Bool::and(self.ctx, &[&self.is_zero(), &other.is_zero()]);
        let ordered = Bool::or(
            self.ctx,
            &[&both_zero, &self.order_key().bvule(&other.order_key())],
        );
        Bool::and(
            self.ctx,
            &[&self.is_nan().not(), &other.is_nan().not(), &ordered],
        )
    }
}
