//! Native scalar types that can back a variable.
//!
//! [`Native`] ties a Rust scalar to its solver sort, its cast from foreign
//! literals, its unconstrained range and the intrinsic constraints injected
//! when the variable takes part in a solve.

use std::fmt;

use half::f16;
use num_traits::{PrimInt, WrappingAdd, WrappingMul, WrappingShl, WrappingShr, WrappingSub};
use rand::{Rng, RngCore};

use crate::error::FormulaError;
use crate::id::VarId;
use crate::session::Session;
use crate::sort::{mask, sign_extend, FpFormat, Literal, Sort};
use crate::term::Term;

/// A scalar type a [`Var`](crate::var::Var) can hold.
///
/// Widths passed to these functions are always in `1..=Self::WIDTH`.
pub trait Native:
    Copy + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Native width in bits.
    const WIDTH: u32;

    /// Whether the width may be narrowed below [`Native::WIDTH`].
    const NARROWABLE: bool;

    fn sort(width: u32) -> Sort;

    /// Converts a foreign value. Never fails: integers wrap to `width`,
    /// floats follow `as` semantics, raw bit-vectors reinterpret bits.
    fn cast(literal: &Literal, width: u32) -> Self;

    /// Encoding of `self` in the low `width` bits.
    fn to_raw(self, width: u32) -> u64;

    fn from_raw(raw: u64, width: u32) -> Self;

    /// Bounds for unconstrained draws.
    fn range(width: u32) -> (Self, Self);

    /// Uniform draw in `[lo, hi]`.
    fn sample<R: RngCore + ?Sized>(rng: &mut R, lo: Self, hi: Self) -> Self;

    /// Solver constant holding `self`.
    fn constant(self, width: u32) -> Term;

    /// Brings `self` into the representable range of `width`.
    fn fit(self, width: u32) -> Self {
        Self::from_raw(self.to_raw(width), width)
    }

    /// Constraints every solved variable of this type carries.
    fn apply_intrinsic(
        term: &Term,
        owner: VarId,
        width: u32,
        session: &mut Session,
    ) -> Result<(), FormulaError>;
}

/// Natives with value arithmetic (wrapping for integers).
pub trait Arith: Native {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
}

/// Integer natives; the only ones with bitwise operators.
pub trait Integer: Arith + PrimInt + WrappingShl + WrappingShr {}

/// IEEE float natives.
pub trait FloatNative: Arith {
    const FORMAT: FpFormat;

    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
    fn is_nan(self) -> bool;
}

fn integer_raw(literal: &Literal) -> u64 {
    match *literal {
        Literal::Bool(b) => b as u64,
        Literal::Bits { value, .. } => value,
        Literal::Int(i) => i as u64,
        Literal::Float { .. } | Literal::Real(_) => literal.as_f64() as i64 as u64,
    }
}

fn integer_intrinsic(term: &Term, width: u32, session: &mut Session) -> Result<(), FormulaError> {
    if session.bias_integers() {
        session.bias_bits(term, width)
    } else {
        Ok(())
    }
}

macro_rules! unsigned_native {
    ($($ty:ty),*) => {$(
        impl Native for $ty {
            const WIDTH: u32 = <$ty>::BITS;
            const NARROWABLE: bool = true;

            fn sort(width: u32) -> Sort {
                Sort::unsigned(width)
            }

            fn cast(literal: &Literal, width: u32) -> Self {
                Self::from_raw(integer_raw(literal), width)
            }

            fn to_raw(self, width: u32) -> u64 {
                self as u64 & mask(width)
            }

            fn from_raw(raw: u64, width: u32) -> Self {
                (raw & mask(width)) as $ty
            }

            fn range(width: u32) -> (Self, Self) {
                (0, mask(width) as $ty)
            }

            fn sample<R: RngCore + ?Sized>(rng: &mut R, lo: Self, hi: Self) -> Self {
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                rng.random_range(lo..=hi)
            }

            fn constant(self, width: u32) -> Term {
                Term::bits_of(self as u64, Self::sort(width))
            }

            fn apply_intrinsic(
                term: &Term,
                _owner: VarId,
                width: u32,
                session: &mut Session,
            ) -> Result<(), FormulaError> {
                integer_intrinsic(term, width, session)
            }
        }
    )*};
}

macro_rules! signed_native {
    ($($ty:ty),*) => {$(
        impl Native for $ty {
            const WIDTH: u32 = <$ty>::BITS;
            const NARROWABLE: bool = true;

            fn sort(width: u32) -> Sort {
                Sort::signed(width)
            }

            fn cast(literal: &Literal, width: u32) -> Self {
                Self::from_raw(integer_raw(literal), width)
            }

            fn to_raw(self, width: u32) -> u64 {
                self as i64 as u64 & mask(width)
            }

            fn from_raw(raw: u64, width: u32) -> Self {
                sign_extend(raw & mask(width), width) as $ty
            }

            fn range(width: u32) -> (Self, Self) {
                let lo = sign_extend(1u64 << (width - 1), width);
                let hi = (mask(width) >> 1) as i64;
                (lo as $ty, hi as $ty)
            }

            fn sample<R: RngCore + ?Sized>(rng: &mut R, lo: Self, hi: Self) -> Self {
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                rng.random_range(lo..=hi)
            }

            fn constant(self, width: u32) -> Term {
                Term::bits_of(self.to_raw(width), Self::sort(width))
            }

            fn apply_intrinsic(
                term: &Term,
                _owner: VarId,
                width: u32,
                session: &mut Session,
            ) -> Result<(), FormulaError> {
                integer_intrinsic(term, width, session)
            }
        }
    )*};
}

macro_rules! integer_arith {
    ($($ty:ty),*) => {$(
        impl Arith for $ty {
            fn add(self, rhs: Self) -> Self {
                WrappingAdd::wrapping_add(&self, &rhs)
            }

            fn sub(self, rhs: Self) -> Self {
                WrappingSub::wrapping_sub(&self, &rhs)
            }

            fn mul(self, rhs: Self) -> Self {
                WrappingMul::wrapping_mul(&self, &rhs)
            }
        }

        impl Integer for $ty {}
    )*};
}

unsigned_native!(u8, u16, u32, u64);
signed_native!(i8, i16, i32, i64);
integer_arith!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Native for bool {
    const WIDTH: u32 = 1;
    const NARROWABLE: bool = false;

    fn sort(_width: u32) -> Sort {
        Sort::Bool
    }

    fn cast(literal: &Literal, _width: u32) -> Self {
        match *literal {
            Literal::Bool(b) => b,
            Literal::Bits { value, .. } => value & 1 != 0,
            Literal::Int(i) => i != 0,
            Literal::Float { .. } | Literal::Real(_) => literal.as_f64() != 0.0,
        }
    }

    fn to_raw(self, _width: u32) -> u64 {
        self as u64
    }

    fn from_raw(raw: u64, _width: u32) -> Self {
        raw & 1 != 0
    }

    fn range(_width: u32) -> (Self, Self) {
        (false, true)
    }

    fn sample<R: RngCore + ?Sized>(rng: &mut R, lo: Self, hi: Self) -> Self {
        if lo == hi {
            lo
        } else {
            rng.random_bool(0.5)
        }
    }

    fn constant(self, _width: u32) -> Term {
        Term::bool(self)
    }

    fn apply_intrinsic(
        term: &Term,
        _owner: VarId,
        _width: u32,
        session: &mut Session,
    ) -> Result<(), FormulaError> {
        if session.bias_integers() {
            let coin = session.coin();
            session.add_uniformity(term.eq(coin))?;
        }
        Ok(())
    }
}

/// Float bias: the value is tied to an auxiliary bit-vector whose bits are
/// individually pulled towards fair coins, so that the solver spreads its
/// answers over the encoding space. NaN and infinities are excluded.
fn float_intrinsic(
    term: &Term,
    owner: VarId,
    format: FpFormat,
    session: &mut Session,
) -> Result<(), FormulaError> {
    let bits = session.aux_bits(owner, format.width());
    session.bias_bits(&bits, format.width())?;
    session.add_hard(!term.is_nan())?;
    session.add_hard(!term.is_infinite())?;
    session.add_hard(term.same(Term::from_bits(bits, format)))
}

macro_rules! float_native {
    ($ty:ty, $format:expr, $bits:ty, ($lo:expr, $hi:expr)) => {
        impl Native for $ty {
            const WIDTH: u32 = $format.width();
            const NARROWABLE: bool = false;

            fn sort(_width: u32) -> Sort {
                Sort::Float($format)
            }

            fn cast(literal: &Literal, _width: u32) -> Self {
                match *literal {
                    Literal::Bits { value, .. } => Self::from_raw(value, Self::WIDTH),
                    Literal::Float { bits, format } if format == $format => {
                        Self::from_raw(bits, Self::WIDTH)
                    }
                    _ => <$ty as FloatNative>::from_f64(literal.as_f64()),
                }
            }

            fn to_raw(self, _width: u32) -> u64 {
                self.to_bits() as u64
            }

            fn from_raw(raw: u64, _width: u32) -> Self {
                <$ty>::from_bits(raw as $bits)
            }

            fn range(_width: u32) -> (Self, Self) {
                ($lo, $hi)
            }

            fn sample<R: RngCore + ?Sized>(rng: &mut R, lo: Self, hi: Self) -> Self {
                let (lo, hi) = (FloatNative::to_f64(lo), FloatNative::to_f64(hi));
                if lo.is_nan() || hi.is_nan() {
                    return <$ty as FloatNative>::from_f64(f64::NAN);
                }
                let (lo, hi) = (lo.min(hi), lo.max(hi));
                if lo == hi {
                    return <$ty as FloatNative>::from_f64(lo);
                }
                <$ty as FloatNative>::from_f64(rng.random_range(lo..=hi))
            }

            fn constant(self, _width: u32) -> Term {
                Term::float(self.to_raw(Self::WIDTH), $format)
            }

            fn fit(self, _width: u32) -> Self {
                self
            }

            fn apply_intrinsic(
                term: &Term,
                owner: VarId,
                _width: u32,
                session: &mut Session,
            ) -> Result<(), FormulaError> {
                float_intrinsic(term, owner, $format, session)
            }
        }

        impl Arith for $ty {
            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }
        }
    };
}

float_native!(f16, FpFormat::HALF, u16, (f16::MIN, f16::MAX));
float_native!(f32, FpFormat::SINGLE, u32, (-f32::MAX, f32::MAX));
float_native!(f64, FpFormat::DOUBLE, u64, (-1e100, 1e100));

impl FloatNative for f16 {
    const FORMAT: FpFormat = FpFormat::HALF;

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    fn is_nan(self) -> bool {
        f16::is_nan(self)
    }
}

impl FloatNative for f32 {
    const FORMAT: FpFormat = FpFormat::SINGLE;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl FloatNative for f64 {
    const FORMAT: FpFormat = FpFormat::DOUBLE;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_unsigned_cast_wraps_to_width() {
        assert_eq!(u8::cast(&Literal::Int(300), 8), 44);
        assert_eq!(u64::cast(&Literal::Int(0x1f), 4), 0xf);
        assert_eq!(u16::cast(&Literal::Int(-1), 16), u16::MAX);
        assert_eq!(u8::cast(&Literal::Bool(true), 8), 1);
    }

    #[test]
    fn test_signed_cast_sign_extends() {
        let lit = Literal::Bits {
            value: 0xff,
            width: 8,
        };
        assert_eq!(i8::cast(&lit, 8), -1);
        assert_eq!(i32::cast(&lit, 8), -1);
        assert_eq!(i32::cast(&lit, 9), 255);
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(u8::range(8), (0, 255));
        assert_eq!(u64::range(4), (0, 15));
        assert_eq!(i8::range(8), (-128, 127));
        assert_eq!(i64::range(64), (i64::MIN, i64::MAX));
        assert_eq!(i16::range(4), (-8, 7));
    }

    #[test]
    fn test_float_ranges() {
        assert_eq!(f16::range(16), (f16::from_f64(-65504.0), f16::from_f64(65504.0)));
        assert_eq!(f32::range(32), (-f32::MAX, f32::MAX));
        assert_eq!(f64::range(64), (-1e100, 1e100));
    }

    #[test]
    fn test_float_cast_reinterprets_raw_bits() {
        let raw = Literal::Bits {
            value: 0x3fc0_0000,
            width: 32,
        };
        assert_eq!(f32::cast(&raw, 32), 1.5);
        assert_eq!(f64::cast(&Literal::Int(3), 64), 3.0);
        assert_eq!(f32::cast(&Literal::Real(1e300), 32), f32::INFINITY);
    }

    #[test]
    fn test_float_cast_across_formats() {
        let half = Literal::Float {
            bits: 0x3c00,
            format: FpFormat::HALF,
        };
        assert_eq!(f32::cast(&half, 32), 1.0);
        assert_eq!(f16::cast(&half, 16), f16::ONE);
    }

    #[test]
    fn test_samples_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let v = u8::sample(&mut rng, 10, 20);
            assert!((10..=20).contains(&v));
            let (lo, hi) = i64::range(12);
            let s = i64::sample(&mut rng, lo, hi);
            assert!((-2048..=2047).contains(&s));
            let f = f32::sample(&mut rng, -1.1, 1.1);
            assert!((-1.1..=1.1).contains(&f));
            let h = f16::sample(&mut rng, f16::MIN, f16::MAX);
            assert!(h.is_finite());
        }
    }

    #[test]
    fn test_swapped_bounds_are_reordered() {
        let mut rng = StdRng::seed_from_u64(9);
        let v = u32::sample(&mut rng, 7, 3);
        assert!((3..=7).contains(&v));
        assert_eq!(f64::sample(&mut rng, 2.0, 2.0), 2.0);
    }

    #[test]
    fn test_float_intrinsics() {
        let mut session = Session::new(Default::default(), 5);
        let owner = VarId::next();
        let term = Term::symbol(owner.symbol(), f32::sort(32));
        f32::apply_intrinsic(&term, owner, 32, &mut session).unwrap();
        assert_eq!(session.soft().len(), 32);
        assert_eq!(session.hard().len(), 3);
        assert!(session.symbols().contains_key(&format!("{}_bits", owner.symbol())));
    }

    #[test]
    fn test_integer_bias_can_be_disabled() {
        let mut session = Session::new(Default::default(), 5).with_integer_bias(false);
        let owner = VarId::next();
        let term = Term::symbol(owner.symbol(), u16::sort(16));
        u16::apply_intrinsic(&term, owner, 16, &mut session).unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn test_wrapping_arith() {
        assert_eq!(Arith::add(250u8, 10), 4);
        assert_eq!(Arith::sub(0i8, 1), -1);
        assert_eq!(Arith::mul(1.5f32, 2.0), 3.0);
    }
}
