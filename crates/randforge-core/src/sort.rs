//! Solver sorts and model literals.

use std::fmt;

use half::f16;

/// Mask selecting the low `width` bits of a `u64`.
pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Sign-extends the low `width` bits of `value` to 64 bits.
pub fn sign_extend(value: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// IEEE-754 floating-point format (exponent bits, significand bits
/// including the hidden bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FpFormat {
    pub ebits: u32,
    pub sbits: u32,
}

impl FpFormat {
    /// binary16
    pub const HALF: FpFormat = FpFormat { ebits: 5, sbits: 11 };
    /// binary32
    pub const SINGLE: FpFormat = FpFormat { ebits: 8, sbits: 24 };
    /// binary64
    pub const DOUBLE: FpFormat = FpFormat {
        ebits: 11,
        sbits: 53,
    };

    /// Total width of the encoding in bits.
    pub const fn width(self) -> u32 {
        self.ebits + self.sbits
    }

    /// Decodes an encoding of this format into an `f64`.
    ///
    /// Formats other than the three IEEE interchange widths decode as NaN.
    pub fn decode(self, bits: u64) -> f64 {
        match self {
            Self::HALF => f16::from_bits(bits as u16).to_f64(),
            Self::SINGLE => f32::from_bits(bits as u32) as f64,
            Self::DOUBLE => f64::from_bits(bits),
            _ => f64::NAN,
        }
    }

    /// Encodes `value` in this format, rounding to nearest even.
    pub fn encode(self, value: f64) -> u64 {
        match self {
            Self::HALF => f16::from_f64(value).to_bits() as u64,
            Self::SINGLE => (value as f32).to_bits() as u64,
            _ => value.to_bits(),
        }
    }
}

/// Sort of a symbolic term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    /// Fixed-width bit-vector. `signed` selects the signed flavour of
    /// comparisons, division and right shifts.
    Bits { width: u32, signed: bool },
    Float(FpFormat),
}

impl Sort {
    pub const fn unsigned(width: u32) -> Self {
        Sort::Bits {
            width,
            signed: false,
        }
    }

    pub const fn signed(width: u32) -> Self {
        Sort::Bits {
            width,
            signed: true,
        }
    }

    /// Bit width of a value of this sort.
    pub fn width(self) -> u32 {
        match self {
            Sort::Bool => 1,
            Sort::Bits { width, .. } => width,
            Sort::Float(format) => format.width(),
        }
    }

    /// Returns true if two terms of these sorts may be combined.
    ///
    /// Bit-vectors only need matching widths; signedness is taken from the
    /// left operand.
    pub fn compatible(self, other: Sort) -> bool {
        match (self, other) {
            (Sort::Bits { width: a, .. }, Sort::Bits { width: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Bits { width, signed } => {
                write!(f, "{}{}", if *signed { "SBits" } else { "Bits" }, width)
            }
            Sort::Float(FpFormat { ebits, sbits }) => write!(f, "Float({ebits}, {sbits})"),
        }
    }
}

/// A concrete value produced by a solver model or a caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Bool(bool),
    /// Raw bit-vector numeral, zero-extended to 64 bits.
    Bits { value: u64, width: u32 },
    /// Floating-point encoding in the given format.
    Float { bits: u64, format: FpFormat },
    Int(i64),
    Real(f64),
}

impl Literal {
    /// Numeric interpretation, used when casting across kinds.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Literal::Bool(b) => b as u8 as f64,
            Literal::Bits { value, .. } => value as f64,
            Literal::Float { bits, format } => format.decode(bits),
            Literal::Int(i) => i as f64,
            Literal::Real(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_widths() {
        assert_eq!(FpFormat::HALF.width(), 16);
        assert_eq!(FpFormat::SINGLE.width(), 32);
        assert_eq!(FpFormat::DOUBLE.width(), 64);
    }

    #[test]
    fn test_encode_decode() {
        let bits = FpFormat::SINGLE.encode(1.5);
        assert_eq!(bits, 1.5f32.to_bits() as u64);
        assert_eq!(FpFormat::SINGLE.decode(bits), 1.5);
        assert_eq!(FpFormat::HALF.decode(0x3c00), 1.0);
    }

    #[test]
    fn test_mask_and_sign_extend() {
        assert_eq!(mask(4), 0xf);
        assert_eq!(mask(64), u64::MAX);
        assert_eq!(sign_extend(0xf, 4), -1);
        assert_eq!(sign_extend(0x7, 4), 7);
    }

    #[test]
    fn test_bits_compatibility_ignores_signedness() {
        assert!(Sort::unsigned(8).compatible(Sort::signed(8)));
        assert!(!Sort::unsigned(8).compatible(Sort::unsigned(16)));
        assert!(!Sort::Bool.compatible(Sort::unsigned(1)));
    }
}
