//! Tests for symbolic terms.

use super::*;

fn byte(name: &str) -> Term {
    Term::symbol(name, Sort::unsigned(8))
}

fn single(name: &str) -> Term {
    Term::symbol(name, Sort::Float(FpFormat::SINGLE))
}

// ============================================================================
// Coercion
// ============================================================================

#[test]
fn test_integer_literal_takes_operand_sort() {
    let x = Term::symbol("x", Sort::signed(16));
    let sum = &x + 3;
    match sum.node() {
        Node::Binary { rhs, .. } => match rhs.node() {
            Node::Bits {
                value,
                width,
                signed,
            } => {
                assert_eq!(*value, 3);
                assert_eq!(*width, 16);
                assert!(*signed);
            }
            other => panic!("unexpected rhs {other:?}"),
        },
        other => panic!("unexpected node {other:?}"),
    }
    assert_eq!(sum.sort(), Ok(Sort::signed(16)));
}

#[test]
fn test_negative_literal_wraps_to_width() {
    let t = (-1i32).into_operand(Sort::unsigned(4));
    match t.node() {
        Node::Bits { value, .. } => assert_eq!(*value, 0xf),
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn test_real_literal_rounds_to_float_format() {
    let t = 1.1f64.into_operand(Sort::Float(FpFormat::SINGLE));
    match t.node() {
        Node::Float { bits, format } => {
            assert_eq!(*format, FpFormat::SINGLE);
            assert_eq!(*bits, 1.1f32.to_bits() as u64);
        }
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn test_literal_from_raw_bits_reinterprets_float() {
    let lit = Literal::Bits {
        value: 0x3f80_0000,
        width: 32,
    };
    match Term::literal(&lit, Sort::Float(FpFormat::SINGLE)).node() {
        Node::Float { bits, .. } => assert_eq!(*bits, 0x3f80_0000),
        other => panic!("unexpected node {other:?}"),
    }
}

// ============================================================================
// Sort checking
// ============================================================================

#[test]
fn test_comparisons_are_boolean() {
    let x = byte("x");
    assert_eq!(x.lt(10).sort(), Ok(Sort::Bool));
    assert_eq!(x.ult(10).and(x.ne(3)).sort(), Ok(Sort::Bool));
    assert_eq!(single("f").within(-1.1, 1.1).sort(), Ok(Sort::Bool));
}

#[test]
fn test_width_mismatch_is_rejected() {
    let x = byte("x");
    let y = Term::symbol("y", Sort::unsigned(16));
    assert_eq!(
        (&x + &y).sort(),
        Err(FormulaError::SortMismatch {
            op: "+",
            left: Sort::unsigned(8),
            right: Sort::unsigned(16),
        })
    );
}

#[test]
fn test_bitwise_on_float_is_rejected() {
    let f = single("f");
    let err = (&f & &f).sort().unwrap_err();
    assert_eq!(
        err,
        FormulaError::Unsupported {
            op: "&",
            sort: Sort::Float(FpFormat::SINGLE),
        }
    );
    assert!((!&f).sort().is_err());
    assert!((&f << 1).sort().is_err());
}

#[test]
fn test_boolean_connectives() {
    let a = Term::symbol("a", Sort::Bool);
    let b = Term::symbol("b", Sort::Bool);
    assert_eq!((&a & &b).sort(), Ok(Sort::Bool));
    assert_eq!(Term::any([a.clone(), !&b]).sort(), Ok(Sort::Bool));
    assert_eq!(a.implies(&b).sort(), Ok(Sort::Bool));
    assert!(Term::all([a, byte("x")]).sort().is_err());
}

#[test]
fn test_extract_bounds() {
    let x = byte("x");
    assert_eq!(x.extract(7, 4).sort(), Ok(Sort::unsigned(4)));
    assert_eq!(x.bit(0).sort(), Ok(Sort::unsigned(1)));
    assert!(matches!(
        x.extract(8, 0).sort(),
        Err(FormulaError::Extract { hi: 8, lo: 0, .. })
    ));
}

#[test]
fn test_bit_reinterpretation() {
    let raw = Term::symbol("raw", Sort::unsigned(32));
    let f = Term::from_bits(raw.clone(), FpFormat::SINGLE);
    assert_eq!(f.sort(), Ok(Sort::Float(FpFormat::SINGLE)));
    assert_eq!(f.to_bits().sort(), Ok(Sort::unsigned(32)));
    assert!(Term::from_bits(raw, FpFormat::HALF).sort().is_err());
}

#[test]
fn test_concat_and_extend() {
    let x = byte("x");
    assert_eq!(x.concat(&x).sort(), Ok(Sort::unsigned(16)));
    assert_eq!(x.sign_extend(8).sort(), Ok(Sort::signed(16)));
}

#[test]
fn test_ite_requires_boolean_condition() {
    let x = byte("x");
    assert_eq!(Term::ite(x.gt(3), x.clone(), 0).sort(), Ok(Sort::unsigned(8)));
    assert_eq!(
        Term::ite(x.clone(), x.clone(), 0).sort(),
        Err(FormulaError::NotBoolean(Sort::unsigned(8)))
    );
}

#[test]
fn test_collect_symbols() {
    let x = byte("x");
    let f = single("f");
    let formula = x.lt(3).and(f.is_nan());
    let mut symbols = BTreeMap::new();
    formula.collect_symbols(&mut symbols);
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols["x"], Sort::unsigned(8));
    assert_eq!(symbols["f"], Sort::Float(FpFormat::SINGLE));
}
