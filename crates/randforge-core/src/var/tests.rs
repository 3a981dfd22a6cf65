//! Tests for variables.

use super::*;
use half::f16;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::session::Weights;

fn no_args(_: &str, arg: &Arg) -> Result<Term> {
    panic!("unexpected argument {arg:?}")
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_identities_are_unique() {
    let a: Uint8 = Var::new(0);
    let b: Uint8 = Var::new(0);
    assert_ne!(a.id(), b.id());
}

#[test]
fn test_value_wraps_to_width() {
    let mut v = Logic::logic(4, 0x1f);
    assert_eq!(v.value(), 0xf);
    v += 1;
    assert_eq!(v.value(), 0);
    v -= 1;
    assert_eq!(v.value(), 0xf);
}

#[test]
fn test_signed_narrow_width() {
    let mut v: Var<i8> = Var::with_width(0, 4);
    v.set(7);
    v += 1;
    assert_eq!(v.value(), -8);
    assert_eq!(v.range(), (-8, 7));
}

#[test]
#[should_panic(expected = "width of")]
fn test_float_width_is_fixed() {
    let _ = Var::<f32>::with_width(0.0, 16);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_zero_width_rejected() {
    let _ = Var::<u8>::with_width(0, 0);
}

#[test]
fn test_bitwise_assign_ops() {
    let mut v: Uint8 = Var::new(0b1100);
    v &= 0b0101;
    assert_eq!(v.value(), 0b0100);
    v |= 0b0001;
    assert_eq!(v.value(), 0b0101);
    v ^= 0b1111;
    assert_eq!(v.value(), 0b1010);
    v <<= 4;
    assert_eq!(v.value(), 0b1010_0000);
    v >>= 5;
    assert_eq!(v.value(), 0b101);
}

// ============================================================================
// Display
// ============================================================================

#[test]
fn test_render_formats() {
    let v = Logic::logic(6, 5).with_format(Format::Bin);
    assert_eq!(v.to_string(), "0b000101");
    assert_eq!(v.render(Some(Format::Hex)), "0x5");
    assert_eq!(v.render(Some(Format::Dec)), "5");
    assert_eq!(v.render(Some(Format::Hidden)), "");
}

// ============================================================================
// Enumerations
// ============================================================================

#[test]
fn test_enumeration_width_and_labels() {
    let mut state = Var::enumeration([("IDLE", 0), ("BUSY", 1), ("DONE", 2)], "IDLE");
    assert_eq!(state.width(), 2);
    assert_eq!(state.label(), Some("IDLE"));
    assert!(state.set_label("DONE"));
    assert_eq!(state.value(), 2);
    assert_eq!(state.to_string(), "DONE");
    assert!(!state.set_label("LOST"));
}

#[test]
fn test_enumeration_draws_from_domain() {
    let state = Var::enumeration([("A", 1), ("B", 5), ("C", 6)], "A");
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let v = state.random_value(&mut rng, None);
        assert!([1, 5, 6].contains(&v));
    }
}

#[test]
fn test_enumeration_membership_constraint() {
    let mut state = Var::enumeration([("A", 1), ("B", 5)], "A");
    state.term();
    let mut session = Session::new(Weights::default(), 1).with_integer_bias(false);
    state
        .apply_local_constraints(&mut session, &no_args)
        .unwrap();
    assert_eq!(session.hard().len(), 1);
}

// ============================================================================
// Floats
// ============================================================================

#[test]
fn test_float_nan_comparisons() {
    let nan: Var<f32> = Var::new(f32::NAN);
    let other_nan: Var<f32> = Var::new(f32::NAN);
    let one: Var<f32> = Var::new(1.0);
    assert!(nan != other_nan);
    assert!(nan != 1.0);
    assert!(!(nan == 1.0));
    assert!(!(nan < one) && !(nan > one) && !(nan <= one) && !(nan >= one));
    assert!(one > 0.5);
    let half_nan: Var<f16> = Var::new(f16::NAN);
    assert!(half_nan != f16::NAN);
}

#[test]
fn test_float_bits_round_trip() {
    let mut v: Var<f64> = Var::new(-2.5);
    let raw = v.to_bits();
    v.set(0.0);
    v.from_bits(raw);
    assert_eq!(v.value(), -2.5);

    let payload = 0x7fc0_1234u64;
    let mut f: Var<f32> = Var::new(0.0);
    f.from_bits(payload);
    assert!(f.value().is_nan());
    assert_eq!(f.to_bits(), payload);

    let mut h: Var<f16> = Var::new(f16::ZERO);
    h.from_bits(0x7e01);
    assert_eq!(h.to_bits(), 0x7e01);
}

#[test]
fn test_random_values_within_range() {
    let v: Var<f32> = Var::new(0.0);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..500 {
        let x = v.random_value(&mut rng, Some((-1.1, 1.1)));
        assert!((-1.1..=1.1).contains(&x));
        let y = v.random_value(&mut rng, None);
        assert!(y.is_finite());
    }
}

// ============================================================================
// Local constraints
// ============================================================================

#[test]
fn test_local_constraints_receive_own_term() {
    let mut v: Uint8 = Var::new(0);
    v.add_constraint("lt", |x| x.ult(10));
    v.add_soft_constraint("even", |x| x.bit(0).eq(0));
    v.term();

    let mut session = Session::new(Weights::default(), 1).with_integer_bias(false);
    v.apply_local_constraints(&mut session, &no_args).unwrap();
    assert_eq!(session.hard().len(), 1);
    assert_eq!(session.soft().len(), 1);
    assert_eq!(session.soft()[0].1, Weights::default().declared);
    assert!(session.symbols().contains_key(&v.id().symbol()));
}

#[test]
fn test_local_constraint_arguments_are_resolved() {
    let other: Uint8 = Var::new(42);
    let other_id = other.id();
    let mut v: Uint8 = Var::new(0);
    v.add_constraint_with(
        "above",
        Predicate::binary(|x, y| x.ugt(y)),
        vec![other.arg()],
        Strength::Hard,
    );
    v.term();

    let resolve = |_: &str, arg: &Arg| -> Result<Term> {
        assert_eq!(arg.var_id(), Some(other_id));
        Ok(other.current())
    };
    let mut session = Session::new(Weights::default(), 1).with_integer_bias(false);
    v.apply_local_constraints(&mut session, &resolve).unwrap();
    assert_eq!(session.hard().len(), 1);
}

#[test]
fn test_local_predicate_errors_name_the_constraint() {
    let mut v: Var<f32> = Var::new(0.0);
    v.add_constraint("masked", |x| (x & 1).eq(0));
    v.term();
    let mut session = Session::new(Weights::default(), 1);
    let err = v
        .apply_local_constraints(&mut session, &no_args)
        .unwrap_err();
    match err {
        RandomizeError::Formula { constraint, .. } => assert_eq!(constraint, "masked"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unconstrained_draw_and_assign() {
    let mut v: Uint16 = Var::new(0);
    v.assign(&Literal::Int(70_000));
    assert_eq!(v.value(), 70_000u32 as u16);
    let mut rng = StdRng::seed_from_u64(2);
    v.set_auto_random(false);
    AnyVar::randomize_unconstrained(&mut v, &mut rng);
    assert!(!v.is_auto_random());
}
