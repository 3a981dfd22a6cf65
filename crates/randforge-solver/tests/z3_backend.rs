//! z3-backed tests.

use randforge_config::RandomizeConfig;
use randforge_core::{
    AnyVar, Backend, BackendError, FormulaError, FpFormat, Literal, RandomizeError, Session, Sort,
    Term, Var, Verdict, Weights,
};
use randforge_solver::{randomizer_from_config, Z3Backend};

fn session() -> Session {
    Session::new(Weights::default(), 11)
}

fn model_of(verdict: Verdict) -> randforge_core::Model {
    match verdict {
        Verdict::Sat(model) => model,
        other => panic!("expected sat, got {other:?}"),
    }
}

#[test]
fn test_hard_constraints_hold() {
    let x = Term::symbol("v1", Sort::unsigned(8));
    let mut session = session();
    session.add_hard(x.ugt(3)).unwrap();
    session.add_hard(x.ult(10)).unwrap();

    let model = model_of(Z3Backend::new().check(&session).unwrap());
    let Some(Literal::Bits { value, width: 8 }) = model.get("v1").copied() else {
        panic!("v1 missing from model");
    };
    assert!((4..10).contains(&value));
}

#[test]
fn test_contradiction_is_unsat() {
    let x = Term::symbol("v2", Sort::signed(16));
    let mut session = session();
    session.add_hard(x.eq(1)).unwrap();
    session.add_hard(x.eq(2)).unwrap();
    assert!(matches!(
        Z3Backend::new().check(&session).unwrap(),
        Verdict::Unsat
    ));
}

#[test]
fn test_declared_soft_constraint_wins_over_coins() {
    let mut var: Var<u8> = Var::new(0);
    let x = var.term();
    let mut session = session();
    session.add_hard(x.ult(100)).unwrap();
    session.add_declared(x.eq(42)).unwrap();
    session.bias_bits(&x, 8).unwrap();

    let model = model_of(Z3Backend::new().check(&session).unwrap());
    var.assign(model.get(&var.id().symbol()).unwrap());
    assert_eq!(var.value(), 42);
}

#[test]
fn test_float_intrinsics_exclude_nan_and_infinity() {
    let mut var: Var<f32> = Var::new(0.0);
    var.term();
    let mut session = session();
    var.apply_local_constraints(&mut session, &|_, _| unreachable!())
        .unwrap();

    let model = model_of(Z3Backend::new().check(&session).unwrap());
    let symbol = var.id().symbol();
    AnyVar::assign(&mut var, model.get(&symbol).unwrap());
    assert!(var.value().is_finite());
    let bits = model.get(&format!("{}_bits", var.id().symbol()));
    assert!(matches!(bits, Some(Literal::Bits { width: 32, .. })));
}

#[test]
fn test_float_literals_round_trip() {
    let f = Term::symbol("v3", Sort::Float(FpFormat::DOUBLE));
    let mut session = session();
    session.add_hard(f.same(Term::fp64(-2.5))).unwrap();
    let model = model_of(Z3Backend::new().check(&session).unwrap());
    match model.get("v3") {
        Some(Literal::Float { bits, format }) => {
            assert_eq!(*format, FpFormat::DOUBLE);
            assert_eq!(f64::from_bits(*bits), -2.5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_configured_randomizer() {
    let config = RandomizeConfig::new().with_random_seed(3).with_timeout_ms(10_000);
    let mut randomizer = randomizer_from_config(&config);

    let mut x: Var<f32> = Var::new(0.0);
    x.add_constraint("range", |x| x.within(-1.1f32, 1.1f32));
    for _ in 0..20 {
        randomizer.randomize_var(&mut x).unwrap();
        assert!((-1.1..=1.1).contains(&x.value()));
    }

    x.add_constraint("range", |x| x.eq(5.0f32));
    x.add_constraint("small", |x| x.lt(1.0f32));
    let err = randomizer.randomize_var(&mut x).unwrap_err();
    assert!(matches!(err, RandomizeError::Unsatisfiable { .. }));
}

#[test]
fn test_float_equality_ignores_sign_of_zero() {
    let f = Term::symbol("v4", Sort::Float(FpFormat::SINGLE));
    let mut session = session();
    session.add_hard(f.eq(Term::fp32(-0.0))).unwrap();
    session.add_hard(!f.is_negative()).unwrap();
    let model = model_of(Z3Backend::new().check(&session).unwrap());
    assert_eq!(
        model.get("v4"),
        Some(&Literal::Float {
            bits: 0,
            format: FpFormat::SINGLE
        })
    );
}

#[test]
fn test_float_ordering_excludes_nan() {
    let f = Term::symbol("v5", Sort::Float(FpFormat::HALF));
    let mut session = session();
    session.add_hard(f.is_nan()).unwrap();
    session.add_hard(Term::any([f.lt(0.0f32), f.ge(0.0f32)])).unwrap();
    assert!(matches!(
        Z3Backend::new().check(&session).unwrap(),
        Verdict::Unsat
    ));
}

#[test]
fn test_float_arithmetic_is_rejected() {
    let f = Term::symbol("v6", Sort::Float(FpFormat::DOUBLE));
    let mut session = session();
    session.add_hard((&f + 1.0f64).gt(2.0f64)).unwrap();
    assert!(matches!(
        Z3Backend::new().check(&session),
        Err(BackendError::Formula(FormulaError::Unsupported { op: "+", .. }))
    ));
}
