//! Aggregate behavior through the facade.

use randforge::prelude::*;
use randforge::{Constraint, RandomizeError, TableFormat, TableStyle};
use randforge_test::{Config, Packet, Pair};

// ============================================================================
// Randomization
// ============================================================================

#[test]
fn test_pair_respects_order_and_runs_hooks() {
    randforge::seed(42);
    let mut pair = Pair::new();
    for _ in 0..10 {
        pair.randomize().unwrap();
        assert!(pair.a.value() < pair.b.value());
    }
    assert_eq!(pair.hooks.len(), 20);
    assert_eq!(&pair.hooks[..2], &["pre", "post"]);
}

#[test]
fn test_ad_hoc_constraints_apply_once() {
    randforge::seed(3);
    let mut pair = Pair::new();
    let pinned = Constraint::new(Predicate::unary(|a| a.eq(7u8)), vec![pair.a.arg()]);
    pair.randomize_with(&[pinned], &[]).unwrap();
    assert_eq!(pair.a.value(), 7);
    assert!(pair.b.value() > 7);

    let impossible = Constraint::new(Predicate::unary(|b| b.eq(0u8)), vec![pair.b.arg()]);
    let err = pair.randomize_with(&[impossible], &[]).unwrap_err();
    assert!(matches!(err, RandomizeError::Unsatisfiable { .. }));
}

#[test]
fn test_excluded_variables_are_constants() {
    randforge::seed(4);
    let mut pair = Pair::new();
    pair.a.set(200);
    pair.a.set_auto_random(false);
    pair.randomize().unwrap();
    assert_eq!(pair.a.value(), 200);
    assert!(pair.b.value() > 200);
}

#[test]
fn test_packet_nests_struct_and_shared_config() {
    randforge::seed(11);
    let config = Shared::new(Config::new(16));
    let mut packet = Packet::new(config.clone(), 4);
    for _ in 0..10 {
        packet.randomize().unwrap();
        assert!((1..=16).contains(&packet.len.value()));
        assert!(packet.header.valid.value());
        assert!(packet.header.kind.label().is_some());
    }
    assert_eq!(config.borrow().max_len.value(), 16);
    assert!(packet.config.ptr_eq(&config));
    assert_eq!(packet.header.width(), 35);
}

#[derive(Debug, Fields)]
struct Link {
    #[randforge(object)]
    object: Object,
    near: Pair,
    far: Pair,
}

impl Aggregate for Link {}

#[test]
fn test_embedded_aggregates_keep_their_constraints() {
    randforge::seed(12);
    let mut link = Link {
        object: Object::new("link", None),
        near: Pair::new(),
        far: Pair::new(),
    };
    for _ in 0..10 {
        link.randomize().unwrap();
        assert!(link.near.a.value() < link.near.b.value());
        assert!(link.far.a.value() < link.far.b.value());
    }

    let mut copy = link.shallow_copy().unwrap();
    for _ in 0..10 {
        copy.randomize().unwrap();
        assert!(copy.near.a.value() < copy.near.b.value());
        assert!(copy.far.a.value() < copy.far.b.value());
    }
}

#[test]
fn test_shared_variables_are_read_as_constants() {
    randforge::seed(13);
    let config = Shared::new(Config::new(16));
    let mut packet = Packet::new(config.clone(), 0);
    config.borrow_mut().max_len.set(5);
    let capped = Constraint::new(
        Predicate::binary(|len, max| len.ule(max)),
        vec![packet.len.arg(), config.borrow().max_len.arg()],
    );
    for _ in 0..10 {
        packet.randomize_with(&[capped.clone()], &[]).unwrap();
        assert!((1..=5).contains(&packet.len.value()));
    }
    assert_eq!(config.borrow().max_len.value(), 5);
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_compare_and_table() {
    let mut pair = Pair::new();
    pair.a.set(10);
    pair.b.set(20);
    let mut copy = pair.deep_copy().unwrap();
    assert!(pair.compare(&copy, true));

    copy.b.set(21);
    assert!(!pair.compare(&copy, false));

    pair.object.set_table_format(TableFormat {
        style: TableStyle::Plain,
        transpose: true,
    });
    assert_eq!(pair.table(), "a    b   label\n0xa  20  pair");
}

#[test]
fn test_full_name_and_log_group() {
    let pair = Pair::new();
    assert_eq!(pair.full_name(), "env.pair");
    assert_eq!(Aggregate::name(&pair), "pair");
    pair.info("hello");
}
