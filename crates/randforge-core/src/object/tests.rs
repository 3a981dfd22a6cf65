//! Tests for aggregates.

use super::*;
use crate::constraint::Strength;
use crate::fixtures::{Outer, Pair, Top};
use crate::var::Var;

fn lt() -> Predicate {
    Predicate::binary(|x, y| x.ult(y))
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_full_name_includes_parent() {
    let root = Object::new("env", Some(&Top));
    assert_eq!(root.full_name(), "top.env");
    let child = Object::new("agent", Some(&root));
    assert_eq!(child.full_name(), "top.env.agent");
    assert_eq!(child.parent_name(), Some("top.env"));

    let mut orphan = Object::new("solo", None);
    assert_eq!(orphan.full_name(), "solo");
    orphan.set_parent(Some(&root));
    orphan.set_name("renamed");
    assert_eq!(orphan.full_name(), "top.env.renamed");
}

// ============================================================================
// Constraints
// ============================================================================

#[test]
fn test_add_and_remove_constraints() {
    let mut pair = Pair::new(1, 2);
    let args = vec![pair.a.arg(), pair.b.arg()];
    pair.add_constraint("order", lt(), args.clone());
    pair.add_soft_constraint("prefer", lt(), args);

    let table = pair.object().constraints();
    assert!(table.get("order", Strength::Hard).is_some());
    assert!(table.get("prefer", Strength::Soft).is_some());

    assert!(pair.remove_constraint("order"));
    assert!(!pair.remove_constraint("order"));
    assert_eq!(pair.object().constraints().len(), 1);
}

// ============================================================================
// Copy
// ============================================================================

#[test]
fn test_copy_rewrites_constraint_arguments() {
    let mut pair = Pair::new(3, 4);
    let args = vec![pair.a.arg(), pair.b.arg()];
    pair.add_constraint("order", lt(), args);

    let copy = pair.shallow_copy().unwrap();
    assert_ne!(copy.a.id(), pair.a.id());
    assert_eq!(copy.a.value(), 3);
    assert_eq!(copy.full_name(), "top.pair");

    let ids: Vec<_> = copy.object().constraints().var_ids().collect();
    assert_eq!(ids, vec![copy.a.id(), copy.b.id()]);
    let original: Vec<_> = pair.object().constraints().var_ids().collect();
    assert_eq!(original, vec![pair.a.id(), pair.b.id()]);
}

#[test]
fn test_copy_rejects_outside_reference() {
    let outside: Var<u8> = Var::new(0);
    let mut pair = Pair::new(3, 4);
    pair.add_constraint("bad", lt(), vec![pair.a.arg(), outside.arg()]);
    let err = pair.deep_copy().unwrap_err();
    assert_eq!(
        err,
        CopyError::UnresolvedVariable {
            constraint: "bad".to_string(),
            id: outside.id(),
        }
    );
}

#[test]
fn test_copy_retargets_local_constraints() {
    let mut pair = Pair::new(3, 4);
    let a = pair.a.arg();
    pair.b
        .add_constraint_with("above_a", lt(), vec![a], Strength::Hard);
    let copy = pair.deep_copy().unwrap();
    let ids: Vec<_> = copy.b.constraints().var_ids().collect();
    assert_eq!(ids, vec![copy.a.id()]);
}

#[test]
fn test_copy_rewrites_embedded_constraints() {
    let mut outer = Outer::new(Shared::new(Pair::new(0, 0)));
    let args = vec![outer.inner.a.arg(), outer.inner.b.arg()];
    outer.inner.add_constraint("order", lt(), args);
    let args = vec![outer.x.arg(), outer.inner.a.arg()];
    outer.add_constraint("below", lt(), args);

    for copy in [outer.shallow_copy().unwrap(), outer.deep_copy().unwrap()] {
        let inner: Vec<_> = copy.inner.object().constraints().var_ids().collect();
        assert_eq!(inner, vec![copy.inner.a.id(), copy.inner.b.id()]);
        let own: Vec<_> = copy.object().constraints().var_ids().collect();
        assert_eq!(own, vec![copy.x.id(), copy.inner.a.id()]);
        assert!(copy.shared.ptr_eq(&outer.shared));
        assert_eq!(copy.inner.full_name(), "top.outer.pair");
    }
}

#[test]
fn test_copy_rejects_outside_reference_in_embedded_aggregate() {
    let outside: Var<u8> = Var::new(0);
    let mut outer = Outer::new(Shared::new(Pair::new(0, 0)));
    let args = vec![outer.inner.a.arg(), outside.arg()];
    outer.inner.add_constraint("bad", lt(), args);
    assert!(matches!(
        outer.shallow_copy(),
        Err(CopyError::UnresolvedVariable { ref constraint, id })
            if constraint == "bad" && id == outside.id()
    ));
}

// ============================================================================
// Compare and tables
// ============================================================================

#[test]
fn test_compare_reports_mismatches() {
    let pair = Pair::new(1, 2);
    let mut other = pair.shallow_copy().unwrap();
    assert!(pair.compare(&other, true));

    other.b.set(9);
    assert!(!pair.compare(&other, false));
}

#[test]
fn test_compare_skips_disabled_fields() {
    let mut pair = Pair::new(1, 2);
    let mut other = pair.shallow_copy().unwrap();
    other.tag = "q".to_string();
    assert!(!pair.compare(&other, false));

    pair.object_mut().set_field_attributes(
        "tag",
        FieldAttributes {
            format: None,
            compare: false,
        },
    );
    assert!(pair.compare(&other, false));
}

#[test]
fn test_table_honors_field_formats() {
    let mut pair = Pair::new(10, 20);
    let object = pair.object_mut();
    object.set_field_attributes(
        "a",
        FieldAttributes {
            format: Some(Format::Hex),
            compare: true,
        },
    );
    object.set_field_attributes(
        "tag",
        FieldAttributes {
            format: Some(Format::Hidden),
            compare: true,
        },
    );
    object.set_table_format(TableFormat {
        style: crate::table::TableStyle::Plain,
        transpose: true,
    });
    assert_eq!(pair.table(), "a    b\n0xa  20");

    assert!(pair.object_mut().remove_field_attributes("tag").is_some());
    assert!(pair.object().field_attributes("tag").is_none());
}

// ============================================================================
// Shared aggregates
// ============================================================================

#[test]
fn test_shared_is_not_cloned_by_copy() {
    let shared = Shared::new(Pair::new(5, 6));
    let mut cx = CopyContext::new(CopyDepth::Deep);
    let copy = shared.copy_field(&mut cx);
    assert!(copy.ptr_eq(&shared));
    assert!(cx.conversion().is_empty());
    assert_eq!(shared.render(None), "<top.pair>");

    let mut holder = (shared.clone(), Var::<u8>::new(1));
    assert_eq!(collect_vars(&mut holder).len(), 1);
}

#[test]
fn test_shared_same_value() {
    let a = Shared::new(Pair::new(5, 6));
    let b = Shared::new(Pair::new(5, 6));
    assert!(a.same_value(&b));
    b.borrow_mut().a.set(7);
    assert!(!a.same_value(&b));
}
