mod common;

use common::{assert_kind, fixture, float, function, int, single_error, Fixture};
use ember_sema::{ErrorKind, Expr, PrimKind, ResolveConfig, SemaError, Session, TypeExpr, Visibility};

fn lit(kind: PrimKind) -> Expr {
    Expr::lit(kind)
}

#[test]
fn two_exact_matches_beat_two_conversions() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (exact, _) = function(&mut b, package, "f", &[("a", int()), ("b", int())]);
    function(&mut b, package, "f", &[("a", float()), ("b", float())]);
    let (_, body) = function(&mut b, package, "main", &[]);
    let call = b
        .expr(body, &Expr::call("f", vec![lit(PrimKind::I32), lit(PrimKind::I32)]))
        .unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(call), Some(exact));
    // the callee now names exactly the selected overload
    let callee = session.tree().children(call)[0];
    assert_eq!(session.targets(callee), vec![exact]);
}

#[test]
fn crossed_conversions_are_ambiguous() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", int()), ("b", float())]);
    function(&mut b, package, "f", &[("a", float()), ("b", int())]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.expr(body, &Expr::call("f", vec![lit(PrimKind::I32), lit(PrimKind::I32)]))
        .unwrap();

    match single_error(session.resolve_all()) {
        SemaError::AmbiguousReference { name, candidates, .. } => {
            assert_eq!(name, "f");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected an ambiguous reference, got {other}"),
    }
}

#[test]
fn widening_to_either_overload_is_ambiguous() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", int())]);
    function(&mut b, package, "f", &[("a", float())]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.variable(body, "small", &TypeExpr::named("i16"), None).unwrap();
    b.expr(body, &Expr::call("f", vec![Expr::name("small")])).unwrap();

    assert_kind(session.resolve_all(), ErrorKind::AmbiguousReference);
}

#[test]
fn explicit_cast_disambiguates() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", int())]);
    let (wanted, _) = function(&mut b, package, "f", &[("a", float())]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.variable(body, "small", &TypeExpr::named("i16"), None).unwrap();
    let call = b
        .expr(
            body,
            &Expr::call("f", vec![Expr::cast(float(), Expr::name("small"))]),
        )
        .unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(call), Some(wanted));
}

#[test]
fn narrowing_is_never_implicit() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", TypeExpr::named("i8"))]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.expr(body, &Expr::call("f", vec![lit(PrimKind::I64)])).unwrap();

    match single_error(session.resolve_all()) {
        SemaError::UnresolvedReference { name, .. } => assert_eq!(name, "f(long)"),
        other => panic!("expected an unresolved reference, got {other}"),
    }
}

#[test]
fn wrong_arity_is_not_viable() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", int())]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.expr(body, &Expr::call("f", vec![])).unwrap();

    assert_kind(session.resolve_all(), ErrorKind::UnresolvedReference);
}

#[test]
fn values_are_not_callable() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, body) = function(&mut b, package, "main", &[]);
    b.variable(body, "f", &int(), None).unwrap();
    b.expr(body, &Expr::call("f", vec![lit(PrimKind::I32)])).unwrap();

    match single_error(session.resolve_all()) {
        SemaError::UnresolvedReference { name, .. } => assert_eq!(name, "f(int)"),
        other => panic!("expected an unresolved reference, got {other}"),
    }
}

#[test]
fn derived_struct_converts_to_its_base() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let shape = b.strukt(package, "Shape", Visibility::Public).unwrap();
    b.field(shape, "id", &int(), Visibility::Public).unwrap();
    let square = b.strukt(package, "Square", Visibility::Public).unwrap();
    b.base(square, "Shape").unwrap();
    let (by_base, _) = function(&mut b, package, "draw", &[("s", TypeExpr::named("Shape"))]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.variable(body, "sq", &TypeExpr::named("Square"), None).unwrap();
    let call = b.expr(body, &Expr::call("draw", vec![Expr::name("sq")])).unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(call), Some(by_base));
}

#[test]
fn exact_struct_beats_base() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    b.strukt(package, "Shape", Visibility::Public).unwrap();
    let square = b.strukt(package, "Square", Visibility::Public).unwrap();
    b.base(square, "Shape").unwrap();
    function(&mut b, package, "draw", &[("s", TypeExpr::named("Shape"))]);
    let (exact, _) = function(&mut b, package, "draw", &[("s", TypeExpr::named("Square"))]);
    let (_, body) = function(&mut b, package, "main", &[]);
    b.variable(body, "sq", &TypeExpr::named("Square"), None).unwrap();
    let call = b.expr(body, &Expr::call("draw", vec![Expr::name("sq")])).unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(call), Some(exact));
}

#[test]
fn nested_call_uses_the_inner_return_type() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    b.function(package, "make", &[], Some(&TypeExpr::named("double")), Visibility::Public)
        .unwrap();
    function(&mut b, package, "f", &[("a", int())]);
    let (wanted, _) = function(&mut b, package, "f", &[("a", TypeExpr::named("double"))]);
    let (_, body) = function(&mut b, package, "main", &[]);
    let call = b
        .expr(body, &Expr::call("f", vec![Expr::call("make", vec![])]))
        .unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(call), Some(wanted));
}

#[test]
fn imported_overloads_join_local_ones() {
    common::init_tracing();
    let mut session = Session::new();
    let mut b = session.builder();
    let module = b.module("m").unwrap();
    let q = b.package(module, "q", Visibility::Public).unwrap();
    let (imported, _) = function(&mut b, q, "f", &[("a", float())]);
    let p = b.package(module, "p", Visibility::Public).unwrap();
    b.import(p, "q", None).unwrap();
    let (local, _) = function(&mut b, p, "f", &[("a", int())]);
    let (_, body) = function(&mut b, p, "main", &[]);
    let by_float = b
        .expr(body, &Expr::call("f", vec![lit(PrimKind::F32)]))
        .unwrap();
    let by_int = b
        .expr(body, &Expr::call("f", vec![lit(PrimKind::I32)]))
        .unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.selected(by_float), Some(imported));
    assert_eq!(session.selected(by_int), Some(local));
}

/// Packages `one` and `two` both declare `helper(int)`; `p` imports both.
fn imported_twice(config: ResolveConfig) -> (Session, Result<(), ember_sema::Diagnostics>, Vec<ember_sema::NodeId>) {
    common::init_tracing();
    let mut session = Session::with_config(config);
    let mut b = session.builder();
    let module = b.module("m").unwrap();
    let mut helpers = Vec::new();
    for name in ["one", "two"] {
        let package = b.package(module, name, Visibility::Public).unwrap();
        helpers.push(function(&mut b, package, "helper", &[("a", int())]).0);
    }
    let package = b.package(module, "p", Visibility::Public).unwrap();
    b.import(package, "one", None).unwrap();
    b.import(package, "two", None).unwrap();
    let (_, body) = function(&mut b, package, "main", &[]);
    let call = b
        .expr(body, &Expr::call("helper", vec![lit(PrimKind::I32)]))
        .unwrap();
    helpers.push(call);

    let result = session.resolve_all();
    (session, result, helpers)
}

#[test]
fn first_import_wins_a_tie_between_packages() {
    let (session, result, ids) = imported_twice(ResolveConfig::default());
    result.unwrap();
    assert_eq!(session.selected(ids[2]), Some(ids[0]));
}

#[test]
fn tie_between_packages_is_ambiguous_when_configured() {
    let (_, result, _) = imported_twice(ResolveConfig::default().with_first_import_wins(false));
    assert_kind(result, ErrorKind::AmbiguousReference);
}
