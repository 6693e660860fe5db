mod common;

use common::{fixture, float, function, int, single_error, Fixture};
use ember_sema::{Expr, NodeId, NodeKind, SemaError, Session, TypeExpr, Visibility};

// -------------------------------------------------------------------
// Scoping
// -------------------------------------------------------------------

#[test]
fn local_declared_earlier_is_visible() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, body) = function(&mut b, package, "h", &[]);
    let early = b.variable(body, "early", &int(), None).unwrap();
    let user = b.variable(body, "user", &int(), Some(&Expr::name("early"))).unwrap();

    session.resolve_all().unwrap();
    let reference = session.tree().children(user)[1];
    assert_eq!(session.targets(reference), vec![early]);
}

#[test]
fn local_declared_later_is_unresolved() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "user", &int(), Some(&Expr::name("late"))).unwrap();
    b.variable(body, "late", &int(), None).unwrap();

    match single_error(session.resolve_all()) {
        SemaError::UnresolvedReference { name, .. } => assert_eq!(name, "late"),
        other => panic!("expected an unresolved reference, got {other}"),
    }
}

#[test]
fn parameters_are_visible_in_the_body() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (h, body) = function(&mut b, package, "h", &[("count", int())]);
    let user = b.variable(body, "copy", &int(), Some(&Expr::name("count"))).unwrap();

    session.resolve_all().unwrap();
    let param = ember_sema::passes::typing::params(session.tree(), h)[0];
    let reference = session.tree().children(user)[1];
    assert_eq!(session.targets(reference), vec![param]);
}

#[test]
fn inner_block_shadows_outer_local() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "x", &int(), None).unwrap();
    let inner = b.block(body).unwrap();
    let shadow = b.variable(inner, "x", &float(), None).unwrap();
    let user = b.variable(inner, "y", &float(), Some(&Expr::name("x"))).unwrap();

    session.resolve_all().unwrap();
    let reference = session.tree().children(user)[1];
    assert_eq!(session.targets(reference), vec![shadow]);
}

#[test]
fn locals_of_a_sibling_function_are_invisible() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, first) = function(&mut b, package, "first", &[]);
    b.variable(first, "secret", &int(), None).unwrap();
    let (_, second) = function(&mut b, package, "second", &[]);
    b.variable(second, "leak", &int(), Some(&Expr::name("secret"))).unwrap();

    assert!(matches!(
        single_error(session.resolve_all()),
        SemaError::UnresolvedReference { .. }
    ));
}

// -------------------------------------------------------------------
// Chains
// -------------------------------------------------------------------

#[test]
fn member_access_through_a_variable() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let point = b.strukt(package, "Point", Visibility::Public).unwrap();
    let x = b.field(point, "x", &int(), Visibility::Public).unwrap();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "pt", &TypeExpr::named("Point"), None).unwrap();
    let user = b.variable(body, "v", &int(), Some(&Expr::name("pt.x"))).unwrap();

    session.resolve_all().unwrap();
    let head = session.tree().children(user)[1];
    assert_eq!(session.targets(head), vec![x]);
}

#[test]
fn inherited_members_are_found_through_the_base() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    // the base is declared after the struct inheriting from it
    let derived = b.strukt(package, "Derived", Visibility::Public).unwrap();
    b.base(derived, "Shape").unwrap();
    let shape = b.strukt(package, "Shape", Visibility::Public).unwrap();
    let area = b.field(shape, "area", &int(), Visibility::Public).unwrap();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "d", &TypeExpr::pointer(TypeExpr::named("Derived")), None)
        .unwrap();
    let user = b.variable(body, "v", &int(), Some(&Expr::name("d.area"))).unwrap();

    session.resolve_all().unwrap();
    let head = session.tree().children(user)[1];
    assert_eq!(session.targets(head), vec![area]);
}

#[test]
fn unknown_member_names_the_failing_prefix() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let point = b.strukt(package, "Point", Visibility::Public).unwrap();
    b.field(point, "x", &int(), Visibility::Public).unwrap();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "pt", &TypeExpr::named("Point"), None).unwrap();
    b.variable(body, "v", &int(), Some(&Expr::name("pt.z"))).unwrap();

    match single_error(session.resolve_all()) {
        SemaError::UnresolvedReference { name, .. } => assert_eq!(name, "pt.z"),
        other => panic!("expected an unresolved reference, got {other}"),
    }
}

#[test]
fn qualified_type_names_resolve_across_packages() {
    let Fixture {
        mut session,
        module,
        package,
    } = fixture();
    let mut b = session.builder();
    b.import(package, "shapes", None).unwrap();
    let shapes = b.package(module, "shapes", Visibility::Public).unwrap();
    let circle = b.strukt(shapes, "Circle", Visibility::Public).unwrap();
    b.field(circle, "radius", &TypeExpr::named("double"), Visibility::Public)
        .unwrap();
    let holder = b.strukt(package, "Holder", Visibility::Public).unwrap();
    let field = b
        .field(holder, "c", &TypeExpr::named("m.shapes.Circle"), Visibility::Public)
        .unwrap();

    session.resolve_all().unwrap();
    let head = session.tree().children(field)[0];
    assert_eq!(session.targets(head), vec![circle]);
    assert_eq!(session.size_of(holder).unwrap(), 8);
}

// -------------------------------------------------------------------
// Recursion
// -------------------------------------------------------------------

#[test]
fn mutual_containment_reports_the_exact_cycle() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let a = b.strukt(package, "A", Visibility::Public).unwrap();
    b.field(a, "b", &TypeExpr::named("B"), Visibility::Public).unwrap();
    let bb = b.strukt(package, "B", Visibility::Public).unwrap();
    b.field(bb, "a", &TypeExpr::named("A"), Visibility::Public).unwrap();

    let err = single_error(session.resolve_all());
    match &err {
        SemaError::Recursion { path, .. } => assert_eq!(path, &["A", "B", "A"]),
        other => panic!("expected a recursion error, got {other}"),
    }
    assert_eq!(err.to_string(), "circular definition: A -> B -> A");
}

#[test]
fn self_containment_is_a_cycle_of_one() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let node = b.strukt(package, "Node", Visibility::Public).unwrap();
    b.field(node, "next", &TypeExpr::named("Node"), Visibility::Public)
        .unwrap();

    match single_error(session.resolve_all()) {
        SemaError::Recursion { path, .. } => assert_eq!(path, &["Node", "Node"]),
        other => panic!("expected a recursion error, got {other}"),
    }
}

#[test]
fn pointers_break_containment_cycles() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let a = b.strukt(package, "A", Visibility::Public).unwrap();
    b.field(a, "b", &TypeExpr::named("B"), Visibility::Public).unwrap();
    let bb = b.strukt(package, "B", Visibility::Public).unwrap();
    b.field(bb, "a", &TypeExpr::pointer(TypeExpr::named("A")), Visibility::Public)
        .unwrap();

    session.resolve_all().unwrap();
    assert_eq!(session.size_of(a).unwrap(), 8);
    assert_eq!(session.size_of(bb).unwrap(), 8);
}

// -------------------------------------------------------------------
// Collisions
// -------------------------------------------------------------------

#[test]
fn identical_signatures_collide() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (first, _) = function(&mut b, package, "f", &[]);
    let (second, _) = function(&mut b, package, "f", &[]);

    match single_error(session.resolve_all()) {
        SemaError::DuplicateSymbol { name, loc, previous } => {
            assert_eq!(name, "f");
            assert_eq!(loc, session.tree().loc(second));
            assert_eq!(previous, session.tree().loc(first));
        }
        other => panic!("expected a duplicate symbol, got {other}"),
    }
}

#[test]
fn overloads_with_distinct_parameters_coexist() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    function(&mut b, package, "f", &[("a", int())]);
    function(&mut b, package, "f", &[("a", float())]);

    session.resolve_all().unwrap();
    assert_eq!(session.stats().deep_tests, 1);
}

#[test]
fn duplicate_locals_collide() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    let (_, body) = function(&mut b, package, "h", &[]);
    b.variable(body, "x", &int(), None).unwrap();
    b.variable(body, "x", &float(), None).unwrap();

    assert!(matches!(
        single_error(session.resolve_all()),
        SemaError::DuplicateSymbol { name, .. } if name == "x"
    ));
}

#[test]
fn different_kinds_do_not_collide() {
    let Fixture {
        mut session, package, ..
    } = fixture();
    let mut b = session.builder();
    b.strukt(package, "thing", Visibility::Public).unwrap();
    function(&mut b, package, "thing", &[]);

    session.resolve_all().unwrap();
    assert_eq!(session.stats().deep_tests, 0);
}

// -------------------------------------------------------------------
// Identifiers and idempotence
// -------------------------------------------------------------------

struct Program {
    point: NodeId,
    x: NodeId,
    function: NodeId,
    local: NodeId,
    call: NodeId,
}

fn build(session: &mut Session) -> (NodeId, Program) {
    let mut b = session.builder();
    let module = b.module("m").unwrap();
    let package = b.package(module, "p", Visibility::Public).unwrap();
    let point = b.strukt(package, "Point", Visibility::Public).unwrap();
    let x = b.field(point, "x", &int(), Visibility::Public).unwrap();
    let (f, body) = function(&mut b, package, "f", &[("a", int()), ("b", float())]);
    function(&mut b, package, "g", &[("l", int()), ("r", int())]);
    function(&mut b, package, "g", &[("l", float()), ("r", float())]);
    let local = b.variable(body, "v", &TypeExpr::named("Point"), None).unwrap();
    let call = b
        .expr(
            body,
            &Expr::call("g", vec![Expr::name("a"), Expr::name("a")]),
        )
        .unwrap();
    (
        package,
        Program {
            point,
            x,
            function: f,
            local,
            call,
        },
    )
}

fn identifiers(session: &Session, package: NodeId) -> Vec<String> {
    session
        .tree()
        .descendants(package)
        .into_iter()
        .filter(|&id| session.tree().kind(id).is_some_and(NodeKind::is_symbol))
        .map(|id| session.identifier(id))
        .collect()
}

#[test]
fn identifiers_follow_nesting() {
    let mut session = Session::new();
    let (_, program) = build(&mut session);
    session.resolve_all().unwrap();

    assert_eq!(session.identifier(program.point), "/m/p/Point");
    assert_eq!(session.identifier(program.x), "/m/p/Point.x");
    assert_eq!(session.identifier(program.function), "/m/p/f(int,float)");
    assert_eq!(session.identifier(program.local), "/m/p/f(int,float){0}/v");
    assert_eq!(session.identifier(session.tree().root()), "/");
}

#[test]
fn resolving_twice_is_idempotent() {
    let mut session = Session::new();
    let (package, program) = build(&mut session);
    session.resolve_all().unwrap();
    let ids = identifiers(&session, package);
    let selected = session.selected(program.call);
    assert!(selected.is_some());

    session.begin_resolve(package).unwrap();
    assert_eq!(identifiers(&session, package), ids);
    assert_eq!(session.selected(program.call), selected);

    // an identical tree built elsewhere agrees
    let mut other = Session::new();
    let (other_package, other_program) = build(&mut other);
    other.resolve_all().unwrap();
    assert_eq!(identifiers(&other, other_package), ids);
    let chosen = |s: &Session, call| s.selected(call).map(|f| s.identifier(f));
    assert_eq!(chosen(&other, other_program.call), chosen(&session, program.call));
    assert_eq!(chosen(&session, program.call).as_deref(), Some("/m/p/g(int,int)"));
}

#[test]
fn every_symbol_identifier_is_unique() {
    let mut session = Session::new();
    let (package, _) = build(&mut session);
    session.resolve_all().unwrap();

    let ids = identifiers(&session, package);
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "{ids:?}");
}
