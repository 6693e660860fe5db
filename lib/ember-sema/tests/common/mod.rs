#![allow(dead_code)]

use std::sync::Once;

use ember_sema::{Diagnostics, ErrorKind, NodeId, SemaError, Session, TreeBuilder, TypeExpr, Visibility};

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A session with one module `m` holding one package `p`.
pub struct Fixture {
    pub session: Session,
    pub module: NodeId,
    pub package: NodeId,
}

pub fn fixture() -> Fixture {
    init_tracing();
    let mut session = Session::new();
    let mut b = session.builder();
    let module = b.module("m").unwrap();
    let package = b.package(module, "p", Visibility::Public).unwrap();
    Fixture {
        session,
        module,
        package,
    }
}

pub fn int() -> TypeExpr {
    TypeExpr::named("int")
}

pub fn float() -> TypeExpr {
    TypeExpr::named("float")
}

/// `fn name(params...)` with an empty body; returns the function and its body.
pub fn function(b: &mut TreeBuilder<'_>, scope: NodeId, name: &str, params: &[(&str, TypeExpr)]) -> (NodeId, NodeId) {
    let function = b.function(scope, name, params, None, Visibility::Public).unwrap();
    let body = b.body(function).unwrap();
    (function, body)
}

/// The single error of a failed run.
pub fn single_error(result: Result<(), Diagnostics>) -> SemaError {
    let errors = result.expect_err("expected resolution to fail");
    assert_eq!(errors.len(), 1, "expected exactly one error, got {:?}", errors);
    errors.into_iter().next().unwrap()
}

pub fn assert_kind(result: Result<(), Diagnostics>, kind: ErrorKind) {
    let errors = result.expect_err("expected resolution to fail");
    assert!(
        errors.kinds().contains(&kind),
        "expected {:?}, got {:?}",
        kind,
        errors
    );
}
