//! Delegation chains

use super::helpers::*;
use crate::config::EngineConfig;
use crate::engine::{BinaryOp, Computation, Engine, Envelope, FrameStatus, Outcome, Val};

/// level(n): delegates to level(n - 1) and returns its result; level(0)
/// yields "bottom" and returns whatever it is resumed with
fn level() -> Computation {
    computation(
        "level",
        if_(
            bin(BinaryOp::Gt, ident("n"), num(0.0)),
            ret(yield_from(spawn(
                "level",
                vec![bin(BinaryOp::Sub, ident("n"), num(1.0))],
            ))),
            Some(block(vec![let_("x", yield_(s("bottom"))), ret(ident("x"))])),
        ),
    )
    .with_params(&["n"])
}

/// yields 1, 2, 3 and returns "inner done"
fn counter() -> Computation {
    computation(
        "counter",
        block(vec![
            expr(yield_(num(1.0))),
            expr(yield_(num(2.0))),
            expr(yield_(num(3.0))),
            ret(s("inner done")),
        ]),
    )
}

#[test]
fn test_inner_suspensions_are_re_reported() {
    let outer = computation(
        "outer",
        block(vec![
            let_("r", yield_from(spawn("counter", vec![]))),
            ret(ident("r")),
        ]),
    );
    let mut engine = engine_registered(vec![counter(), outer]);
    let id = engine.spawn("outer", vec![]).unwrap();

    assert_eq!(engine.start(id).unwrap(), Outcome::Suspended(Val::Num(1.0)));
    assert_eq!(engine.resume(id, Val::Null).unwrap(), Outcome::Suspended(Val::Num(2.0)));
    assert_eq!(engine.resume(id, Val::Null).unwrap(), Outcome::Suspended(Val::Num(3.0)));
    assert_eq!(engine.delegation_chain(id).unwrap().len(), 2);
    assert_eq!(
        engine.resume(id, Val::Null).unwrap(),
        Outcome::Completed(Val::Str("inner done".into()))
    );
    assert_eq!(engine.delegation_chain(id).unwrap(), vec![id]);
}

#[test]
fn test_resume_values_reach_the_inner_frame() {
    let mut engine = engine_registered(vec![level()]);
    let id = engine.spawn("level", vec![Val::Num(1.0)]).unwrap();

    assert_eq!(
        engine.start(id).unwrap(),
        Outcome::Suspended(Val::Str("bottom".into()))
    );
    assert_eq!(
        engine.resume(id, Val::Str("sent".into())).unwrap(),
        Outcome::Completed(Val::Str("sent".into()))
    );
}

#[test]
fn test_inner_failure_is_offered_to_outer_handlers() {
    let failing = computation(
        "failing",
        block(vec![expr(yield_(num(1.0))), raise(error("InnerBroke", Some(num(5.0))))]),
    );
    let outer = computation(
        "outer",
        try_(
            expr(yield_from(spawn("failing", vec![]))),
            vec![handler(&["InnerBroke"], Some("e"), ret(member(ident("e"), "payload")))],
            None,
        ),
    );
    let mut engine = engine_registered(vec![failing, outer]);
    let id = engine.spawn("outer", vec![]).unwrap();
    engine.start(id).unwrap();

    assert_eq!(engine.resume(id, Val::Null).unwrap(), Outcome::Completed(Val::Num(5.0)));
}

#[test]
fn test_injection_goes_to_inner_first() {
    // Both catch "Ping"; only the inner handler may see it
    let inner = computation(
        "inner",
        try_(
            expr(yield_(num(1.0))),
            vec![handler(&["Ping"], None, ret(s("inner caught")))],
            None,
        ),
    );
    let outer = computation(
        "outer",
        try_(
            ret(yield_from(spawn("inner", vec![]))),
            vec![handler(&["Ping"], None, ret(s("outer caught")))],
            None,
        ),
    );
    let mut engine = engine_registered(vec![inner, outer]);
    let id = engine.spawn("outer", vec![]).unwrap();
    engine.start(id).unwrap();

    assert_eq!(
        engine.inject(id, "Ping").unwrap(),
        Outcome::Completed(Val::Str("inner caught".into()))
    );
}

#[test]
fn test_each_link_resumes_its_outer_once() {
    // relay(n) reports what its inner Frame returned, then returns it + 1
    let relay = computation(
        "relay",
        if_(
            bin(BinaryOp::Gt, ident("n"), num(0.0)),
            block(vec![
                let_(
                    "r",
                    yield_from(spawn(
                        "relay",
                        vec![bin(BinaryOp::Sub, ident("n"), num(1.0))],
                    )),
                ),
                report(ident("r")),
                ret(bin(BinaryOp::Add, ident("r"), num(1.0))),
            ]),
            Some(ret(yield_(s("bottom")))),
        ),
    )
    .with_params(&["n"]);
    let mut engine = engine_registered(vec![relay]);
    let id = engine.spawn("relay", vec![Val::Num(3.0)]).unwrap();
    engine.start(id).unwrap();

    assert_eq!(engine.resume(id, Val::Num(10.0)).unwrap(), Outcome::Completed(Val::Num(13.0)));
    assert_eq!(
        reported(&mut engine),
        vec![Val::Num(10.0), Val::Num(11.0), Val::Num(12.0)]
    );
}

#[test]
fn test_deep_chain() {
    let mut engine = engine_registered(vec![level()]);
    let id = engine.spawn("level", vec![Val::Num(1000.0)]).unwrap();

    assert_eq!(
        engine.start(id).unwrap(),
        Outcome::Suspended(Val::Str("bottom".into()))
    );
    let chain = engine.delegation_chain(id).unwrap();
    assert_eq!(chain.len(), 1001);
    assert!(chain
        .iter()
        .all(|f| engine.status(*f).unwrap() == FrameStatus::Suspended));

    assert_eq!(engine.resume(id, Val::Num(42.0)).unwrap(), Outcome::Completed(Val::Num(42.0)));
    assert!(chain
        .iter()
        .all(|f| engine.status(*f).unwrap() == FrameStatus::Completed));
}

#[test]
fn test_deep_chain_failure_unwinds_every_link() {
    let mut engine = engine_registered(vec![level()]);
    let id = engine.spawn("level", vec![Val::Num(1000.0)]).unwrap();
    engine.start(id).unwrap();

    assert_eq!(
        engine.inject(id, "Abort").unwrap(),
        Outcome::Failed(Envelope::of_kind("Abort"))
    );
    assert_eq!(engine.delegation_chain(id).unwrap(), vec![id]);
}

#[test]
fn test_delegation_depth_limit() {
    let mut engine = engine_with(EngineConfig {
        max_delegation_depth: 3,
        ..Default::default()
    });
    engine.register(level()).unwrap();
    let id = engine.spawn("level", vec![Val::Num(5.0)]).unwrap();

    let outcome = engine.start(id).unwrap();
    assert!(matches!(&outcome, Outcome::Failed(e) if e.kind == "DelegationDepthExceeded"));

    let id = engine.spawn("level", vec![Val::Num(3.0)]).unwrap();
    assert_eq!(
        engine.start(id).unwrap(),
        Outcome::Suspended(Val::Str("bottom".into()))
    );
}

#[test]
fn test_self_delegation_is_already_running() {
    let mut engine = engine();
    let c = computation(
        "selfish",
        try_(
            expr(yield_from(ident("me"))),
            vec![handler(&["AlreadyRunning"], Some("e"), ret(member(ident("e"), "kind")))],
            None,
        ),
    );
    let id = engine.create(&c).unwrap();
    engine.bind(id, "me", Val::Frame(id)).unwrap();

    assert_eq!(
        engine.start(id).unwrap(),
        Outcome::Completed(Val::Str("AlreadyRunning".into()))
    );
}

#[test]
fn test_delegating_to_an_ancestor_is_already_running() {
    // outer -> middle, and middle tries to delegate back to outer
    let mut engine = engine();
    let middle = engine
        .create(&computation("middle", expr(yield_from(ident("back")))))
        .unwrap();
    let outer = engine
        .create(&computation("outer", ret(yield_from(ident("middle")))))
        .unwrap();
    engine.bind(middle, "back", Val::Frame(outer)).unwrap();
    engine.bind(outer, "middle", Val::Frame(middle)).unwrap();

    let outcome = engine.start(outer).unwrap();
    assert!(matches!(&outcome, Outcome::Failed(e) if e.kind == "AlreadyRunning"));
}

#[test]
fn test_frame_with_a_delegator_cannot_be_shared() {
    let mut engine = engine();
    let shared = engine.create(&counter()).unwrap();
    let first = engine
        .create(&computation("first", expr(yield_from(ident("t")))))
        .unwrap();
    let second = engine
        .create(&computation("second", ret(yield_from(ident("t")))))
        .unwrap();
    engine.bind(first, "t", Val::Frame(shared)).unwrap();
    engine.bind(second, "t", Val::Frame(shared)).unwrap();

    assert_eq!(engine.start(first).unwrap(), Outcome::Suspended(Val::Num(1.0)));
    let outcome = engine.start(second).unwrap();
    assert!(matches!(&outcome, Outcome::Failed(e) if e.kind == "AlreadyRunning"));
    // The first chain is untouched
    assert_eq!(engine.resume(first, Val::Null).unwrap(), Outcome::Suspended(Val::Num(2.0)));
}

#[test]
fn test_delegating_to_suspended_frame_pulls_next_value() {
    let mut engine = engine();
    let inner = engine.create(&counter()).unwrap();
    assert_eq!(engine.start(inner).unwrap(), Outcome::Suspended(Val::Num(1.0)));

    let outer = engine
        .create(&computation("outer", ret(yield_from(ident("t")))))
        .unwrap();
    engine.bind(outer, "t", Val::Frame(inner)).unwrap();

    assert_eq!(engine.start(outer).unwrap(), Outcome::Suspended(Val::Num(2.0)));
}

#[test]
fn test_inner_finished_directly_raises_exhausted_in_outer() {
    let mut engine = engine();
    let inner = engine.create(&counter()).unwrap();
    let outer = engine
        .create(&computation("outer", ret(yield_from(ident("t")))))
        .unwrap();
    engine.bind(outer, "t", Val::Frame(inner)).unwrap();

    assert_eq!(engine.start(outer).unwrap(), Outcome::Suspended(Val::Num(1.0)));

    // Drive the inner Frame behind the outer's back until it finishes
    assert_eq!(engine.resume(inner, Val::Null).unwrap(), Outcome::Suspended(Val::Num(2.0)));
    assert_eq!(engine.resume(inner, Val::Null).unwrap(), Outcome::Suspended(Val::Num(3.0)));
    assert_eq!(
        engine.resume(inner, Val::Null).unwrap(),
        Outcome::Completed(Val::Str("inner done".into()))
    );

    let outcome = engine.resume(outer, Val::Null).unwrap();
    assert!(matches!(&outcome, Outcome::Failed(e) if e.kind == "Exhausted"));
}

#[test]
fn test_list_delegation() {
    let outer = computation(
        "outer",
        block(vec![
            let_("r", yield_from(list(vec![s("a"), s("b")]))),
            ret(list(vec![ident("r"), s("end")])),
        ]),
    );
    let mut engine = engine_registered(vec![outer]);
    let id = engine.spawn("outer", vec![]).unwrap();

    assert_eq!(engine.start(id).unwrap(), Outcome::Suspended(Val::Str("a".into())));
    assert_eq!(engine.resume(id, Val::Null).unwrap(), Outcome::Suspended(Val::Str("b".into())));
    assert_eq!(
        engine.resume(id, Val::Null).unwrap(),
        Outcome::Completed(Val::List(vec![Val::Null, Val::Str("end".into())]))
    );
}

#[test]
fn test_empty_list_delegation_completes_immediately() {
    let mut engine = engine();
    let id = engine
        .create(&computation("outer", ret(yield_from(list(vec![])))))
        .unwrap();

    assert_eq!(engine.start(id).unwrap(), Outcome::Completed(Val::Null));
}

#[test]
fn test_non_delegable_target_is_type_error() {
    let mut engine = engine();
    let id = engine
        .create(&computation("outer", expr(yield_from(num(5.0)))))
        .unwrap();

    let outcome = engine.start(id).unwrap();
    assert!(matches!(&outcome, Outcome::Failed(e) if e.kind == "TypeError"));
}

#[test]
fn test_delegation_state_is_queryable() {
    let mut engine: Engine = engine_registered(vec![level()]);
    let id = engine.spawn("level", vec![Val::Num(2.0)]).unwrap();
    engine.start(id).unwrap();

    let chain = engine.delegation_chain(id).unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(engine.delegate_of(chain[0]).unwrap(), Some(chain[1]));
    assert_eq!(engine.delegate_of(chain[1]).unwrap(), Some(chain[2]));
    assert_eq!(engine.delegate_of(chain[2]).unwrap(), None);
    // Asking from the middle of the chain gives the tail
    assert_eq!(engine.delegation_chain(chain[1]).unwrap(), chain[1..].to_vec());
}
