//! Test helpers for engine tests
//!
//! Small builders for body nodes, so tests read close to the bodies they
//! describe.

use crate::config::EngineConfig;
use crate::engine::{BinaryOp, Computation, Engine, Expr, Handler, Stmt};

/* ===================== Expressions ===================== */

pub fn num(v: f64) -> Expr {
    Expr::LitNum { v }
}

pub fn s(v: &str) -> Expr {
    Expr::LitStr { v: v.to_string() }
}

pub fn lit_bool(v: bool) -> Expr {
    Expr::LitBool { v }
}

pub fn ident(name: &str) -> Expr {
    Expr::Ident {
        name: name.to_string(),
    }
}

pub fn list(elements: Vec<Expr>) -> Expr {
    Expr::List { elements }
}

pub fn member(object: Expr, property: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn error(kind: &str, payload: Option<Expr>) -> Expr {
    Expr::Error {
        kind: kind.to_string(),
        payload: payload.map(Box::new),
    }
}

pub fn spawn(computation: &str, args: Vec<Expr>) -> Expr {
    Expr::Spawn {
        computation: computation.to_string(),
        args,
    }
}

pub fn yield_(value: Expr) -> Expr {
    Expr::Yield {
        value: Some(Box::new(value)),
    }
}

pub fn yield_from(inner: Expr) -> Expr {
    Expr::YieldFrom {
        inner: Box::new(inner),
    }
}

/* ===================== Statements ===================== */

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block { body }
}

pub fn expr(e: Expr) -> Stmt {
    Stmt::Expr { expr: e }
}

pub fn let_(name: &str, init: Expr) -> Stmt {
    Stmt::Let {
        name: name.to_string(),
        init: Some(init),
    }
}

pub fn assign(name: &str, e: Expr) -> Stmt {
    Stmt::Assign {
        name: name.to_string(),
        expr: e,
    }
}

pub fn report(value: Expr) -> Stmt {
    Stmt::Report { value }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return { value: Some(value) }
}

pub fn raise(e: Expr) -> Stmt {
    Stmt::Raise { error: e }
}

pub fn if_(test: Expr, then_s: Stmt, else_s: Option<Stmt>) -> Stmt {
    Stmt::If {
        test,
        then_s: Box::new(then_s),
        else_s: else_s.map(Box::new),
    }
}

pub fn while_(test: Expr, body: Stmt) -> Stmt {
    Stmt::While {
        test,
        body: Box::new(body),
    }
}

pub fn try_(body: Stmt, handlers: Vec<Handler>, finally_s: Option<Stmt>) -> Stmt {
    Stmt::Try {
        body: Box::new(body),
        handlers,
        finally_s: finally_s.map(Box::new),
    }
}

pub fn handler(kinds: &[&str], bind: Option<&str>, body: Stmt) -> Handler {
    Handler {
        kinds: kinds.iter().map(|k| k.to_string()).collect(),
        bind: bind.map(|b| b.to_string()),
        body,
    }
}

/* ===================== Engines ===================== */

/// Build a computation and pass it through JSON, so every test body also
/// checks that the node format round-trips
pub fn computation(name: &str, body: Stmt) -> Computation {
    let c = Computation::new(name, body);
    let json = serde_json::to_string(&c).expect("Computation serialization failed");
    serde_json::from_str(&json).expect("Computation deserialization failed")
}

pub fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> Engine {
    Engine::new(config)
}

/// Engine with the given computations registered
pub fn engine_registered(computations: Vec<Computation>) -> Engine {
    let mut engine = engine();
    for c in computations {
        engine.register(c).expect("Registration failed");
    }
    engine
}

/// Values reported since the last drain
pub fn reported(engine: &mut Engine) -> Vec<crate::engine::Val> {
    engine
        .drain_reports()
        .into_iter()
        .map(|r| r.value)
        .collect()
}
