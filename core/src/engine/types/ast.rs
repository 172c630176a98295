//! Computation body node types
//!
//! Bodies are supplied by the host as plain data. They are never parsed from
//! source text; a host builds them directly or deserializes them from JSON/TOML.

use serde::{Deserialize, Serialize};

/// A named computation a Frame can be created from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Computation {
    pub name: String,
    /// Parameter names, bound positionally when the computation is spawned
    #[serde(default)]
    pub params: Vec<String>,
    pub body: Stmt,
}

impl Computation {
    pub fn new(name: impl Into<String>, body: Stmt) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body,
        }
    }

    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Statement node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Block {
        body: Vec<Stmt>,
    },
    Let {
        name: String,
        #[serde(default)]
        init: Option<Expr>,
    },
    Assign {
        name: String,
        expr: Expr,
    },
    Expr {
        expr: Expr,
    },
    /// Hands a value to the driver through the engine outbox
    Report {
        value: Expr,
    },
    If {
        test: Expr,
        then_s: Box<Stmt>,
        #[serde(default)]
        else_s: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    /// Raise an envelope. The operand is an `Error` value or a bare kind string.
    Raise {
        error: Expr,
    },
    Try {
        body: Box<Stmt>,
        #[serde(default)]
        handlers: Vec<Handler>,
        #[serde(default)]
        finally_s: Option<Box<Stmt>>,
    },
}

/// One entry of a `Try` match table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handler {
    /// Envelope kinds this handler accepts. Empty accepts every kind.
    #[serde(default)]
    pub kinds: Vec<String>,
    /// Variable the caught envelope is bound to
    #[serde(default)]
    pub bind: Option<String>,
    pub body: Stmt,
}

impl Handler {
    pub fn matches(&self, kind: &str) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| k == kind)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    LitNull,
    LitBool {
        v: bool,
    },
    LitNum {
        v: f64,
    },
    LitStr {
        v: String,
    },
    List {
        elements: Vec<Expr>,
    },
    Ident {
        name: String,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        inner: Box<Expr>,
    },
    /// Build an envelope value without raising it
    Error {
        kind: String,
        #[serde(default)]
        payload: Option<Box<Expr>>,
    },
    /// Create a Frame from a registered computation
    Spawn {
        computation: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Suspension point; evaluates to the resumption value
    Yield {
        #[serde(default)]
        value: Option<Box<Expr>>,
    },
    /// Delegation point; evaluates to the inner Frame's completion value
    YieldFrom {
        inner: Box<Expr>,
    },
}
