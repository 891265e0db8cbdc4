// ABOUTME: Abstract syntax tree produced by the parser and walked by the evaluator

use std::sync::Arc;

/// A brace-delimited statement sequence. The top level of a program is a
/// block too; the interpreter wraps source text in a synthetic function body.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `var name [T] [= expr]`; without an initializer the declared type's
    /// zero value is bound.
    Var {
        name: String,
        ty: Option<TypeExpr>,
        init: Option<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Expr,
        value: Expr,
    },
    IncDec {
        name: String,
        inc: bool,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        /// Either another `If` (else-if chain) or a `Block`.
        alt: Option<Box<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        /// `None` when the binding is `_` or omitted.
        key: Option<String>,
        value: Option<String>,
        subject: Expr,
        body: Block,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        cases: Vec<Case>,
        default: Option<Block>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub exprs: Vec<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `:=`
    Define,
    /// `=`
    Set,
    /// `+=`
    Add,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        subject: Box<Expr>,
        index: Box<Expr>,
    },
    Selector {
        subject: Box<Expr>,
        field: String,
    },
    /// Function literal. The body is shared so script-function values can
    /// reference it without cloning the tree.
    Func {
        params: Vec<String>,
        named_result: Option<(String, TypeExpr)>,
        body: Arc<Block>,
    },
    MapLit {
        entries: Vec<(Expr, Expr)>,
    },
    SliceLit {
        elems: Vec<Expr>,
    },
    /// A type in expression position; only meaningful as a `make` argument
    /// or a composite literal head.
    TypeLit(TypeExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    Slice(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
}
