use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::stmt::FunctionDecl;
use crate::token::Token;

/// Stable identity of an expression node that may refer to a variable.
///
/// The resolver keys its `(distance, index)` addresses by this id. Ids are
/// unique for the life of the process so trees parsed at different times
/// (REPL lines, `loadFile`) never collide in the interpreter's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// `name = value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix operator: `a + b`, `x <= y`, `n % 2`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    Grouping(Box<Expr>),

    /// Anonymous function: `fun (a, b) { ... }`.
    Lambda(Rc<FunctionDecl>),

    Literal(LiteralValue),

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    This { id: ExprId, keyword: Token },

    Unary { operator: Token, right: Box<Expr> },

    Variable { id: ExprId, name: Token },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    /// Best‑effort source line for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Assign { name, .. } => name.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Grouping(inner) => inner.line(),
            Expr::Lambda(decl) => decl.line,
            Expr::Literal(_) => 0,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Set { name, .. } => name.line,
            Expr::Super { keyword, .. } => keyword.line,
            Expr::Ternary { condition, .. } => condition.line(),
            Expr::This { keyword, .. } => keyword.line,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Variable { name, .. } => name.line,
        }
    }
}
