use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function body shared between the syntax tree and every closure
/// created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    /// `None` for lambdas.
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
    /// Line of the `fun` keyword or the method name.
    pub line: usize,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref().map_or("lambda", |t| t.lexeme.as_str())
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A method inside a class body; getters are declared without a parameter
/// list and run on property access.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub function: Rc<FunctionDecl>,
    pub is_getter: bool,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Token,
    /// Always an `Expr::Variable`.
    pub superclass: Option<Expr>,
    /// `with A, B`, each an `Expr::Variable`.
    pub traits: Vec<Expr>,
    pub methods: Vec<MethodDecl>,
    pub static_methods: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: Token,
    /// Methods a class mixing this trait in must implement, with their arity.
    pub signatures: Vec<(Token, usize)>,
    pub defaults: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),

    Class(ClassDecl),

    Expression(Expr),

    /// `break;` or `continue;`; the token kind tags the signal.
    Flow(Token),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Trait(TraitDecl),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `for` loops desugar to a `While` whose increment runs after every
    /// iteration of the body.
    While {
        condition: Expr,
        body: Box<Stmt>,
        increment: Option<Box<Stmt>>,
    },
}
