//! Static resolver pass.
//!
//! One walk over the tree does three things:
//! 1. Mirror the scopes the interpreter will build at runtime. Each scope
//!    is a map `name → Slot`, where a slot's index is the position the
//!    runtime `Environment` will give that name.
//! 2. Record, for every local access (`Variable`, `Assign`, `This`, `Super`),
//!    the `(distance, index)` address in the interpreter. Accesses that
//!    match no scope are left global.
//! 3. Collect static errors and unused‑variable warnings. Errors do not stop
//!    the walk; the pass fails at the end if any were found.
//!
//! Classes add the same synthetic layers the interpreter adds: a `super`
//! scope when there is a superclass, then a `this` scope around every
//! method body (static methods included, since they are bound to the class
//! when accessed).

use std::collections::HashMap;

use log::{debug, info, trace};

use crate::error::{Diagnostic, LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{ClassDecl, FunctionDecl, Stmt, TraitDecl};
use crate::token::Token;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
    Trait,
    StaticMethod,
}

/// What the resolver knows about one declared name.
#[derive(Debug, Clone)]
struct Slot {
    defined: bool,
    used: bool,
    line: usize,
    index: usize,
}

pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, Slot>>,
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: Vec<Diagnostic>,
}

impl<'interp> Resolver<'interp> {
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            diagnostics: Vec::new(),
        }
    }

    /// Resolve a whole program. On success returns the warnings; if any
    /// error was found returns `LoxError::Resolve` with every diagnostic.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Vec<Diagnostic>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);
        self.finish()
    }

    /// Resolve a single top‑level expression.
    pub fn resolve_expression(mut self, expr: &Expr) -> Result<Vec<Diagnostic>> {
        self.resolve_expr(expr);
        self.finish()
    }

    fn finish(self) -> Result<Vec<Diagnostic>> {
        if self.diagnostics.iter().any(Diagnostic::is_error) {
            info!("Resolve pass failed");
            return Err(LoxError::Resolve {
                diagnostics: self.diagnostics,
            });
        }

        info!("Resolve pass finished with {} warning(s)", self.diagnostics.len());
        Ok(self.diagnostics)
    }

    fn error(&mut self, token: &Token, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(token.line, token.location(), message);
        debug!("Resolve error: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    // ───────────────────────── statements ─────────────────────────

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Class(decl) => self.resolve_class(decl),

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Flow(_) => {}

            Stmt::Function(decl) => {
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }

            Stmt::Trait(decl) => self.resolve_trait(decl),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
                if let Some(increment) = increment {
                    self.resolve_stmt(increment);
                }
            }
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        debug!("Resolving class '{}'", decl.name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        // Superclass and trait references are evaluated in the enclosing
        // scope before the class's own name is bound.
        if let Some(superclass) = &decl.superclass {
            if let Expr::Variable { name, .. } = superclass {
                if name.lexeme == decl.name.lexeme {
                    self.error(name, "A class can't inherit from itself.");
                }
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);
        }

        // Required methods, merged from every mixed‑in trait.
        let mut required: HashMap<String, usize> = HashMap::new();
        for t in &decl.traits {
            self.resolve_expr(t);

            if let Expr::Variable { name, .. } = t {
                let signatures = self
                    .interpreter
                    .trait_signatures(&name.lexeme)
                    .map(<[_]>::to_vec);

                match signatures {
                    Some(signatures) => required.extend(signatures),
                    None => self.error(name, format!("Undefined trait '{}'.", name.lexeme)),
                }
            }
        }

        self.declare(&decl.name);
        self.define(&decl.name);

        if decl.superclass.is_some() {
            self.begin_scope();
            self.push_synthetic("super");
        }

        self.begin_scope();
        self.push_synthetic("this");

        for method in &decl.methods {
            let name = method.function.name();

            let kind = if name == "init" {
                FunctionType::Initializer
            } else {
                if let Some(expected) = required.remove(name) {
                    let actual = method.function.arity();
                    if expected != actual {
                        let token = method.function.name.as_ref().unwrap_or(&decl.name);
                        self.error(
                            token,
                            format!(
                                "Trait method '{}' isn't implemented with correct arity. (Expected: {}; Actual: {})",
                                name, expected, actual
                            ),
                        );
                    }
                }
                FunctionType::Method
            };

            self.resolve_function(&method.function, kind);
        }

        if !required.is_empty() {
            let mut missing: Vec<String> = required.into_keys().collect();
            missing.sort();

            let list = missing
                .iter()
                .map(|m| format!("'{}'", m))
                .collect::<Vec<_>>()
                .join(", ");

            self.error(
                &decl.name,
                format!("Trait methods {} not all properly implemented.", list),
            );
        }

        // Static methods sit under the same `this` layer (bound to the
        // class) but may not use `this` or `super`.
        self.current_class = ClassType::StaticMethod;
        for method in &decl.static_methods {
            self.resolve_function(method, FunctionType::Method);
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_trait(&mut self, decl: &TraitDecl) {
        debug!("Resolving trait '{}'", decl.name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Trait;

        self.declare(&decl.name);
        self.define(&decl.name);

        self.begin_scope();
        self.push_synthetic("this");
        for default in &decl.defaults {
            self.resolve_function(default, FunctionType::Method);
        }
        self.end_scope();

        let signatures = decl
            .signatures
            .iter()
            .map(|(name, arity)| (name.lexeme.clone(), *arity))
            .collect();
        self.interpreter.register_trait(&decl.name.lexeme, signatures);

        self.current_class = enclosing_class;
    }

    /// Parameters and body share one scope, matching the single
    /// environment a call creates.
    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&function.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ───────────────────────── expressions ─────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Lambda(decl) => self.resolve_function(decl, FunctionType::Function),

            Expr::Literal(_) => {}

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::StaticMethod => {
                    self.error(keyword, "Can't use 'super' within a static method.")
                }
                ClassType::Subclass => self.resolve_local(*id, keyword),
                ClassType::Class | ClassType::Trait => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
            },

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::This { id, keyword } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'this' outside of a class."),
                ClassType::StaticMethod => {
                    self.error(keyword, "Can't use 'this' within a static method.")
                }
                _ => self.resolve_local(*id, keyword),
            },

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Variable { id, name } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .is_some_and(|slot| !slot.defined);

                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }
        }
    }

    // ───────────────────────── scopes ─────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, warning about every slot never read or
    /// assigned, in declaration order.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        let mut unused: Vec<(&String, &Slot)> = scope.iter().filter(|(_, s)| !s.used).collect();
        unused.sort_by_key(|(_, slot)| slot.index);

        for (name, slot) in unused {
            let warning = Diagnostic::warning(slot.line, format!("Unused variable '{}'.", name));
            debug!("Resolve warning: {}", warning);
            self.diagnostics.push(warning);
        }
    }

    /// `this` / `super` layers: one pre‑used, pre‑defined slot at index 0.
    fn push_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            let index = scope.len();
            scope.insert(
                name.to_string(),
                Slot {
                    defined: true,
                    used: true,
                    line: 0,
                    index,
                },
            );
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        let index = scope.len();
        trace!("Declared '{}' at slot {}", name.lexeme, index);

        scope.insert(
            name.lexeme.clone(),
            Slot {
                defined: false,
                used: false,
                line: name.line,
                index,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(slot) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            slot.defined = true;
        }
    }

    /// Innermost‑out search; a hit records `(scopes crossed, slot index)`
    /// and marks the slot used. A miss leaves the access global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        let depth = self.scopes.len();

        for (distance, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(slot) = scope.get_mut(&name.lexeme) {
                slot.used = true;
                let index = slot.index;
                trace!(
                    "Resolved '{}' at ({}, {}) of {} scopes",
                    name.lexeme,
                    distance,
                    index,
                    depth
                );
                self.interpreter.note_local(id, distance, index);
                return;
            }
        }

        trace!("Resolved '{}' as global", name.lexeme);
    }
}
