//! Tree‑walking evaluator.
//!
//! Statements run against the active scope (`None` at top level) and the
//! global namespace. Local variables are read and written through the
//! `(distance, index)` addresses recorded by the [`Resolver`]; anything the
//! resolver left unresolved is looked up by name in the globals.
//!
//! `return`, `break` and `continue` do not travel on the error path: every
//! statement produces a [`Completion`] that loops and call frames consume.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info, trace, warn};

use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, Method, Trait};
use crate::environment::{EnvRef, Environment};
use crate::error::{Diagnostic, LoxError, Result, RuntimeError};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::natives;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::{ClassDecl, Stmt, TraitDecl};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Result type of the evaluator proper.
pub type IResult<T> = std::result::Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    /// `return` unwinding to the nearest call boundary.
    Return(Value),
    /// `break` / `continue` unwinding to the nearest loop; the token kind
    /// tells the loop what to do.
    Flow(Token),
}

/// Where a declaration landed.
#[derive(Debug, Clone, Copy)]
enum Binding {
    Slot(usize),
    Global,
}

pub struct Interpreter {
    /// Innermost active scope; `None` while executing top‑level code.
    environment: Option<EnvRef>,
    globals: HashMap<String, Value>,
    locals: HashMap<ExprId, (usize, usize)>,
    /// Trait name → required `(method, arity)` pairs, shared by every
    /// resolver pass run through this interpreter.
    trait_signatures: HashMap<String, Vec<(String, usize)>>,
    loaded_files: Vec<PathBuf>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout and reporting to stderr, with the
    /// native functions installed.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Interpreter with explicit print and diagnostic sinks.
    pub fn with_output(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let mut interpreter = Interpreter {
            environment: None,
            globals: HashMap::new(),
            locals: HashMap::new(),
            trait_signatures: HashMap::new(),
            loaded_files: Vec::new(),
            out,
            err,
        };

        natives::install(&mut interpreter);

        interpreter
    }

    // ───────────────────────── host API ─────────────────────────

    /// Scan, parse, resolve and execute `source` at top level.
    ///
    /// Returns the resolver's warnings (also written to the diagnostic
    /// sink). Static errors stop before execution; a runtime error aborts
    /// the remaining statements.
    pub fn run(&mut self, source: &str) -> Result<Vec<Diagnostic>> {
        let tokens = Scanner::new(source).scan_all()?;
        let statements = Parser::new(tokens).parse()?;

        info!("Parsed {} statements", statements.len());

        let warnings = Resolver::new(self).resolve(&statements)?;
        self.report_warnings(&warnings);

        // Nested runs (loadFile from inside a function) still execute at
        // top level.
        let saved = self.environment.take();
        let result = self.interpret(&statements);
        self.environment = saved;

        result?;
        Ok(warnings)
    }

    /// Evaluate a single expression at top level and return its value.
    pub fn evaluate_source(&mut self, source: &str) -> Result<Value> {
        let tokens = Scanner::new(source).scan_all()?;
        let expr = Parser::new(tokens).parse_expression()?;

        let warnings = Resolver::new(self).resolve_expression(&expr)?;
        self.report_warnings(&warnings);

        let saved = self.environment.take();
        let result = self.evaluate(&expr);
        self.environment = saved;

        Ok(result?)
    }

    /// Run a script file and remember it for `reload()`.
    pub fn run_file(&mut self, path: &Path) -> Result<Vec<Diagnostic>> {
        info!("Running file: {:?}", path);

        let source = fs::read_to_string(path)?;

        if !self.loaded_files.iter().any(|p| p == path) {
            self.loaded_files.push(path.to_path_buf());
        }

        self.run(&source)
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// Executes a list of top‑level statements.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt)? {
                Completion::Flow(keyword) => return Err(RuntimeError::flow(keyword)),
                // The resolver rejects top‑level `return`.
                Completion::Return(_) | Completion::Normal => {}
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Write an error to the diagnostic sink.
    pub fn report(&mut self, error: &LoxError) {
        if let Err(e) = writeln!(self.err, "{}", error) {
            warn!("Failed to write diagnostic: {}", e);
        }
    }

    fn report_warnings(&mut self, warnings: &[Diagnostic]) {
        for warning in warnings {
            warn!("{}", warning);

            if let Err(e) = writeln!(self.err, "{}", warning) {
                warn!("Failed to write diagnostic: {}", e);
            }
        }
    }

    /// Raw text to the print sink, without a trailing newline.
    pub fn write_output(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        self.globals
            .insert(native.name.to_string(), Value::NativeFunction(Rc::new(native)));
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    // ───────────────────────── resolver hooks ─────────────────────────

    /// Record the resolved address of a local variable access.
    pub fn note_local(&mut self, id: ExprId, distance: usize, index: usize) {
        trace!("Resolved {:?} -> ({}, {})", id, distance, index);

        self.locals.insert(id, (distance, index));
    }

    /// Address recorded for `id`, or `None` for a global access.
    pub fn resolved(&self, id: ExprId) -> Option<(usize, usize)> {
        self.locals.get(&id).copied()
    }

    pub fn register_trait(&mut self, name: &str, signatures: Vec<(String, usize)>) {
        self.trait_signatures.insert(name.to_string(), signatures);
    }

    pub fn trait_signatures(&self, name: &str) -> Option<&[(String, usize)]> {
        self.trait_signatures.get(name).map(Vec::as_slice)
    }

    // ───────────────────────── statements ─────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Completion> {
        match stmt {
            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, environment.into_ref())
            }

            Stmt::Class(decl) => {
                self.execute_class(decl)?;
                Ok(Completion::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Completion::Normal)
            }

            Stmt::Flow(keyword) => {
                debug!("Raising flow signal '{}'", keyword.lexeme);
                Ok(Completion::Flow(keyword.clone()))
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name());

                let function = LoxFunction::new(Rc::clone(decl), self.environment.clone(), false);
                self.define(decl.name(), Value::Function(Rc::new(function)));
                Ok(Completion::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)
                    .map_err(|e| RuntimeError::new(expr.line(), format!("Output error: {e}")))?;
                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Completion::Return(value))
            }

            Stmt::Trait(decl) => {
                self.execute_trait(decl);
                Ok(Completion::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.define(&name.lexeme, value);
                Ok(Completion::Normal)
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => self.execute_while(condition, body, increment.as_deref()),
        }
    }

    /// Run `statements` with `environment` as the active scope, restoring
    /// the previous scope on every exit path.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> IResult<Completion> {
        trace!("Entering block with {} statements", statements.len());

        let previous = self.environment.replace(environment);
        let result = self.execute_all(statements);
        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Completion> {
        for stmt in statements {
            match self.execute(stmt)? {
                Completion::Normal => {}
                unwinding => return Ok(unwinding),
            }
        }

        Ok(Completion::Normal)
    }

    fn execute_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        increment: Option<&Stmt>,
    ) -> IResult<Completion> {
        while self.evaluate(condition)?.is_truthy() {
            // A flow signal raised inside a function called from the body
            // arrives as an error tagged with its keyword.
            let completion = match self.execute(body) {
                Err(RuntimeError {
                    flow: Some(keyword), ..
                }) => Completion::Flow(keyword),
                other => other?,
            };

            match completion {
                Completion::Normal => {}
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Flow(keyword) => {
                    if keyword.token_type == TokenType::BREAK {
                        debug!("Loop exited by break on line {}", keyword.line);
                        break;
                    }
                    // Any other flow tag ends this iteration only.
                }
            }

            if let Some(increment) = increment {
                self.execute(increment)?;
            }
        }

        Ok(Completion::Normal)
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> IResult<()> {
        debug!("Defining class '{}'", decl.name.lexeme);

        let superclass = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(expr.line(), "Superclass must be a class."));
                }
            },
            None => None,
        };

        let mut traits: Vec<Rc<Trait>> = Vec::with_capacity(decl.traits.len());
        for expr in &decl.traits {
            match self.evaluate(expr)? {
                Value::Trait(t) => traits.push(t),
                _ => return Err(RuntimeError::new(expr.line(), "Can only mix in traits.")),
            }
        }

        let binding = self.define(&decl.name.lexeme, Value::Nil);

        let enclosing = self.environment.clone();
        if let Some(superclass) = &superclass {
            let mut environment = Environment::with_enclosing(enclosing.clone());
            environment.define("super", Value::Class(Rc::clone(superclass)));
            self.environment = Some(environment.into_ref());
        }

        let methods: HashMap<String, Method> = decl
            .methods
            .iter()
            .map(|method| {
                let name = method.function.name().to_string();
                let function = LoxFunction::new(
                    Rc::clone(&method.function),
                    self.environment.clone(),
                    name == "init",
                );
                (name, Method::new(function, method.is_getter))
            })
            .collect();

        let static_methods: HashMap<String, Rc<LoxFunction>> = decl
            .static_methods
            .iter()
            .map(|decl| {
                // A static `init` hands back the class it was called on.
                let is_init = decl.name() == "init";
                let function =
                    LoxFunction::new(Rc::clone(decl), self.environment.clone(), is_init);
                (decl.name().to_string(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(
            &decl.name.lexeme,
            superclass,
            traits,
            methods,
            static_methods,
        );

        self.environment = enclosing;
        self.assign_binding(binding, &decl.name.lexeme, Value::Class(Rc::new(class)));

        info!("Class '{}' defined", decl.name.lexeme);
        Ok(())
    }

    fn execute_trait(&mut self, decl: &TraitDecl) {
        debug!("Defining trait '{}'", decl.name.lexeme);

        let defaults: HashMap<String, Rc<LoxFunction>> = decl
            .defaults
            .iter()
            .map(|f| {
                let function = LoxFunction::new(Rc::clone(f), self.environment.clone(), false);
                (f.name().to_string(), Rc::new(function))
            })
            .collect();

        let value = Value::Trait(Rc::new(Trait::new(&decl.name.lexeme, defaults)));
        self.define(&decl.name.lexeme, value);
    }

    /// Bind a declaration: a new slot in the active scope, or a global at
    /// top level.
    fn define(&mut self, name: &str, value: Value) -> Binding {
        match &self.environment {
            Some(environment) => Binding::Slot(environment.borrow_mut().define(name, value)),
            None => {
                self.globals.insert(name.to_string(), value);
                Binding::Global
            }
        }
    }

    fn assign_binding(&mut self, binding: Binding, name: &str, value: Value) {
        match binding {
            Binding::Slot(index) => {
                Environment::assign_at(self.active_scope(), value, 0, index);
            }
            Binding::Global => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    /// # Panics
    ///
    /// A resolved local access with no active scope means the resolver and
    /// interpreter disagree.
    fn active_scope(&self) -> &EnvRef {
        self.environment
            .as_ref()
            .expect("resolved local access outside of any scope")
    }

    // ───────────────────────── expressions ─────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, paren, values)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(&object, name)
            }

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Lambda(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), self.environment.clone(), false);
                Ok(Value::Function(Rc::new(function)))
            }

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::string(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                let Some(instance) = object.as_instance() else {
                    return Err(RuntimeError::new(name.line, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator.line, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(
                        operator.line,
                        format!("Invalid unary operator '{}'.", operator.lexeme),
                    )),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            // A resolved slot can still be empty when a closure runs inside
            // its own variable's initializer.
            Some(&(distance, index)) => Environment::get_at(self.active_scope(), distance, index)
                .ok_or_else(|| undefined_variable(name)),
            None => self
                .globals
                .get(&name.lexeme)
                .cloned()
                .ok_or_else(|| undefined_variable(name)),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> IResult<()> {
        match self.locals.get(&id) {
            Some(&(distance, index)) => {
                if Environment::assign_at(self.active_scope(), value, distance, index) {
                    Ok(())
                } else {
                    Err(undefined_variable(name))
                }
            }
            None => match self.globals.get_mut(&name.lexeme) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(undefined_variable(name)),
            },
        }
    }

    fn call_value(&mut self, callee: &Value, paren: &Token, arguments: Vec<Value>) -> IResult<Value> {
        let Some(function) = callee.as_callable() else {
            return Err(RuntimeError::new(
                paren.line,
                "Can only call functions and classes.",
            ));
        };

        if arguments.len() != function.arity() {
            return Err(RuntimeError::new(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    function.arity(),
                    arguments.len()
                ),
            ));
        }

        function.call(self, paren, arguments)
    }

    /// Fields shadow methods. Getters run immediately; other methods come
    /// back bound to `object`.
    fn get_property(&mut self, object: &Value, name: &Token) -> IResult<Value> {
        let Some(instance) = object.as_instance() else {
            return Err(RuntimeError::new(name.line, "Only instances have properties."));
        };

        if let Some(value) = instance.field(&name.lexeme) {
            return Ok(value);
        }

        match instance.find_method(&name.lexeme) {
            Some(method) => self.bind_method(method, object.clone(), name),
            None => Err(RuntimeError::new(
                name.line,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    fn bind_method(&mut self, method: Method, this: Value, name: &Token) -> IResult<Value> {
        let bound = method.function.bind(this);

        if method.is_getter {
            return bound.call(self, name, Vec::new());
        }

        Ok(Value::Function(Rc::new(bound)))
    }

    /// `super` lives one scope outside `this`; dispatch starts at the class
    /// captured there, not at the receiver's dynamic class.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let Some((distance, _)) = self.resolved(id) else {
            return Err(RuntimeError::new(keyword.line, "Can't use 'super' here."));
        };

        let scope = self.active_scope();
        let superclass = match Environment::get_at(scope, distance, 0).unwrap_or(Value::Nil) {
            Value::Class(class) => class,
            other => {
                return Err(RuntimeError::new(
                    keyword.line,
                    format!("'super' is bound to '{}', not a class.", other),
                ));
            }
        };
        let object = Environment::get_at(scope, distance - 1, 0).unwrap_or(Value::Nil);

        match superclass.find_method(&method.lexeme) {
            Some(found) => self.bind_method(found, object, method),
            None => Err(RuntimeError::new(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator.line, "Operands must be numbers.")),
    }
}

/// Evaluates a binary operator on two already‑evaluated operands.
fn binary(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    trace!("Binary '{}' on {} and {}", operator.lexeme, left, right);

    match operator.token_type {
        TokenType::PLUS => Ok(match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::string(format!("{a}{b}")),
            // One textual side, or neither numeric nor textual: concatenate
            // the printed forms.
            (a, b) => Value::string(format!("{a}{b}")),
        }),

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a - b))
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a * b))
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            // The dividend is checked as well as the divisor.
            if a == 0.0 || b == 0.0 {
                return Err(RuntimeError::new(operator.line, "Division by zero."));
            }
            Ok(Value::Number(a / b))
        }

        TokenType::PERCENT => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Number(a % b))
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a > b))
        }

        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a >= b))
        }

        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a < b))
        }

        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Ok(Value::Bool(a <= b))
        }

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(RuntimeError::new(
            operator.line,
            format!("Invalid binary operator '{}'.", operator.lexeme),
        )),
    }
}
