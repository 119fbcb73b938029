//! The callable capability and the two function kinds: user closures and
//! native bindings. Classes and metaclasses implement [`Callable`] in
//! [`crate::class`].

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Completion, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// Anything that can appear in callee position.
pub trait Callable {
    fn arity(&self) -> usize;

    /// Invoke with already‑evaluated arguments. `paren` is the call's
    /// closing parenthesis, used to locate errors raised by the callee.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

/// A user function, method or lambda together with the scope it closes
/// over. The scope is captured by reference, not copied.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Option<EnvRef>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Option<EnvRef>, is_initializer: bool) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.name()
    }

    /// Layer a fresh scope defining `this` over the closure. Each binding
    /// gets its own scope, so two bound copies never share `this`.
    pub fn bind(&self, this: Value) -> LoxFunction {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", this);

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Some(environment.into_ref()),
            is_initializer: self.is_initializer,
        }
    }

    /// `this` of a bound initializer: slot 0 of the binding scope.
    fn bound_this(&self) -> Value {
        self.closure
            .as_ref()
            .and_then(|closure| Environment::get_at(closure, 0, 0))
            .unwrap_or(Value::Nil)
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.arity()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling user-defined function '{}'", self.name());

        let mut environment = Environment::with_enclosing(self.closure.clone());
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let completion = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        match completion {
            Completion::Normal | Completion::Return(_) if self.is_initializer => Ok(self.bound_this()),
            Completion::Normal => Ok(Value::Nil),
            Completion::Return(value) => Ok(value),
            // Not caught here: the caller's loop, if any, consumes it.
            Completion::Flow(keyword) => Err(RuntimeError::flow(keyword)),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration.name {
            Some(name) => write!(f, "<fn {}>", name.lexeme),
            None => write!(f, "<fn lambda>"),
        }
    }
}

impl fmt::Debug for LoxFunction {
    // The closure may reach back to this function; print the name only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.declaration.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// Host function signature. Errors are plain messages; the call site adds
/// the line.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, String>;

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(interpreter, &arguments).map_err(|msg| RuntimeError::new(paren.line, msg))
    }
}
