//! Object model: classes, metaclasses, instances and traits.
//!
//! Class and Metaclass both implement [`ClassDescriptor`], the only thing a
//! [`LoxInstance`] knows about its class. A class is itself an instance of
//! its metaclass: it embeds a `LoxInstance` whose descriptor is the
//! metaclass, so static methods and class‑level fields go through the same
//! get/set path as ordinary instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, LoxFunction};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// A method table entry.
#[derive(Clone)]
pub struct Method {
    pub function: Rc<LoxFunction>,
    pub is_getter: bool,
}

impl Method {
    pub fn new(function: LoxFunction, is_getter: bool) -> Self {
        Method {
            function: Rc::new(function),
            is_getter,
        }
    }
}

/// Name plus method lookup: what an instance needs from its class.
pub trait ClassDescriptor {
    fn name(&self) -> &str;

    fn find_method(&self, name: &str) -> Option<Method>;
}

pub struct LoxInstance {
    class: Rc<dyn ClassDescriptor>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<dyn ClassDescriptor>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }

    pub fn find_method(&self, name: &str) -> Option<Method> {
        self.class.find_method(name)
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name())
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.borrow();
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();

        f.debug_struct("LoxInstance")
            .field("class", &self.class.name())
            .field("fields", &names)
            .finish()
    }
}

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    traits: Vec<Rc<Trait>>,
    methods: HashMap<String, Method>,
    metaclass: Rc<Metaclass>,
    /// This class seen as an instance of its metaclass.
    statics: LoxInstance,
}

impl LoxClass {
    pub fn new(
        name: &str,
        superclass: Option<Rc<LoxClass>>,
        traits: Vec<Rc<Trait>>,
        methods: HashMap<String, Method>,
        static_methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        let metaclass = Rc::new(Metaclass::new(format!("{name} class"), static_methods));
        let descriptor: Rc<dyn ClassDescriptor> = metaclass.clone();

        LoxClass {
            name: name.to_string(),
            superclass,
            traits,
            methods,
            metaclass,
            statics: LoxInstance::new(descriptor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    pub fn metaclass(&self) -> &Rc<Metaclass> {
        &self.metaclass
    }

    pub fn statics(&self) -> &LoxInstance {
        &self.statics
    }

    /// Own methods, then each trait in declaration order, then the
    /// superclass chain. First match wins.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        for t in &self.traits {
            if let Some(function) = t.find_method(name) {
                return Some(Method {
                    function,
                    is_getter: false,
                });
            }
        }

        self.superclass.as_ref()?.find_method(name)
    }

    fn initializer(&self) -> Option<Rc<LoxFunction>> {
        self.find_method("init").map(|m| m.function)
    }
}

impl ClassDescriptor for LoxClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_method(&self, name: &str) -> Option<Method> {
        LoxClass::find_method(self, name)
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.initializer().map_or(0, |init| init.arity())
    }

    /// Allocate an instance and run `init` on it; `init`'s own return value
    /// is discarded.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating class '{}'", self.name);

        let descriptor: Rc<dyn ClassDescriptor> = Rc::clone(self) as Rc<dyn ClassDescriptor>;
        let instance = Value::Instance(Rc::new(LoxInstance::new(descriptor)));

        if let Some(initializer) = self.initializer() {
            initializer
                .bind(instance.clone())
                .call(interpreter, paren, arguments)?;
        }

        Ok(instance)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();

        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("traits", &self.traits.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("methods", &methods)
            .finish()
    }
}

/// The class of a class. Holds the static methods.
pub struct Metaclass {
    name: String,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl Metaclass {
    pub fn new(name: String, methods: HashMap<String, Rc<LoxFunction>>) -> Self {
        Metaclass { name, methods }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ClassDescriptor for Metaclass {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).map(|function| Method {
            function: Rc::clone(function),
            is_getter: false,
        })
    }
}

/// Reached from the host through [`LoxClass::metaclass`].
impl Callable for Rc<Metaclass> {
    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        _paren: &Token,
        _arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let descriptor: Rc<dyn ClassDescriptor> = Rc::clone(self) as Rc<dyn ClassDescriptor>;

        Ok(Value::Instance(Rc::new(LoxInstance::new(descriptor))))
    }
}

impl fmt::Debug for Metaclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metaclass").field("name", &self.name).finish()
    }
}

/// A named bag of default method implementations, mixed into classes.
pub struct Trait {
    name: String,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl Trait {
    pub fn new(name: &str, methods: HashMap<String, Rc<LoxFunction>>) -> Self {
        Trait {
            name: name.to_string(),
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trait").field("name", &self.name).finish()
    }
}
