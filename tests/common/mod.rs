#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rlox::error::{Diagnostic, LoxError};
use rlox::interpreter::Interpreter;

/// An in‑memory `Write` whose contents stay readable after the interpreter
/// takes ownership of a clone.
#[derive(Clone, Default)]
pub struct Sink(Rc<RefCell<Vec<u8>>>);

impl Sink {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Interpreter wired to two fresh sinks: `(interpreter, stdout, stderr)`.
pub fn interpreter() -> (Interpreter, Sink, Sink) {
    let out = Sink::default();
    let err = Sink::default();
    let interpreter = Interpreter::with_output(Box::new(out.clone()), Box::new(err.clone()));

    (interpreter, out, err)
}

/// Run `source` in a fresh interpreter and return what it printed.
pub fn run_ok(source: &str) -> String {
    let (mut interpreter, out, _) = interpreter();

    if let Err(e) = interpreter.run(source) {
        panic!("program failed: {e}\nprinted so far:\n{}", out.contents());
    }

    out.contents()
}

/// Run `source` expecting failure; returns the error and what was printed
/// before it.
pub fn run_err(source: &str) -> (LoxError, String) {
    let (mut interpreter, out, _) = interpreter();

    match interpreter.run(source) {
        Ok(_) => panic!("program succeeded:\n{}", out.contents()),
        Err(e) => (e, out.contents()),
    }
}

/// Messages of the error diagnostics in a failed resolve pass.
pub fn resolve_errors(error: &LoxError) -> Vec<String> {
    match error {
        LoxError::Resolve { diagnostics } => diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.message.clone())
            .collect(),
        other => panic!("expected a resolve error, got: {other}"),
    }
}

pub fn warning_messages(warnings: &[Diagnostic]) -> Vec<String> {
    warnings.iter().map(|w| w.message.clone()).collect()
}

/// Message of a runtime error.
pub fn runtime_message(error: &LoxError) -> String {
    match error {
        LoxError::Runtime(e) => e.message.clone(),
        other => panic!("expected a runtime error, got: {other}"),
    }
}
