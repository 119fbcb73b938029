//! Built‑in functions registered in the global namespace.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};

use crate::callable::NativeFunction;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Install every native into `interpreter`'s globals.
pub fn install(interpreter: &mut Interpreter) {
    let natives = [
        NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        },
        NativeFunction {
            name: "readLine",
            arity: 0,
            func: read_line,
        },
        NativeFunction {
            name: "printw",
            arity: 1,
            func: printw,
        },
        NativeFunction {
            name: "loadFile",
            arity: 1,
            func: load_file,
        },
        NativeFunction {
            name: "reload",
            arity: 0,
            func: reload,
        },
    ];

    for native in natives {
        interpreter.define_native(native);
    }
}

/// Seconds since the Unix epoch, millisecond resolution.
fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
}

/// One line of standard input without its terminator; `nil` at EOF.
fn read_line(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let mut line = String::new();

    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("Could not read input: {e}"))?;

    if read == 0 {
        return Ok(Value::Nil);
    }

    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(Value::string(trimmed))
}

fn printw(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let text = args.first().map(Value::to_string).unwrap_or_default();

    interpreter
        .write_output(&text)
        .map_err(|e| format!("Output error: {e}"))?;

    Ok(Value::Nil)
}

fn load_file(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, String> {
    let path = match args.first() {
        Some(Value::String(path)) => PathBuf::from(&**path),
        _ => return Err("loadFile expects a path string.".to_string()),
    };

    info!("loadFile({:?})", path);
    run_script(interpreter, &path)?;

    Ok(Value::Nil)
}

fn reload(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let files: Vec<PathBuf> = interpreter.loaded_files().to_vec();

    info!("Reloading {} file(s)", files.len());

    for path in &files {
        run_script(interpreter, path)?;
    }

    Ok(Value::Nil)
}

/// An unreadable file fails the native call. Errors inside the script are
/// reported and do not propagate into the caller.
fn run_script(interpreter: &mut Interpreter, path: &Path) -> Result<(), String> {
    match interpreter.run_file(path) {
        Ok(_) => Ok(()),
        Err(LoxError::Io(e)) => Err(format!("Could not read file '{}': {e}", path.display())),
        Err(e) => {
            debug!("Script {:?} failed: {}", path, e);
            interpreter.report(&e);
            Ok(())
        }
    }
}
