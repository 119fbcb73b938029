use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rlox::error::LoxError;
use rlox::interpreter::Interpreter;
use rlox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "rlox: a tree-walking Lox interpreter")]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Write debug logs to ./app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every token of a file, one per line
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a file holding one expression and print its value
    Evaluate { filename: PathBuf },

    /// Execute a Lox script
    Run { filename: PathBuf },

    /// Interactive prompt; lines without a trailing `;` are echoed as expressions
    Repl,
}

/// Reads a whole source file as UTF‑8.
fn read_file(filename: &Path) -> Result<String> {
    info!("Loading source from {:?}", filename);
    let mut buf = Vec::new();
    BufReader::new(File::open(filename).with_context(|| format!("Cannot open {:?}", filename))?)
        .read_to_end(&mut buf)
        .with_context(|| format!("Cannot read {:?}", filename))?;

    debug!("{} bytes loaded", buf.len());

    String::from_utf8(buf).with_context(|| format!("{:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let sink = File::create("app.log").context("Cannot create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let path = record.module_path().unwrap_or("?");
            let module = path.strip_prefix("rlox::").unwrap_or(path);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(sink)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("logging to app.log");
    Ok(())
}

/// Print a Lox failure and map it to its exit status.
fn fail(error: &LoxError) -> ExitCode {
    debug!("Failure: {}", error);
    eprintln!("{}", error);

    ExitCode::from(error.exit_code() as u8)
}

fn tokenize(filename: &Path, json: bool) -> Result<ExitCode> {
    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        return Ok(ExitCode::from(65));
    }

    Ok(ExitCode::SUCCESS)
}

fn repl() -> Result<ExitCode> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.ends_with(';') || trimmed.ends_with('}') {
            if let Err(e) = interpreter.run(&line) {
                eprintln!("{}", e);
            }
        } else {
            match interpreter.evaluate_source(&line) {
                Ok(value) => println!("{}", value),
                Err(e) => eprintln!("{}", e),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    debug!("{:?}", cli);

    match cli.commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),

        Commands::Evaluate { filename } => {
            let source = read_file(&filename)?;
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate_source(&source) {
                Ok(value) => {
                    println!("{}", value);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(fail(&e)),
            }
        }

        Commands::Run { filename } => {
            let mut interpreter = Interpreter::new();

            match interpreter.run_file(&filename) {
                Ok(_) => {
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(fail(&e)),
            }
        }

        Commands::Repl => repl(),
    }
}
