use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};

use rox::error::LoxError;
use rox::interpreter::DEFAULT_MAX_CALL_DEPTH;
use rox::Lox;

const EXIT_USAGE: i32 = 64;
const EXIT_STATIC: i32 = 65;
const EXIT_NO_INPUT: i32 = 66;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox: a newline-terminated Lox interpreter", long_about = None)]
pub struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    scripts: Vec<PathBuf>,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,

    /// Only scan the script, printing each token
    #[arg(long)]
    tokens: bool,

    /// With --tokens, print tokens and diagnostics as JSON
    #[arg(long, requires = "tokens")]
    json: bool,

    /// Maximum depth of nested calls before "Stack overflow."
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

/// Reads a script into a String. A missing file exits with 66.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = match File::open(filename) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            eprintln!("Could not open file {:?}: {}", filename, e);
            std::process::exit(EXIT_NO_INPUT);
        }
        Err(e) => {
            return Err(e).context(format!("Failed to open file {:?}", filename));
        }
    };

    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print a run's error to stderr; the caller decides whether to exit.
fn report(error: &LoxError) {
    debug!("Run failed: {:?}", error);
    eprintln!("{}", error);
}

fn tokenize_file(filename: &Path, json: bool) -> Result<()> {
    let source = read_file(filename)?;
    let (tokens, diagnostics) = rox::tokenize(&source);

    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
    }

    if json {
        let report = serde_json::json!({
            "tokens": tokens,
            "diagnostics": diagnostics.iter().collect::<Vec<_>>(),
        });
        let rendered = serde_json::to_string_pretty(&report).context("Failed to encode tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if diagnostics.has_errors() {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        std::process::exit(EXIT_STATIC);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn run_file(filename: &Path, max_call_depth: usize) -> Result<()> {
    let source = read_file(filename)?;
    let mut lox = Lox::new().with_max_call_depth(max_call_depth);

    if let Err(e) = lox.run(&source) {
        report(&e);
        std::process::exit(e.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

fn run_prompt(max_call_depth: usize) -> Result<()> {
    info!("Starting interactive prompt");

    let mut lox = Lox::new().with_max_call_depth(max_call_depth);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        // EOF or an empty line ends the session.
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if read == 0 || trimmed.is_empty() {
            break;
        }

        let mut source = trimmed.to_string();
        source.push('\n');

        if let Err(e) = lox.run(&source) {
            report(&e);
        }
    }

    info!("Interactive prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // Silent unless RUST_LOG asks for something.
        Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.scripts.as_slice() {
        [] if args.tokens => {
            eprintln!("Usage: rox --tokens <script>");
            std::process::exit(EXIT_USAGE);
        }
        [] => run_prompt(args.max_call_depth),
        [script] if args.tokens => tokenize_file(script, args.json),
        [script] => run_file(script, args.max_call_depth),
        _ => {
            println!("Usage: rox [script]");
            std::process::exit(EXIT_USAGE);
        }
    }
}
