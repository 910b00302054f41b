use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use treelox as lox;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Print the token stream instead of executing
    #[arg(long)]
    tokens: bool,

    /// Print the parse tree instead of executing
    #[arg(long)]
    ast: bool,
}

fn main() -> anyhow::Result<()> {
    // Quiet by default; RUST_LOG opts into the library's log stream.
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    let cli: Cli = match Cli::try_parse() {
        Ok(cli) => cli,

        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }

        Err(err) => {
            println!("{}", err.render());
            process::exit(64);
        }
    };

    match cli.script {
        Some(path) => run_file(&path, cli.tokens, cli.ast),
        None => run_prompt(cli.tokens, cli.ast),
    }
}

fn run_file(path: &Path, tokens_only: bool, ast_only: bool) -> anyhow::Result<()> {
    let mut buf: Vec<u8> = Vec::new();

    match File::open(path) {
        Ok(file) => {
            if let Err(err) = BufReader::new(file).read_to_end(&mut buf) {
                report_and_exit(err.into());
            }
        }
        Err(err) => report_and_exit(err.into()),
    }

    let source: String = match String::from_utf8(buf) {
        Ok(source) => source,
        Err(err) => report_and_exit(err.into()),
    };

    let mut interpreter = Interpreter::new();

    if let Err(err) = run(&source, &mut interpreter, tokens_only, ast_only) {
        process::exit(err.exit_code());
    }

    Ok(())
}

fn run_prompt(tokens_only: bool, ast_only: bool) -> anyhow::Result<()> {
    let mut interpreter = Interpreter::new();

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();

        print!("> ");
        io::stdout().flush()?;

        if stdin.lock().read_line(&mut input)? == 0 {
            // End of input ends the session cleanly.
            break;
        }

        let line = input.trim();

        if line.is_empty() {
            continue;
        }

        // Diagnostics are already on stderr; the prompt just keeps going.
        let _ = run(line, &mut interpreter, tokens_only, ast_only);
    }

    Ok(())
}

/// Runs the full pipeline over `source`, printing every diagnostic to stderr
/// itself.  The returned error only signals failure (and its exit code) to
/// the caller.
fn run(
    source: &str,
    interpreter: &mut Interpreter,
    tokens_only: bool,
    ast_only: bool,
) -> Result<(), LoxError> {
    let (tokens, mut scan_errors) = Scanner::scan(source.as_bytes());

    for err in &scan_errors {
        eprintln!("{}", err);
    }

    if tokens_only {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if !scan_errors.is_empty() {
        return Err(scan_errors.swap_remove(0));
    }

    if tokens_only {
        return Ok(());
    }

    let mut statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,
        Err(err) => {
            eprintln!("{}", err);
            return Err(err);
        }
    };

    if ast_only {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
        return Ok(());
    }

    if let Err(err) = Resolver::new().resolve(&mut statements) {
        eprintln!("{}", err);
        return Err(err);
    }

    if let Err(err) = interpreter.interpret(&statements, &mut io::stdout()) {
        eprintln!("{}", err);
        return Err(err);
    }

    Ok(())
}

fn report_and_exit(err: LoxError) -> ! {
    eprintln!("{}", err);
    process::exit(err.exit_code());
}
