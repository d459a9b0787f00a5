use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use scicalc::ast_printer::AstPrinter;
use scicalc::error::SciError;
use scicalc::interpreter::Interpreter;
use scicalc::parser::Parser;
use scicalc::scanner::Scanner;
use scicalc::token::TokenType;
use scicalc::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "Scientific calculator language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to scicalc.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the AST as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Evaluates a program file and prints its final value
    Run { filename: PathBuf },

    /// Evaluates source given on the command line
    Eval { source: String },

    /// Reads and evaluates lines from stdin in one session
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("scicalc.log").context("Failed to create scicalc.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("scicalc::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to scicalc.log");
    Ok(())
}

/// Exit code for a failed evaluation, following the sysexits convention:
/// 65 for malformed input, 70 for runtime failures.
fn exit_code(err: &SciError) -> i32 {
    match err {
        SciError::Scan { .. } | SciError::Parse { .. } => 65,
        _ => 70,
    }
}

fn print_result(value: &Value) {
    if !matches!(value, Value::Null) {
        println!("{}", value);
    }
}

fn evaluate_or_exit(interpreter: &mut Interpreter, source: &str) {
    match interpreter.evaluate(source) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            print_result(&value);
        }

        Err(e) => {
            debug!("Evaluation debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn repl() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        match interpreter.evaluate(&line) {
            Ok(value) => print_result(&value),
            Err(e) => eprintln!("{}", e),
        }
    }

    info!("REPL session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            info!("Running Tokenize subcommand");
            let source = read_file(&filename)?;
            let scanner = Scanner::new(&source);
            let mut tokenized = true;

            for token in scanner {
                if let TokenType::ERROR(message) = &token.token_type {
                    tokenized = false;
                    eprintln!("{}:{}: {}", token.line, token.col, message);
                    eprintln!("{}", scicalc::scanner::show_location(&source, token.line, token.col));
                } else {
                    println!("{}", token);
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename, json } => {
            info!("Running Parse subcommand");
            let source = read_file(&filename)?;
            let mut parser = Parser::new(Scanner::new(&source));

            match parser.parse() {
                Ok(expr) => {
                    info!("Program parsed successfully");

                    if json {
                        let rendered = serde_json::to_string_pretty(&expr)
                            .context("Failed to serialize AST")?;
                        println!("{}", rendered);
                    } else {
                        println!("{}", AstPrinter::print(&expr));
                    }
                }

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let source = read_file(&filename)?;
            let mut interpreter = Interpreter::new();

            evaluate_or_exit(&mut interpreter, &source);
        }

        Commands::Eval { source } => {
            info!("Running Eval subcommand");
            let mut interpreter = Interpreter::new();

            evaluate_or_exit(&mut interpreter, &source);
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}
