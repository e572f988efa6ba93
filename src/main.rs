use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::info;
use memmap2::Mmap;

use quill::ast_printer::AstPrinter;
use quill::interpreter::Interpreter;
use quill::parser::Parser;
use quill::resolver;
use quill::scanner::{self, Scanner};

#[derive(ClapParser, Debug)]
#[command(version, about = "Quill language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to quill.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token sequence as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the program back as source
    Parse { filename: PathBuf },

    /// Runs input from a file as a Quill program
    Run { filename: PathBuf },
}

/// Memory-maps a source file for zero-copy scanning.
fn map_file(filename: &Path) -> Result<Mmap> {
    info!("Mapping file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    // SAFETY: the mapping is read-only and outlives every token borrowed
    // from it within this process.
    let mmap = unsafe { Mmap::map(&file) }
        .context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("quill.log").context("Failed to create quill.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'quill::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("quill::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

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
        .init();

    info!("Logger initialized, writing to quill.log");

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let mmap = map_file(&filename)?;

            if json {
                let (tokens, errors) = scanner::scan(&mmap);

                for e in &errors {
                    eprintln!("{}", e);
                }

                println!("{}", serde_json::to_string_pretty(&tokens)?);

                if !errors.is_empty() {
                    std::process::exit(65);
                }
            } else {
                let mut tokenized = true;

                for token in Scanner::new(&mmap) {
                    match token {
                        Ok(token) => println!("{}", token),

                        Err(e) => {
                            tokenized = false;
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    std::process::exit(65);
                }
            }

            info!("Tokenization completed");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let mmap = map_file(&filename)?;

            let (tokens, lex_errors) = scanner::scan(&mmap);

            let mut parser = Parser::new(&tokens);
            let (statements, parse_errors) = parser.parse();

            let mut had_error = false;

            for e in lex_errors.iter().chain(parse_errors.iter()) {
                eprintln!("{}", e);
                had_error = true;
            }

            println!("{}", AstPrinter::print_program(&statements));

            if had_error {
                std::process::exit(65);
            }

            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");

            let mmap = map_file(&filename)?;

            let (tokens, lex_errors) = scanner::scan(&mmap);

            let mut parser = Parser::new(&tokens);
            let (statements, parse_errors) = parser.parse();

            let mut had_error = false;

            for e in lex_errors.iter().chain(parse_errors.iter()) {
                eprintln!("{}", e);
                had_error = true;
            }

            if had_error {
                std::process::exit(65);
            }

            let (locals, resolve_errors) = resolver::resolve(&statements);

            if !resolve_errors.is_empty() {
                for e in &resolve_errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            let mut interpreter = Interpreter::new();

            if let Err(e) = interpreter.interpret(&statements, locals) {
                eprintln!("{}", e);
                std::process::exit(70);
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
