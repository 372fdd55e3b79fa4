use std::io::{Write, stdin, stdout};

use arithmetic_parser::{Expression, Tokenizer};
use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the token sequence for an expression.
    Tokenize { expression: String },
    /// Evaluate an expression, prompting on stdin when none is given.
    Eval { expression: Option<String> },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Tokenize { expression } => {
            let tokens = match Tokenizer::new(&expression).tokenize() {
                Ok(tokens) => tokens,
                Err(e) => {
                    eprintln!("{e:?}");
                    std::process::exit(65);
                }
            };
            for token in tokens {
                println!("{token}");
            }
        }
        Commands::Eval { expression } => {
            let expression = match expression {
                Some(expression) => expression,
                None => prompt()?,
            };
            let expression = Expression::new(expression);

            if expression.is_valid() {
                println!("The expression evaluated to: {}", expression.value());
            } else {
                eprintln!("Unable to resolve given expression");
                eprintln!("Error Message: {}", expression.error_message());
                if let Some(e) = expression.error() {
                    eprintln!("{e:?}");
                }
                std::process::exit(65);
            }
        }
    }
    Ok(())
}

fn prompt() -> miette::Result<String> {
    println!("Simple Arithmetic Parser");
    print!("Please provide an arithmetic expression: ");
    stdout().flush().into_diagnostic()?;

    let mut input = String::new();
    stdin().read_line(&mut input).into_diagnostic()?;

    // Strip only the line terminator; interior whitespace is part of the
    // expression and an all-blank line must still reach the tokenizer.
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
