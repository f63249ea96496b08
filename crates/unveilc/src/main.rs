//! unveil CLI.
//!
//! `unveilc <input.js>` parses the input, runs the partial evaluator, and
//! prints the residual program to stdout.

mod tracing_setup;

use std::process::ExitCode;

use unveil_ast::StringInterner;

fn main() -> ExitCode {
    tracing_setup::init();

    let args: Vec<String> = std::env::args().collect();
    let path = match args.as_slice() {
        [_, arg] => match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            path => path.to_owned(),
        },
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let interner = StringInterner::new();
    let program = match unveil_parse::parse_program(&source, &interner) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error: {path}:{err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(path = %path, statements = program.body.len(), "parsed input");

    let mut evaluator = unveil_eval::Evaluator::new(&interner);
    let residual = match evaluator.run(&program) {
        Ok(residual) => residual,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    print!(
        "{}",
        unveil_codegen::print_statements(&residual, &interner)
    );
    ExitCode::SUCCESS
}

fn print_usage() {
    eprintln!("unveil - JavaScript deobfuscator");
    eprintln!();
    eprintln!("Usage: unveilc <input.js>");
    eprintln!();
    eprintln!("Reads the input, partially evaluates it, and prints the");
    eprintln!("simplified program to stdout.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  UNVEIL_LOG   log filter (RUST_LOG syntax), default 'warn'");
}
