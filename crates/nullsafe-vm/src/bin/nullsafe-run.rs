use anyhow::Context;
use clap::{CommandFactory, Parser};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nullsafe_vm::core::value::Val;
use nullsafe_vm::vm::engine::VM;

#[derive(Parser)]
#[command(name = "nullsafe-run")]
#[command(about = "Run scripts that use ??, ??=, ?. and ?[", long_about = None)]
struct Cli {
    /// Run interactively
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Script file to run
    #[arg(name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.interactive {
        run_repl()?;
    } else if let Some(file) = cli.file {
        run_file(&file)?;
    } else {
        Cli::command().print_help()?;
    }

    Ok(())
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut vm = VM::new();
    let result = vm.run_source(&path.display().to_string(), &source);
    print!("{}", vm.take_output());
    result?;
    Ok(())
}

fn run_repl() -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut vm = VM::new();

    println!("Type 'exit' or 'quit' to quit");
    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;

                let result = vm.run_source("<stdin>", &line);
                print!("{}", vm.take_output());
                match result {
                    Ok(Val::None) => {}
                    Ok(value) => println!("{}", value.repr()),
                    Err(err) => println!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
