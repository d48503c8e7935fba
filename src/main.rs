//! `nullsafe`: run the null-aware front end over files and directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bumpalo::Bump;
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use walkdir::WalkDir;

use nullsafe_parser::ast::ParseError;
use nullsafe_parser::ast::sexpr::module_to_sexpr;
use nullsafe_parser::lexer::{Lexer, symbols};
use nullsafe_parser::line_index::LineIndex;
use nullsafe_parser::router::{Route, route};
use nullsafe_parser::{Diagnostic, SourceUnit, compile, parse};

#[derive(Parser)]
#[command(name = "nullsafe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parse and lower the ??, ??=, ?. and ?[ operators")]
struct Cli {
    /// What to do with each file
    #[arg(value_enum)]
    mode: Mode,

    /// Source files, or directories to search for `*.py`
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Print one JSON report per line
    #[arg(long)]
    json: bool,

    /// Also process files that contain none of the operators
    #[arg(long)]
    all: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Parse and lower, reporting only errors
    Check,
    /// Dump the token stream
    Tokens,
    /// Print the parsed tree
    Parse,
    /// Print the lowered tree
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Ok,
    Passthrough,
    Error,
}

#[derive(Serialize)]
struct Report {
    file: String,
    route: Route,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    io_error: Option<String>,
}

impl Report {
    fn new(file: String, route: Route, status: Status) -> Self {
        Self {
            file,
            route,
            status,
            output: None,
            diagnostic: None,
            io_error: None,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let files = collect_files(&cli.paths);
    debug!(files = files.len(), "collected sources");

    let reports: Vec<Report> = files
        .par_iter()
        .map(|path| process(path, cli.mode, cli.all))
        .collect();

    let mut failed = 0;
    for report in &reports {
        if report.status == Status::Error {
            failed += 1;
        }
        if cli.json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(file = %report.file, %err, "could not serialize report"),
            }
        } else {
            print_text(report);
        }
    }

    debug!(files = reports.len(), failed, "done");
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let is_source = entry.path().extension().is_some_and(|ext| ext == "py");
                if entry.file_type().is_file() && is_source {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn process(path: &Path, mode: Mode, all: bool) -> Report {
    let file = path.display().to_string();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            let mut report = Report::new(file, Route::Passthrough, Status::Error);
            report.io_error = Some(err.to_string());
            return report;
        }
    };

    let route = route(&file, &text);
    if route == Route::Passthrough && !all {
        return Report::new(file, route, Status::Passthrough);
    }

    let arena = Bump::new();
    let unit = SourceUnit::new(&file, &text);
    let result = match mode {
        Mode::Check => compile(unit, &arena).map(|_| None),
        Mode::Parse => parse(unit, &arena).map(|module| Some(Value::String(module_to_sexpr(&module)))),
        Mode::Lower => {
            compile(unit, &arena).map(|module| Some(Value::String(module_to_sexpr(&module))))
        }
        Mode::Tokens => tokens(unit).map(Some),
    };

    match result {
        Ok(output) => {
            let mut report = Report::new(file, route, Status::Ok);
            report.output = output;
            report
        }
        Err(diagnostic) => {
            let mut report = Report::new(file, route, Status::Error);
            report.diagnostic = Some(diagnostic);
            report
        }
    }
}

fn tokens(unit: SourceUnit<'_>) -> Result<Value, Diagnostic> {
    symbols::install();
    let index = LineIndex::new(unit.text);
    let mut out = Vec::new();
    for token in Lexer::new(unit.text) {
        let token = token.map_err(|err| {
            Diagnostic::from_parse_error(unit.name, unit.text, &ParseError::from(err))
        })?;
        let (line, column) = index.line_col(unit.text, token.span.start);
        out.push(json!({
            "kind": token.kind,
            "text": token.span.as_str(unit.text),
            "line": line,
            "column": column,
        }));
    }
    Ok(Value::Array(out))
}

fn print_text(report: &Report) {
    if let Some(err) = &report.io_error {
        eprintln!("{}: {err}", report.file);
        return;
    }
    if let Some(diagnostic) = &report.diagnostic {
        eprintln!("{diagnostic}");
        return;
    }
    match &report.output {
        None if report.status == Status::Passthrough => println!("{}: passthrough", report.file),
        None => println!("{}: ok", report.file),
        Some(Value::String(tree)) => println!("# {}\n{tree}", report.file),
        Some(Value::Array(tokens)) => {
            println!("# {}", report.file);
            for token in tokens {
                println!(
                    "{}:{} {} {:?}",
                    token["line"],
                    token["column"],
                    token["kind"].as_str().unwrap_or_default(),
                    token["text"].as_str().unwrap_or_default()
                );
            }
        }
        Some(other) => println!("{other}"),
    }
}
