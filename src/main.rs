// Quill: compiler front end driver

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use tracing_subscriber::EnvFilter;

use quill::{CoercionPolicy, CompileError, DiagnosticKind, Options, Session};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("quill");

    let mut options = Options::new();
    let mut path = None;
    for arg in args.iter().skip(1) {
        if arg == "--strict" {
            options = options.with_coercion(CoercionPolicy::Strict);
        } else if let Some(value) = arg.strip_prefix("--max-errors=") {
            match value.parse() {
                Ok(max) => options = options.with_max_diagnostics(max),
                Err(_) => {
                    eprintln!("Error: invalid value in '{}'", arg);
                    return ExitCode::from(1);
                }
            }
        } else if path.is_none() {
            path = Some(arg.as_str());
        } else {
            eprintln!("Error: unexpected argument '{}'", arg);
            return ExitCode::from(1);
        }
    }

    let Some(path) = path else {
        eprintln!("Error: No input file provided");
        eprintln!();
        eprintln!("Usage: {} [--strict] [--max-errors=N] <file.ql>", program_name);
        return ExitCode::from(1);
    };

    if !Path::new(path).exists() {
        eprintln!("Error: File '{}' not found", path);
        return ExitCode::from(1);
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: could not read '{}': {}", path, e);
            return ExitCode::from(1);
        }
    };

    let session = match Session::compile(&source, options) {
        Ok(session) => session,
        Err(CompileError::Internal(e)) => {
            eprintln!("{}: internal compiler error: {}", path, e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = report(path, &session) {
        eprintln!("Error: could not write diagnostics: {}", e);
    }

    if session.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Print every visible diagnostic as `path:line:col: phase: message`,
/// followed by a summary line.
fn report(path: &str, session: &Session<'_>) -> io::Result<()> {
    let mut stdout = io::stdout();

    for diagnostic in session.visible_diagnostics() {
        let location = session.location(diagnostic.span);
        let color = match diagnostic.kind {
            DiagnosticKind::Lexical(_) => Color::Magenta,
            DiagnosticKind::Syntax(_) => Color::Yellow,
            DiagnosticKind::Semantic(_) => Color::Red,
        };
        queue!(
            stdout,
            SetAttribute(Attribute::Bold),
            Print(format!("{}:{}:{}: ", path, location.line, location.column)),
            SetForegroundColor(color),
            Print(format!("{}: ", diagnostic.kind.phase())),
            ResetColor,
            SetAttribute(Attribute::Reset),
            Print(format!("{}\n", diagnostic.kind)),
        )?;
    }

    let total = session.diagnostics().len();
    let hidden = total - session.visible_diagnostics().len();
    if total == 0 {
        queue!(
            stdout,
            SetForegroundColor(Color::Green),
            Print(format!("{}: no errors\n", path)),
            ResetColor,
        )?;
    } else {
        let summary = if hidden > 0 {
            format!("{}: {} error(s), {} not shown\n", path, total, hidden)
        } else {
            format!("{}: {} error(s)\n", path, total)
        };
        queue!(
            stdout,
            SetAttribute(Attribute::Bold),
            Print(summary),
            SetAttribute(Attribute::Reset)
        )?;
    }

    stdout.flush()
}
