mod alias;
mod builtins;
mod config;
mod editor;
mod error;
#[cfg(unix)]
mod job_control;
mod jobs;
mod lexer;
mod executor;
mod parser;
mod reaper;
mod status;

use std::io::{self, Write};

use anyhow::{Context, Result};
use editor::LineEditor;
use executor::ExecutionAction;
use jobs::JobTable;

const PROMPT: &str = "dockshell> ";

fn main() -> Result<()> {
    init_logging();
    init_shell_context()?;

    let alias_table = config::load_alias_table();
    let mut job_table = JobTable::new();
    let mut editor = LineEditor::new();

    loop {
        reaper::drain(&mut job_table);

        let line = match editor.read_line(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("dockshell: error reading input: {e}");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        editor.add_to_history(trimmed);

        let tokens = match lexer::tokenize(trimmed) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("dockshell: {e}");
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }

        let mut pipeline = match parser::parse(tokens) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                eprintln!("dockshell: {e}");
                continue;
            }
        };

        alias::resolve(&mut pipeline, &alias_table);

        match executor::execute(&pipeline, &mut job_table, trimmed) {
            ExecutionAction::Continue(_) => {}
            ExecutionAction::Exit(code) => {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("DOCKSHELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install the child reaper and the interactive `SIGINT` newline handler.
/// Both are startup preconditions for correct job control, so a failure
/// here is fatal rather than tolerated like the ambient config load.
fn init_shell_context() -> Result<()> {
    #[cfg(unix)]
    reaper::install().context("failed to install SIGCHLD handler")?;

    ctrlc::set_handler(|| {
        if !editor::EDITOR_ACTIVE.load(std::sync::atomic::Ordering::Relaxed) {
            println!();
            let _ = io::stdout().flush();
        }
    })
    .context("failed to install SIGINT handler")?;

    Ok(())
}
