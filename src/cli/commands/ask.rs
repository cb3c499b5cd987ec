//! Ask command implementation.

use crate::chat::ChatMessage;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    summary: Option<String>,
    summary_file: Option<String>,
    show_references: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lexwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let summary = match summary_file {
        Some(path) => Some(std::fs::read_to_string(Settings::expand_path(&path))?),
        None => summary,
    };

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching legal references...");
    let answer = orchestrator
        .chat()
        .answer(&[ChatMessage::user(question)], summary.as_deref())
        .await;
    spinner.finish_and_clear();

    let mut answer = match answer {
        Ok(answer) => answer,
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    };

    println!();
    let mut stdout = std::io::stdout();
    while let Some(token) = answer.tokens.next().await {
        match token {
            Ok(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            Err(e) => {
                println!();
                Output::error(&format!("Answer interrupted: {}", e));
                return Err(e.into());
            }
        }
    }
    println!("\n");

    if show_references {
        Output::header("Legal References");
        if answer.references.is_empty() {
            Output::info("No references matched this question.");
        }
        for reference in &answer.references {
            Output::reference(reference);
        }
    }

    Ok(())
}
