//! Doctor command - verify API keys, folders and configuration.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings, VectorStoreProvider};
use crate::loader::list_files;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("Lexwise Doctor");
    println!();
    println!("Checking API keys and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = check_api_keys(settings);
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings);
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    let config_check = check_config_file(&config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Lexwise.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Lexwise is ready to use.");
    }

    Ok(())
}

/// Check the keys each configured provider needs.
fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![check_key(
        "GEMINI_API_KEY",
        settings.generation.resolved_api_key(),
        true,
    )];

    match settings.embedding.provider {
        EmbeddingProvider::HuggingFace => {
            results.push(check_key("HF_TOKEN", settings.embedding.resolved_api_key(), true))
        }
        EmbeddingProvider::OpenAI => results.push(check_key(
            "OPENAI_API_KEY",
            settings.embedding.resolved_api_key(),
            true,
        )),
        // Optional: self-hosted servers usually run without auth
        EmbeddingProvider::Local => {
            results.push(check_key("HF_TOKEN", settings.embedding.resolved_api_key(), false))
        }
    }

    if settings.vector_store.provider == VectorStoreProvider::Pinecone {
        results.push(check_key(
            "PINECONE_API_KEY",
            settings.vector_store.resolved_api_key(),
            true,
        ));
    }

    results
}

fn check_key(name: &str, key: Option<String>, required: bool) -> CheckResult {
    let hint = format!("Set with: export {}='...' (or add it to the config file)", name);
    match key {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask_key(&key))),
        None if required => CheckResult::error(name, "not set", &hint),
        None => CheckResult::warning(name, "not set (optional)", &hint),
    }
}

/// Show only the ends of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check the documents folder and, for the sqlite provider, the vector database.
fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let docs_dir = settings.documents_dir();
    match list_files(&docs_dir) {
        Ok(files) if files.is_empty() => results.push(CheckResult::warning(
            "Documents folder",
            &format!("{} (empty)", docs_dir.display()),
            "Add reference PDFs or text files before running: lexwise ingest",
        )),
        Ok(files) => results.push(CheckResult::ok(
            "Documents folder",
            &format!("{} ({} files)", docs_dir.display(), files.len()),
        )),
        Err(_) => results.push(CheckResult::warning(
            "Documents folder",
            &format!("{} (missing)", docs_dir.display()),
            "Create it or set general.documents_dir in the config file",
        )),
    }

    match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => {
            let db_path = settings.sqlite_path();
            if db_path.exists() {
                let size = std::fs::metadata(&db_path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                results.push(CheckResult::ok(
                    "Vector database",
                    &format!("{} ({})", db_path.display(), size),
                ));
            } else {
                results.push(CheckResult::warning(
                    "Vector database",
                    &format!("{} (not created yet)", db_path.display()),
                    "Database will be created on first ingestion",
                ));
            }
        }
        VectorStoreProvider::Memory => results.push(CheckResult::warning(
            "Vector store",
            "memory (vectors are lost when the process exits)",
            "Use the sqlite or pinecone provider to keep ingested documents",
        )),
        VectorStoreProvider::Pinecone => results.push(CheckResult::ok(
            "Vector store",
            &format!("pinecone ({})", settings.vector_store.controller_url),
        )),
    }

    results
}

/// Check if config file exists and parses.
fn check_config_file(config_path: &Path) -> CheckResult {
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: lexwise config edit",
        );
    }

    match Settings::load_from(Some(&config_path.to_path_buf())) {
        Ok(_) => CheckResult::ok("Config file", &format!("{}", config_path.display())),
        Err(e) => CheckResult::error(
            "Config file",
            &format!("{} is invalid", config_path.display()),
            &e.to_string(),
        ),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
