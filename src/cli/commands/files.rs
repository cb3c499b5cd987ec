//! Files command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::loader::{list_files, DocumentFormat};
use anyhow::Result;
use std::path::Path;

/// Run the files command.
pub fn run_files(settings: &Settings) -> Result<()> {
    let dir = settings.documents_dir();

    let names = match list_files(&dir) {
        Ok(names) => names,
        Err(e) => {
            Output::error(&format!("Failed to read {}: {}", dir.display(), e));
            return Err(e.into());
        }
    };

    if names.is_empty() {
        Output::info(&format!("No files in {}.", dir.display()));
        return Ok(());
    }

    Output::header(&format!("Documents ({})", names.len()));
    println!();
    for name in &names {
        match DocumentFormat::from_path(Path::new(name)) {
            Some(format) => Output::list_item(&format!("{} ({})", name, format)),
            None => Output::list_item(&format!("{} (skipped: unsupported type)", name)),
        }
    }

    Ok(())
}
