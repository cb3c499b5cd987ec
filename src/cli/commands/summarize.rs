//! Summarize command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::summarize::DataUrl;
use anyhow::{bail, Result};
use std::path::Path;

/// Upload types the summary model accepts.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
];

/// MIME type for an accepted upload, by extension.
fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Run the summarize command.
pub async fn run_summarize(path: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let path = Settings::expand_path(path);
    let Some(mime) = mime_type(&path) else {
        bail!(
            "Unsupported file type: {} (expected JPEG, PNG, WEBP or PDF)",
            path.display()
        );
    };

    if let Err(e) = preflight::check(Operation::Summarize, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'lexwise doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let bytes = tokio::fs::read(&path).await?;
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Reading document...");
    let result = orchestrator
        .summarizer()
        .summarize(&DataUrl::encode(mime, &bytes))
        .await;
    spinner.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            Output::error(&format!("Failed to summarize document: {}", e));
            return Err(e.into());
        }
    };

    println!("\n{}\n", summary.trim());

    if let Some(output) = output {
        let output = Settings::expand_path(&output);
        std::fs::write(&output, &summary)?;
        Output::success(&format!("Summary saved to {}", output.display()));
        Output::info(&format!(
            "Edit it if needed, then: lexwise ask \"...\" --summary-file {}",
            output.display()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type(Path::new("scan.JPG")), Some("image/jpeg"));
        assert_eq!(mime_type(Path::new("deed.webp")), Some("image/webp"));
        assert_eq!(mime_type(Path::new("lease.pdf")), Some("application/pdf"));
        assert_eq!(mime_type(Path::new("notes.txt")), None);
        assert_eq!(mime_type(Path::new("README")), None);
    }
}
