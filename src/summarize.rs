//! Document summarization from an uploaded data URL.

use crate::config::Prompts;
use crate::error::{LexwiseError, Result};
use crate::generation::{Generator, Part};
use base64::Engine as _;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, instrument};

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Encode bytes as a base64 data URL.
    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(data)
        )
    }
}

/// Sends an uploaded document to the summary model with a fixed instruction.
pub struct Summarizer {
    generator: Arc<dyn Generator>,
    instruction: String,
    data_url: Regex,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn Generator>, prompts: &Prompts) -> Result<Self> {
        // mime type, then optional parameters (`;base64`, `;name=...`), then payload
        let data_url = Regex::new(r"(?s)^data:([^;,]+)((?:;[^;,]*)*),(.*)$")
            .map_err(|e| LexwiseError::Config(format!("Invalid data URL pattern: {}", e)))?;

        Ok(Self {
            generator,
            instruction: prompts.render_with_custom(&prompts.summary.instruction, &Default::default()),
            data_url,
        })
    }

    /// Split a data URL into its MIME type and decoded bytes.
    pub fn parse_data_url(&self, input: &str) -> Result<DataUrl> {
        let caps = self
            .data_url
            .captures(input.trim())
            .ok_or_else(|| LexwiseError::InvalidInput("Expected a data URL (data:<mime>;base64,<data>)".to_string()))?;

        let mime_type = caps[1].trim().to_string();
        let is_base64 = caps[2]
            .split(';')
            .any(|param| param.trim().eq_ignore_ascii_case("base64"));
        let payload = &caps[3];

        let data = if is_base64 {
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| LexwiseError::InvalidInput(format!("Data URL payload is not valid base64: {}", e)))?
        } else {
            payload.as_bytes().to_vec()
        };

        if data.is_empty() {
            return Err(LexwiseError::InvalidInput("Data URL carries no data".to_string()));
        }

        Ok(DataUrl { mime_type, data })
    }

    /// Summarize the document held in `data_url`.
    #[instrument(skip_all)]
    pub async fn summarize(&self, data_url: &str) -> Result<String> {
        let file = self.parse_data_url(data_url)?;
        info!("Summarizing {} upload ({} bytes)", file.mime_type, file.data.len());

        self.generator
            .generate(vec![
                Part::text(self.instruction.clone()),
                Part::InlineData {
                    mime_type: file.mime_type,
                    data: file.data,
                },
            ])
            .await
    }
}
