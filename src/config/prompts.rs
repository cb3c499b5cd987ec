//! Prompt templates for Lexwise.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub chat: ChatPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt sent alongside an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub instruction: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            instruction: r#"Attached is an image of a legal document.
Go over the document and identify key legal points, important clauses, and any notable provisions or conditions. Then summarize in 100 words. You may increase the word limit if the document has multiple pages. Do not output any personally identifiable information or confidential details. Make sure to include specific clauses, referenced laws/statutes, and key details from the document, including document title.
## Summary: "#
                .to_string(),
        }
    }
}

/// Prompts for retrieval and answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    /// Instruction prefix the embedding model expects on search queries.
    pub query_prefix: String,
    /// Inserted into the query when a summary is present. Uses {{summary}}.
    pub query_summary: String,
    /// Full answer prompt. Uses {{question}}, {{summary_section}}, {{references}}.
    pub template: String,
    /// Rendered into {{summary_section}} when a summary is present. Uses {{summary}}.
    pub summary_section: String,
    /// Rendered into {{summary_section}} when no summary was provided.
    pub no_summary_section: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            query_prefix: "Represent this for searching relevant passages: ".to_string(),
            query_summary: "legal document states: \n{{summary}}. \n\n".to_string(),

            template: r#"
If the question "{{question}}" has nothing to do with law, say that it does not relate to any law and that you cannot answer it. Do not answer such a question and stop there.

You are given a user query and some general legal precedents and references that may or may not be relevant.
Ensure the response is factually accurate and demonstrates a thorough understanding of the query topic.
Before answering you may enrich your knowledge by going through the provided legal references.
The legal references are generic insights. Do not include a legal reference if it is not relevant to this specific case.
Answer in simple words so that a person who does not know legal terms can understand it.
Do not mention the references or a knowledge base. Format the response properly: separate paragraphs with blank lines and bold key words.
{{summary_section}}

**User Query:**
{{question}}?
**end of user query**

**Generic Legal References:**

{{references}}.

**end of generic legal references**

Provide thorough justification for your answer, citing relevant sections of the document and applicable laws/precedents where appropriate.

**Answer:**
"#
            .to_string(),

            summary_section: r#"
A summary of the user's legal document follows. Go through it and answer the user query with respect to it.

**Legal Document Summary:**
{{summary}}.
**end of legal document**
"#
            .to_string(),

            no_summary_section: r#"
No legal document was provided. Answer strictly from the generic legal references, and say that since no document was uploaded you are answering from general legal knowledge.
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single left-to-right pass, so `{{...}}` sequences inside
    /// substituted values are left alone. Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
