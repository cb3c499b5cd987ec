//! Chat turn orchestration.

use super::{format_references, ChatMessage};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{LexwiseError, Result};
use crate::generation::{Generator, TokenStream};
use crate::vector_store::{IndexTarget, ScoredMatch, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Engine answering questions from retrieved legal references.
pub struct ChatEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    target: IndexTarget,
    top_k: usize,
}

/// A streamed answer and the references it was grounded on.
pub struct ChatAnswer {
    /// Formatted references, exactly as placed in the prompt.
    pub retrievals: String,
    /// Chunk text of each reference, in prompt order.
    pub references: Vec<String>,
    pub tokens: TokenStream,
}

impl ChatEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        target: IndexTarget,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            prompts: Prompts::default(),
            target,
            top_k: 5,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the number of references retrieved per turn.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build the retrieval query for a question.
    pub fn build_query(&self, question: &str, summary: &str) -> Result<String> {
        let mut query = self.prompts.chat.query_prefix.clone();
        if !summary.trim().is_empty() {
            query.push_str(&self.render(&self.prompts.chat.query_summary, &[("summary", summary)]));
        }
        query.push_str(question);

        let query = query.trim();
        if query.is_empty() {
            return Err(LexwiseError::InvalidInput("Query string cannot be empty".to_string()));
        }
        Ok(query.to_string())
    }

    /// Build the full answer prompt.
    pub fn build_prompt(&self, question: &str, summary: &str, references: &str) -> String {
        let summary_section = if summary.trim().is_empty() {
            self.render(&self.prompts.chat.no_summary_section, &[])
        } else {
            self.render(&self.prompts.chat.summary_section, &[("summary", summary)])
        };

        self.render(
            &self.prompts.chat.template,
            &[
                ("question", question),
                ("summary_section", &summary_section),
                ("references", references),
            ],
        )
    }

    /// Embed `query` and return the best matches.
    #[instrument(skip(self, query), fields(target = %self.target, top_k = self.top_k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredMatch>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.store.query(&self.target, &vector, self.top_k).await?;
        debug!("Retrieved {} references", matches.len());
        Ok(matches)
    }

    /// Answer the latest message of a conversation.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn answer(&self, messages: &[ChatMessage], summary: Option<&str>) -> Result<ChatAnswer> {
        let question = messages
            .last()
            .map(|m| m.content.as_str())
            .ok_or_else(|| LexwiseError::InvalidInput("Conversation has no messages".to_string()))?;
        let summary = summary.unwrap_or_default();

        let query = self.build_query(question, summary)?;
        let matches = self.retrieve(&query).await?;
        let retrievals = format_references(&matches);
        let references = matches.into_iter().filter_map(|m| m.chunk).collect();
        let prompt = self.build_prompt(question, summary, &retrievals);

        info!(
            with_summary = !summary.trim().is_empty(),
            "Streaming answer ({} prompt characters)",
            prompt.len()
        );
        let tokens = self.generator.stream(&prompt).await?;

        Ok(ChatAnswer {
            retrievals,
            references,
            tokens,
        })
    }

    fn render(&self, template: &str, vars: &[(&str, &str)]) -> String {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.prompts.render_with_custom(template, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::NO_MATCHES;
    use crate::testing::{FakeEmbedder, FakeGenerator};
    use crate::vector_store::{MemoryVectorStore, RecordMetadata, VectorRecord};
    use futures::StreamExt;

    struct Fixture {
        embedder: Arc<FakeEmbedder>,
        store: Arc<MemoryVectorStore>,
        generator: Arc<FakeGenerator>,
        engine: ChatEngine,
    }

    fn fixture() -> Fixture {
        let embedder = Arc::new(FakeEmbedder::new(4));
        let store = Arc::new(MemoryVectorStore::new());
        let generator = Arc::new(FakeGenerator::new("").with_tokens(&["Under ", "Section 10"]));
        let engine = ChatEngine::new(
            embedder.clone(),
            store.clone(),
            generator.clone(),
            IndexTarget::new("index-one", "testspace"),
        );
        Fixture {
            embedder,
            store,
            generator,
            engine,
        }
    }

    #[test]
    fn test_query_with_and_without_summary() {
        let f = fixture();
        assert_eq!(
            f.engine.build_query("Can I sublet?", "").unwrap(),
            "Represent this for searching relevant passages: Can I sublet?"
        );
        assert_eq!(
            f.engine.build_query("Can I sublet?", "A residential lease").unwrap(),
            "Represent this for searching relevant passages: legal document states: \nA residential lease. \n\nCan I sublet?"
        );
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let mut prompts = Prompts::default();
        prompts.chat.query_prefix = String::new();
        let engine = fixture().engine.with_prompts(prompts);
        assert!(engine.build_query("   ", "").unwrap_err().is_client_error());
    }

    #[test]
    fn test_prompt_sections() {
        let f = fixture();
        let with_summary = f.engine.build_prompt("Can I sublet?", "A residential lease", "refs");
        assert!(with_summary.contains("**Legal Document Summary:**\nA residential lease."));
        assert!(with_summary.contains("**User Query:**\nCan I sublet??"));
        assert!(with_summary.contains("refs."));

        let without = f.engine.build_prompt("Can I sublet?", "  ", "refs");
        assert!(!without.contains("Legal Document Summary"));
        assert!(without.contains("No legal document was provided"));
        assert!(!without.contains("{{"));
    }

    #[tokio::test]
    async fn test_answer_with_no_matches_uses_sentinel() {
        let f = fixture();
        let answer = f
            .engine
            .answer(&[ChatMessage::user("Is verbal agreement binding?")], None)
            .await
            .unwrap();

        assert_eq!(answer.retrievals, NO_MATCHES);
        assert!(answer.references.is_empty());
        let tokens: Vec<String> = answer.tokens.map(|t| t.unwrap()).collect().await;
        assert_eq!(tokens.concat(), "Under Section 10");

        let prompts = f.generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("<nomatches>"));
        assert!(prompts[0].contains("No legal document was provided"));
    }

    #[tokio::test]
    async fn test_answer_retrieves_references_for_last_message() {
        let f = fixture();
        f.store
            .upsert(
                &IndexTarget::new("index-one", "testspace"),
                &[VectorRecord {
                    id: "contract-act-1-0".to_string(),
                    values: vec![1.0, 1.0, 1.0, 1.0],
                    metadata: RecordMetadata {
                        chunk: "Section 10: agreements are contracts".to_string(),
                    },
                }],
            )
            .await
            .unwrap();

        let messages = [
            ChatMessage::user("Hello"),
            ChatMessage {
                role: "assistant".to_string(),
                content: "Hi".to_string(),
            },
            ChatMessage::user("What makes a contract valid?"),
        ];
        let answer = f.engine.answer(&messages, Some("A sale deed")).await.unwrap();

        assert_eq!(
            answer.retrievals,
            "\nLegal Reference 1: \n Section 10: agreements are contracts"
        );
        let embedded = f.embedder.queries();
        assert_eq!(embedded.len(), 1);
        assert!(embedded[0].ends_with("A sale deed. \n\nWhat makes a contract valid?"));
        assert!(f.generator.prompts()[0].contains("Section 10: agreements are contracts"));
    }

    #[tokio::test]
    async fn test_references_keep_chunks_whole() {
        let f = fixture();
        let chunk = "Section 5: notice is required. \n\nSection 6: rent is due monthly";
        f.store
            .upsert(
                &IndexTarget::new("index-one", "testspace"),
                &[VectorRecord {
                    id: "tenancy-act-1-0".to_string(),
                    values: vec![1.0, 1.0, 1.0, 1.0],
                    metadata: RecordMetadata {
                        chunk: chunk.to_string(),
                    },
                }],
            )
            .await
            .unwrap();

        let answer = f
            .engine
            .answer(&[ChatMessage::user("When is rent due?")], None)
            .await
            .unwrap();

        assert_eq!(answer.references, vec![chunk.to_string()]);
        assert!(answer.retrievals.contains(chunk));
    }

    #[tokio::test]
    async fn test_no_messages_is_an_input_error() {
        let f = fixture();
        let err = f.engine.answer(&[], None).await.err().unwrap();
        assert!(err.is_client_error());
        assert!(f.embedder.queries().is_empty());
    }
}
