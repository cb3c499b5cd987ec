//! Data-stream line protocol for chat responses.
//!
//! Every part is one line: a type code, a colon, and a JSON value. Browser chat
//! clients built on the AI SDK consume this format directly.

use super::ChatAnswer;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;

/// Header announcing the data-stream protocol version.
pub const DATA_STREAM_HEADER: (&str, &str) = ("x-vercel-ai-data-stream", "v1");

/// One line of the data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DataStreamPart {
    /// `0:` answer text.
    Text(String),
    /// `2:` auxiliary data, always a JSON array.
    Data(serde_json::Value),
    /// `3:` error message; ends the stream.
    Error(String),
    /// `d:` finish marker.
    Finish,
}

impl DataStreamPart {
    pub fn encode(&self) -> String {
        let (code, value) = match self {
            DataStreamPart::Text(text) => ('0', json!(text)),
            DataStreamPart::Data(value) => ('2', value.clone()),
            DataStreamPart::Error(message) => ('3', json!(message)),
            DataStreamPart::Finish => ('d', json!({ "finishReason": "stop" })),
        };
        format!("{}:{}\n", code, value)
    }
}

/// Encode an answer: retrievals first, then each token, then the finish marker.
///
/// A token error is sent as an error part and ends the stream.
pub fn data_stream(answer: ChatAnswer) -> BoxStream<'static, String> {
    let head = DataStreamPart::Data(json!([{ "retrievals": answer.retrievals }])).encode();

    let body = stream::unfold(Some(answer.tokens), |tokens| async move {
        let mut tokens = tokens?;
        match tokens.next().await {
            Some(Ok(text)) => Some((DataStreamPart::Text(text).encode(), Some(tokens))),
            Some(Err(e)) => Some((DataStreamPart::Error(e.to_string()).encode(), None)),
            None => Some((DataStreamPart::Finish.encode(), None)),
        }
    });

    stream::once(async move { head }).chain(body).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexwiseError;

    #[test]
    fn test_part_encoding() {
        assert_eq!(DataStreamPart::Text("He said \"no\"\n".to_string()).encode(), "0:\"He said \\\"no\\\"\\n\"\n");
        assert_eq!(DataStreamPart::Error("boom".to_string()).encode(), "3:\"boom\"\n");
        assert_eq!(DataStreamPart::Finish.encode(), "d:{\"finishReason\":\"stop\"}\n");
    }

    #[tokio::test]
    async fn test_stream_order() {
        let answer = ChatAnswer {
            retrievals: "<nomatches>".to_string(),
            references: Vec::new(),
            tokens: stream::iter(vec![Ok("A".to_string()), Ok("B".to_string())]).boxed(),
        };
        let lines: Vec<String> = data_stream(answer).collect().await;
        assert_eq!(
            lines,
            vec![
                "2:[{\"retrievals\":\"<nomatches>\"}]\n",
                "0:\"A\"\n",
                "0:\"B\"\n",
                "d:{\"finishReason\":\"stop\"}\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let answer = ChatAnswer {
            retrievals: String::new(),
            references: Vec::new(),
            tokens: stream::iter(vec![
                Ok("A".to_string()),
                Err(LexwiseError::Generation("cut off".to_string())),
                Ok("never".to_string()),
            ])
            .boxed(),
        };
        let lines: Vec<String> = data_stream(answer).collect().await;
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("3:\"Generation failed: cut off"));
    }
}
