//! Formatting retrieved references for the answer prompt.

use crate::vector_store::ScoredMatch;

/// Placed in the prompt when retrieval found nothing usable.
pub const NO_MATCHES: &str = "<nomatches>";

/// Render matches as numbered legal references, best first.
///
/// Matches without chunk text are dropped before numbering.
pub fn format_references(matches: &[ScoredMatch]) -> String {
    let references: Vec<String> = matches
        .iter()
        .filter_map(|m| m.chunk.as_deref())
        .enumerate()
        .map(|(i, chunk)| format!("\nLegal Reference {}: \n {}", i + 1, chunk))
        .collect();

    if references.is_empty() {
        NO_MATCHES.to_string()
    } else {
        references.join(". \n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, chunk: Option<&str>) -> ScoredMatch {
        ScoredMatch {
            id: id.to_string(),
            score: 0.5,
            chunk: chunk.map(str::to_string),
        }
    }

    #[test]
    fn test_format_references() {
        let text = format_references(&[
            hit("a", Some("Section 10 applies")),
            hit("b", None),
            hit("c", Some("Deposits are refundable")),
        ]);
        assert_eq!(
            text,
            "\nLegal Reference 1: \n Section 10 applies. \n\n\nLegal Reference 2: \n Deposits are refundable"
        );
    }

    #[test]
    fn test_no_usable_matches() {
        assert_eq!(format_references(&[]), NO_MATCHES);
        assert_eq!(format_references(&[hit("a", None)]), NO_MATCHES);
    }
}
