//! RAG response types.

use crate::retrieval::RetrievedPassage;
use std::collections::BTreeMap;

/// An answer together with the passages it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    /// Markdown answer written by the model
    pub answer: String,

    /// Passages that went into the prompt, in prompt order
    pub passages: Vec<RetrievedPassage>,
}

impl RagAnswer {
    /// Number of passages contributed by each index.
    pub fn passages_per_index(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for passage in &self.passages {
            *counts.entry(passage.source_index.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(index: &str, rank: usize) -> RetrievedPassage {
        RetrievedPassage {
            text: format!("{} #{}", index, rank),
            source_index: index.to_string(),
            rank,
        }
    }

    #[test]
    fn test_passages_per_index() {
        let answer = RagAnswer {
            answer: "ok".to_string(),
            passages: vec![passage("aapl", 0), passage("aapl", 1), passage("msft", 0)],
        };

        let counts = answer.passages_per_index();
        assert_eq!(counts.get("aapl"), Some(&2));
        assert_eq!(counts.get("msft"), Some(&1));
    }
}
