// file: src/models/search_result.rs
// description: Ranked search hit model returned by the engine
// reference: Used for mapping engine hits back to store identifiers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Engine-assigned document id (the record's primary key rendered as text)
    pub id: String,

    /// Zero-based position in the engine's result list
    pub rank: usize,

    /// Relevance score, absent for filter-only queries or sorted results
    pub score: Option<f64>,
}

impl Hit {
    pub fn new(id: impl Into<String>, rank: usize, score: Option<f64>) -> Self {
        Self {
            id: id.into(),
            rank,
            score,
        }
    }

    /// Build hits from ids in rank order
    pub fn ranked<I, S>(ids: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter()
            .enumerate()
            .map(|(rank, id)| Hit::new(id, rank, None))
            .collect()
    }

    /// Format as a summary string for display
    pub fn format_summary(&self) -> String {
        match self.score {
            Some(score) => format!("#{:<3} {} (score {:.4})", self.rank + 1, self.id, score),
            None => format!("#{:<3} {}", self.rank + 1, self.id),
        }
    }
}
