use chrono::{DateTime, Utc};
use clap::ValueEnum;
use pgvector::Vector;
use serde::Serialize;
use uuid::Uuid;

/// A text and its embedding, stored as one postgres row and one
/// Elasticsearch document under the same id.
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub id: Uuid,
    pub content: String,
    pub vector: Vector,
}

impl SearchRecord {
    /// Ids are UUIDv7 so rows sort by creation time.
    pub fn new(content: impl Into<String>, vector: Vector) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            vector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// kNN over the Elasticsearch dense_vector index
    #[default]
    Elastic,
    /// Exact cosine ordering over the pgvector table
    Postgres,
}

/// Keep hits at or above `threshold`, best first.
pub fn filter_by_threshold(mut hits: Vec<SearchHit>, threshold: f32) -> Vec<SearchHit> {
    hits.retain(|hit| hit.similarity >= threshold);
    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits
}
