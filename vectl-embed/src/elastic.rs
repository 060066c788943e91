use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::record::{SearchHit, SearchRecord};

const VECTOR_FIELD: &str = "vector";
const CONTENT_FIELD: &str = "content";

/// Client for one Elasticsearch index holding `{content, vector}` documents.
///
/// Talks to the REST API directly: `HEAD`/`PUT /{index}` for creation,
/// `/_bulk` for writes and a `knn` query on `/{index}/_search` for reads.
pub struct ElasticIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticIndex {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            index: index.into(),
            username: None,
            password: None,
        }
    }

    /// Set basic authentication credentials.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}{path}")
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            builder.basic_auth(user, Some(pass))
        } else {
            builder
        }
    }

    /// Send a request and return its JSON body, failing on non-2xx.
    async fn send_json(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let resp = self
            .apply_auth(builder)
            .send()
            .await
            .with_context(|| format!("Elasticsearch {what} request failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read Elasticsearch {what} response"))?;

        if !status.is_success() {
            bail!("Elasticsearch {what} error (HTTP {status}): {text}");
        }

        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse Elasticsearch {what} response"))
    }

    /// Cluster info from `GET /`, used as a liveness check.
    pub async fn ping(&self) -> Result<Value> {
        self.send_json(self.client.get(self.url("/")), "ping").await
    }

    /// All indices, as reported by `_cat/indices`.
    pub async fn list_indices(&self) -> Result<Value> {
        self.send_json(
            self.client.get(self.url("/_cat/indices?format=json")),
            "cat indices",
        )
        .await
    }

    pub async fn exists(&self) -> Result<bool> {
        let resp = self
            .apply_auth(self.client.head(self.url(&format!("/{}", self.index))))
            .send()
            .await
            .context("Elasticsearch HEAD request failed")?;
        Ok(resp.status().is_success())
    }

    /// Create the index with a `dims`-wide cosine dense_vector mapping
    /// unless it already exists.
    pub async fn ensure_index(&self, dims: usize) -> Result<()> {
        if self.exists().await? {
            debug!(index = %self.index, "index already exists");
            return Ok(());
        }

        self.send_json(
            self.client
                .put(self.url(&format!("/{}", self.index)))
                .json(&index_body(dims)),
            "create index",
        )
        .await?;
        info!(index = %self.index, dims, "created index");
        Ok(())
    }

    /// Index records under their ids in a single bulk request.
    pub async fn index_batch(&self, records: &[SearchRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let parsed = self
            .send_json(
                self.client
                    .post(self.url("/_bulk?refresh=wait_for"))
                    .header("Content-Type", "application/x-ndjson")
                    .body(bulk_body(&self.index, records)),
                "bulk",
            )
            .await?;

        if !parsed
            .get("errors")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            return Ok(());
        }

        // Partial failure: take back what was accepted so the index never
        // holds documents whose rows are about to be rolled back.
        let outcome = BulkOutcome::from_response(&parsed);
        if !outcome.accepted.is_empty() {
            warn!(
                accepted = outcome.accepted.len(),
                failed = outcome.failed.len(),
                "bulk request partially failed, deleting accepted documents"
            );
            self.delete_ids(&outcome.accepted)
                .await
                .context("failed to remove documents from a partially failed bulk request")?;
        }

        match outcome.failed.first() {
            Some((id, reason)) => bail!(
                "Elasticsearch rejected {} of {} document(s), first {id}: {reason}",
                outcome.failed.len(),
                records.len()
            ),
            None => bail!("Elasticsearch bulk operation had errors: {parsed}"),
        }
    }

    /// Delete documents by id in a single bulk request.
    pub async fn delete_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let parsed = self
            .send_json(
                self.client
                    .post(self.url("/_bulk?refresh=wait_for"))
                    .header("Content-Type", "application/x-ndjson")
                    .body(delete_body(&self.index, ids)),
                "bulk delete",
            )
            .await?;

        let outcome = BulkOutcome::from_response(&parsed);
        if let Some((id, reason)) = outcome.failed.first() {
            bail!("Elasticsearch could not delete {id}: {reason}");
        }
        debug!(deleted = outcome.accepted.len(), "deleted documents");
        Ok(())
    }

    pub async fn knn_search(
        &self,
        vector: &[f32],
        k: usize,
        num_candidates: usize,
    ) -> Result<Vec<SearchHit>> {
        let parsed = self
            .send_json(
                self.client
                    .post(self.url(&format!("/{}/_search", self.index)))
                    .json(&knn_body(vector, k, num_candidates)),
                "search",
            )
            .await?;
        Ok(parse_hits(&parsed))
    }
}

pub fn index_body(dims: usize) -> Value {
    json!({
        "settings": {"index": {"knn": true}},
        "mappings": {
            "properties": {
                VECTOR_FIELD: {"type": "dense_vector", "dims": dims, "index": true, "similarity": "cosine"},
                CONTENT_FIELD: {"type": "text"}
            }
        }
    })
}

pub fn knn_body(vector: &[f32], k: usize, num_candidates: usize) -> Value {
    json!({
        "size": k,
        "knn": {
            "field": VECTOR_FIELD,
            "query_vector": vector,
            "k": k,
            "num_candidates": num_candidates
        },
        "_source": {"includes": [CONTENT_FIELD]}
    })
}

/// NDJSON body for `_bulk`: an action line and a document line per record.
pub fn bulk_body(index: &str, records: &[SearchRecord]) -> String {
    let mut body = String::new();
    for record in records {
        let action = json!({"index": {"_index": index, "_id": record.id.to_string()}});
        body.push_str(&action.to_string());
        body.push('\n');

        let doc = json!({
            CONTENT_FIELD: record.content,
            VECTOR_FIELD: record.vector.as_slice(),
        });
        body.push_str(&doc.to_string());
        body.push('\n');
    }
    body
}

/// NDJSON body for `_bulk` deleting each id.
pub fn delete_body(index: &str, ids: &[String]) -> String {
    let mut body = String::new();
    for id in ids {
        body.push_str(&json!({"delete": {"_index": index, "_id": id}}).to_string());
        body.push('\n');
    }
    body
}

/// Per-item result of a `_bulk` response.
#[derive(Debug, Default, PartialEq)]
pub struct BulkOutcome {
    /// Ids the cluster applied (2xx item status).
    pub accepted: Vec<String>,
    /// Ids the cluster rejected, with the error reason.
    pub failed: Vec<(String, String)>,
}

impl BulkOutcome {
    pub fn from_response(response: &Value) -> Self {
        let mut outcome = BulkOutcome::default();
        let Some(items) = response["items"].as_array() else {
            return outcome;
        };

        for item in items {
            // Each item is keyed by its action: {"index": {...}} or {"delete": {...}}
            let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
                continue;
            };
            let id = result["_id"].as_str().unwrap_or_default().to_string();
            let status = result["status"].as_u64().unwrap_or(0);
            if (200..300).contains(&status) {
                outcome.accepted.push(id);
            } else {
                let reason = result["error"]["reason"]
                    .as_str()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("status {status}"));
                outcome.failed.push((id, reason));
            }
        }
        outcome
    }
}

/// Elasticsearch scores cosine kNN hits as `(1 + cos) / 2`.
pub fn score_to_cosine(score: f64) -> f32 {
    (2.0 * score - 1.0) as f32
}

pub fn parse_hits(response: &Value) -> Vec<SearchHit> {
    let Some(hits) = response["hits"]["hits"].as_array() else {
        return Vec::new();
    };

    hits.iter()
        .map(|hit| SearchHit {
            id: hit["_id"].as_str().unwrap_or_default().to_string(),
            content: hit["_source"][CONTENT_FIELD]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            similarity: score_to_cosine(hit["_score"].as_f64().unwrap_or(0.0)),
            created_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgvector::Vector;

    #[test]
    fn url_construction_trailing_slash() {
        let es = ElasticIndex::new("http://localhost:9200/", "search");
        assert_eq!(es.url("/_bulk"), "http://localhost:9200/_bulk");
        assert_eq!(es.url("/search/_search"), "http://localhost:9200/search/_search");
    }

    #[test]
    fn with_auth_sets_credentials() {
        let es = ElasticIndex::new("http://es:9200", "search").with_auth("elastic", "changeme");
        assert_eq!(es.username.as_deref(), Some("elastic"));
        assert_eq!(es.password.as_deref(), Some("changeme"));
        assert_eq!(es.index(), "search");
    }

    #[test]
    fn index_body_declares_cosine_dense_vector() {
        let body = index_body(384);
        assert_eq!(body["settings"]["index"]["knn"], true);
        let vector = &body["mappings"]["properties"]["vector"];
        assert_eq!(vector["type"], "dense_vector");
        assert_eq!(vector["dims"], 384);
        assert_eq!(vector["similarity"], "cosine");
        assert_eq!(body["mappings"]["properties"]["content"]["type"], "text");
    }

    #[test]
    fn knn_body_shape() {
        let body = knn_body(&[0.5, -0.5], 3, 100);
        assert_eq!(body["size"], 3);
        assert_eq!(body["knn"]["field"], "vector");
        assert_eq!(body["knn"]["k"], 3);
        assert_eq!(body["knn"]["num_candidates"], 100);
        assert_eq!(body["knn"]["query_vector"], json!([0.5, -0.5]));
        assert_eq!(body["_source"]["includes"], json!(["content"]));
    }

    #[test]
    fn bulk_body_pairs_action_and_document() {
        let records = vec![
            SearchRecord::new("first", Vector::from(vec![1.0, 0.0])),
            SearchRecord::new("second", Vector::from(vec![0.0, 1.0])),
        ];
        let body = bulk_body("search", &records);
        let lines: Vec<Value> = body
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));
        assert_eq!(lines[0]["index"]["_index"], "search");
        assert_eq!(lines[0]["index"]["_id"], records[0].id.to_string());
        assert_eq!(lines[1]["content"], "first");
        assert_eq!(lines[1]["vector"], json!([1.0, 0.0]));
        assert_eq!(lines[3]["content"], "second");
    }

    #[test]
    fn bulk_outcome_splits_mixed_response() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201, "result": "created"}},
                {"index": {"_id": "b", "status": 400, "error": {
                    "type": "document_parsing_exception",
                    "reason": "different number of dimensions"
                }}},
                {"index": {"_id": "c", "status": 200, "result": "updated"}},
                {"index": {"_id": "d", "status": 429}}
            ]
        });
        let outcome = BulkOutcome::from_response(&response);
        assert_eq!(outcome.accepted, vec!["a", "c"]);
        assert_eq!(
            outcome.failed,
            vec![
                ("b".to_string(), "different number of dimensions".to_string()),
                ("d".to_string(), "status 429".to_string()),
            ]
        );
    }

    #[test]
    fn bulk_outcome_reads_delete_items() {
        let response = json!({"items": [{"delete": {"_id": "a", "status": 200}}]});
        assert_eq!(BulkOutcome::from_response(&response).accepted, vec!["a"]);
        assert_eq!(BulkOutcome::from_response(&json!({})), BulkOutcome::default());
    }

    #[test]
    fn delete_body_has_one_action_per_id() {
        let body = delete_body("search", &["a".to_string(), "b".to_string()]);
        let lines: Vec<Value> = body
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["delete"]["_index"], "search");
        assert_eq!(lines[1]["delete"]["_id"], "b");
    }

    #[test]
    fn scores_map_back_to_cosine() {
        assert!((score_to_cosine(1.0) - 1.0).abs() < 1e-6);
        assert!((score_to_cosine(0.5) - 0.0).abs() < 1e-6);
        assert!((score_to_cosine(0.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn parse_hits_reads_source_and_score() {
        let response = json!({
            "hits": {"hits": [
                {"_id": "a", "_score": 0.9, "_source": {"content": "alpha"}},
                {"_id": "b", "_score": 0.75, "_source": {"content": "beta"}}
            ]}
        });
        let hits = parse_hits(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].content, "alpha");
        assert!((hits[0].similarity - 0.8).abs() < 1e-6);
        assert!((hits[1].similarity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parse_hits_tolerates_empty_response() {
        assert!(parse_hits(&json!({})).is_empty());
    }
}
