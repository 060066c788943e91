//! Text embedding providers.
//!
//! `openai` calls the hosted embeddings endpoint; `fastembed` runs
//! all-MiniLM-L6-v2 locally and is only compiled with the `local-embed`
//! feature.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use pgvector::Vector;
use tracing::debug;
use vectl_core::config::{EmbeddingConfig, EmbeddingProvider};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_DEFAULT_MODEL: &str = "text-embedding-3-small";

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    /// Length of every vector this embedder returns
    fn dims(&self) -> usize;

    /// One vector per input, in input order. Empty input makes no request.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vector>>;

    async fn embed_query(&self, query: &str) -> Result<Vector> {
        self.embed_batch(&[query.to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no vector returned"))
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::OpenAi => {
            let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_owned());
            Ok(Box::new(OpenAiEmbedder::new(api_key, model)?))
        }
        #[cfg(feature = "local-embed")]
        EmbeddingProvider::FastEmbed => Ok(Box::new(local::FastEmbedder::new(
            config.model.as_deref(),
        )?)),
        #[cfg(not(feature = "local-embed"))]
        EmbeddingProvider::FastEmbed => {
            bail!("fastembed provider requires vectl built with the `local-embed` feature")
        }
    }
}

/// Output size of the OpenAI embedding models
pub fn openai_dims(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY is empty");
        }
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Place response items by their `index`; any gap is an error.
fn order_embeddings(expected: usize, data: Vec<EmbeddingData>) -> Result<Vec<Vector>> {
    let mut vectors = vec![None; expected];
    for item in data {
        if item.index < vectors.len() {
            vectors[item.index] = Some(Vector::from(item.embedding));
        }
    }

    vectors
        .into_iter()
        .enumerate()
        .map(|(idx, maybe)| maybe.ok_or_else(|| anyhow!("missing embedding for index {}", idx)))
        .collect()
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        openai_dims(&self.model)
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vector>> {
        #[derive(serde::Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, count = inputs.len(), "requesting embeddings");
        let response = self
            .http
            .post(OPENAI_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .context("OpenAI embeddings request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read OpenAI embeddings response")?;
        let parsed = decode_response(status, &body)?;

        order_embeddings(inputs.len(), parsed.data)
    }
}

/// Keep the body on failure; it carries OpenAI's explanation.
fn decode_response(status: reqwest::StatusCode, body: &str) -> Result<EmbeddingResponse> {
    if !status.is_success() {
        bail!("OpenAI embeddings error (HTTP {status}): {body}");
    }
    serde_json::from_str(body).context("failed to parse OpenAI embeddings response")
}

#[cfg(feature = "local-embed")]
mod local {
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use pgvector::Vector;

    use super::Embedder;

    const MODEL_NAME: &str = "all-MiniLM-L6-v2";
    const MODEL_DIM: usize = 384;
    const BATCH_SIZE: usize = 256;

    pub struct FastEmbedder {
        model: Arc<TextEmbedding>,
    }

    impl FastEmbedder {
        pub fn new(model: Option<&str>) -> Result<Self> {
            if let Some(name) = model {
                if name != MODEL_NAME {
                    bail!("fastembed provider only supports {MODEL_NAME}, got {name}");
                }
            }
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
            )?;
            Ok(Self {
                model: Arc::new(model),
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn model(&self) -> &str {
            MODEL_NAME
        }

        fn dims(&self) -> usize {
            MODEL_DIM
        }

        async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vector>> {
            if inputs.is_empty() {
                return Ok(Vec::new());
            }
            let model = Arc::clone(&self.model);
            let texts = inputs.to_vec();
            let embeddings =
                tokio::task::spawn_blocking(move || model.embed(texts, Some(BATCH_SIZE))).await??;
            Ok(embeddings.into_iter().map(Vector::from).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(index: usize, value: f32) -> EmbeddingData {
        EmbeddingData {
            embedding: vec![value; 2],
            index,
        }
    }

    #[test]
    fn http_errors_keep_status_and_body() {
        let body = r#"{"error":{"message":"This model's maximum context length is 8192 tokens"}}"#;
        let err = decode_response(reqwest::StatusCode::BAD_REQUEST, body)
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("400"));
        assert!(err.contains("maximum context length"));
    }

    #[test]
    fn successful_body_is_decoded() {
        let body = r#"{"data":[{"embedding":[0.5,0.5],"index":0}]}"#;
        let parsed = decode_response(reqwest::StatusCode::OK, body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].index, 0);
    }

    #[test]
    fn responses_are_reordered_by_index() {
        let vectors = order_embeddings(3, vec![data(2, 2.0), data(0, 0.0), data(1, 1.0)]).unwrap();
        let firsts: Vec<f32> = vectors.iter().map(|v| v.as_slice()[0]).collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn missing_index_is_an_error() {
        let err = order_embeddings(2, vec![data(0, 0.0)]).unwrap_err();
        assert!(err.to_string().contains("missing embedding for index 1"));
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let vectors = order_embeddings(1, vec![data(0, 0.5), data(7, 9.0)]).unwrap();
        assert_eq!(vectors.len(), 1);
    }

    #[test]
    fn empty_key_rejected() {
        assert!(OpenAiEmbedder::new("  ".into(), OPENAI_DEFAULT_MODEL.into()).is_err());
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let embedder = OpenAiEmbedder::new("sk-test".into(), OPENAI_DEFAULT_MODEL.into()).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.dims(), 1536);
    }

    #[cfg(not(feature = "local-embed"))]
    #[test]
    fn fastembed_needs_feature() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::FastEmbed,
            ..EmbeddingConfig::default()
        };
        assert!(build_embedder(&config).is_err());
    }
}
