use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;
use vectl_core::{ComposeFile, VectlConfig};

pub mod elastic;
pub mod embedder;
pub mod record;
pub mod store;

pub use elastic::ElasticIndex;
pub use embedder::{build_embedder, Embedder, OpenAiEmbedder};
pub use record::{filter_by_threshold, Backend, SearchHit, SearchRecord};
pub use store::{wait_until_ready, PgStore, MIGRATOR};

const DEFAULT_ELASTIC_URL: &str = "http://localhost:9200";

/// Connection options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// PostgreSQL connection URL (falls back to config, then docker-compose.yml)
    #[arg(short = 'd', long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<Url>,

    /// Elasticsearch base URL
    #[arg(short = 'e', long, env = "ELASTIC_URL", global = true)]
    pub elastic_url: Option<Url>,

    /// Minimum cosine similarity a search hit must reach
    #[arg(short = 't', long, global = true)]
    pub threshold: Option<f32>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Texts to embed and store
    pub content: Vec<String>,

    /// Read additional texts from a file, one per line
    #[arg(long = "in", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Texts per embedding request (default from config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Count what would be stored without embedding anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Natural language query
    pub query: String,

    /// Number of nearest neighbours to fetch
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Where to run the kNN query
    #[arg(long, value_enum, default_value_t = Backend::Elastic)]
    pub backend: Backend,

    /// Print hits as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub direction: MigrateDirection,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    /// Create the vector extension and the search table
    Up,
    /// Drop the search table and the vector extension
    Down,
}

/// Effective settings after layering flags/env over config files.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: VectlConfig,
    pub database_url: Option<String>,
    pub elastic_url: String,
    pub threshold: f32,
    pub show_progress: bool,
}

impl Settings {
    pub fn resolve(args: &ConnectionArgs, config: VectlConfig, show_progress: bool) -> Result<Self> {
        let threshold = args.threshold.unwrap_or(config.search.threshold);
        if !(-1.0..=1.0).contains(&threshold) {
            bail!("threshold must be within [-1, 1], got {threshold}");
        }

        let database_url = args
            .database_url
            .as_ref()
            .map(Url::to_string)
            .or_else(|| config.database.url.clone())
            .or_else(|| {
                let path = &config.database.compose_file;
                if !path.exists() {
                    return None;
                }
                match ComposeFile::from_path(path).and_then(|c| c.database_url("localhost")) {
                    Ok(url) => {
                        debug!("Derived database URL from {}", path.display());
                        Some(url.to_string())
                    }
                    Err(e) => {
                        warn!("Could not derive database URL from {}: {}", path.display(), e);
                        None
                    }
                }
            });

        let elastic_url = args
            .elastic_url
            .as_ref()
            .map(Url::to_string)
            .or_else(|| config.elastic.url.clone())
            .unwrap_or_else(|| DEFAULT_ELASTIC_URL.to_string());

        Ok(Self {
            config,
            database_url,
            elastic_url,
            threshold,
            show_progress,
        })
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL not set (and no docker-compose.yml to derive it from)")
    }

    pub async fn store(&self) -> Result<PgStore> {
        let store =
            PgStore::connect(self.database_url()?, self.config.database.max_connections).await?;
        store.prepare().await?;
        Ok(store)
    }

    pub fn elastic(&self) -> ElasticIndex {
        let index = ElasticIndex::new(&self.elastic_url, &self.config.elastic.index);
        let username = self
            .config
            .elastic
            .username
            .clone()
            .or_else(|| std::env::var("ELASTIC_USERNAME").ok());
        let password = self
            .config
            .elastic
            .password
            .clone()
            .or_else(|| std::env::var("ELASTIC_PASSWORD").ok());
        match (username, password) {
            (Some(user), Some(pass)) => index.with_auth(user, pass),
            _ => index,
        }
    }
}

pub async fn run_collections(settings: &Settings) -> Result<()> {
    let indices = settings.elastic().list_indices().await?;
    println!("indices: {indices:#}");
    Ok(())
}

pub async fn run_count(settings: &Settings) -> Result<()> {
    let store = settings.store().await?;
    let count = store.count().await?;
    println!("rows: {}", count);
    store.pool().close().await;
    Ok(())
}

pub async fn run_migrate(args: MigrateArgs, settings: &Settings) -> Result<()> {
    let store = PgStore::connect(settings.database_url()?, settings.config.database.max_connections)
        .await?;
    match args.direction {
        MigrateDirection::Up => {
            store.prepare().await?;
            println!("migrations applied");
        }
        MigrateDirection::Down => {
            store.revert().await?;
            println!("migrations reverted");
        }
    }
    store.pool().close().await;
    Ok(())
}

pub async fn run_create(args: CreateArgs, settings: &Settings) -> Result<()> {
    let texts = collect_texts(&args).await?;
    if texts.is_empty() {
        bail!("nothing to create: pass CONTENT or --in PATH");
    }

    let batch_size = args
        .batch_size
        .unwrap_or(settings.config.embedding.batch_size)
        .max(1);

    if args.dry_run {
        info!(
            "dry-run: would embed {} texts in {} batches",
            texts.len(),
            texts.len().div_ceil(batch_size)
        );
        return Ok(());
    }

    let embedder = build_embedder(&settings.config.embedding)?;
    let store = settings.store().await?;
    let es = settings.elastic();
    es.ensure_index(embedder.dims()).await?;

    let progress = progress_bar(texts.len() as u64, settings.show_progress);
    let mut created = 0usize;

    for chunk in texts.chunks(batch_size) {
        let vectors = embedder.embed_batch(chunk).await?;
        let records: Vec<SearchRecord> = chunk
            .iter()
            .zip(vectors)
            .map(|(content, vector)| SearchRecord::new(content.clone(), vector))
            .collect();

        if let Some(bad) = records
            .iter()
            .find(|r| r.vector.as_slice().len() != embedder.dims())
        {
            bail!(
                "{} returned a {}-wide vector, expected {}",
                embedder.model(),
                bad.vector.as_slice().len(),
                embedder.dims()
            );
        }

        // Rows become visible only once Elasticsearch accepted the batch.
        let mut tx = store.begin().await?;
        for record in &records {
            PgStore::insert(&mut tx, record).await?;
        }
        es.index_batch(&records)
            .await
            .context("indexing failed; batch rolled back")?;
        if let Err(err) = tx.commit().await {
            let ids: Vec<String> = records.iter().map(|r| r.id.to_string()).collect();
            if let Err(cleanup) = es.delete_ids(&ids).await {
                warn!(error = %cleanup, "documents left in {} without rows", es.index());
            }
            return Err(err).context("commit failed after indexing the batch");
        }

        created += records.len();
        progress.inc(records.len() as u64);
    }

    progress.finish_and_clear();
    store.pool().close().await;
    info!(model = embedder.model(), "created {} records", created);
    println!("done.");
    Ok(())
}

pub async fn run_search(args: SearchArgs, settings: &Settings) -> Result<()> {
    let top_k = args.top_k.unwrap_or(settings.config.search.top_k).max(1);
    let embedder = build_embedder(&settings.config.embedding)?;
    let query = embedder.embed_query(&args.query).await?;

    let hits = match args.backend {
        Backend::Elastic => {
            settings
                .elastic()
                .knn_search(query.as_slice(), top_k, settings.config.num_candidates(top_k))
                .await?
        }
        Backend::Postgres => {
            let store = settings.store().await?;
            let hits = store
                .search(query, top_k, settings.threshold)
                .await?;
            store.pool().close().await;
            hits
        }
    };

    let hits = filter_by_threshold(hits, settings.threshold);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        info!("no matches at or above threshold {}", settings.threshold);
    } else {
        for hit in &hits {
            println!("[{:.3}] {}\n{}\n", hit.similarity, hit.id, hit.content);
        }
    }
    Ok(())
}

async fn collect_texts(args: &CreateArgs) -> Result<Vec<String>> {
    let mut texts: Vec<String> = args
        .content
        .iter()
        .filter(|c| !c.trim().is_empty())
        .cloned()
        .collect();

    if let Some(path) = &args.input {
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();
        let mut skipped = 0usize;
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                skipped += 1;
                continue;
            }
            texts.push(line);
        }
        if skipped > 0 {
            debug!("skipped {} blank lines in {}", skipped, path.display());
        }
    }

    Ok(texts)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:30.cyan/dim}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("━╸─"));
    }
    pb.set_message("embedding");
    pb
}
