//! vectl CLI - semantic search over a pgvector table and an Elasticsearch index
//!
//! Texts are embedded once and stored twice: as rows in the `search` table of
//! the postgres service declared in docker-compose.yml, and as documents in an
//! Elasticsearch dense_vector index. Either copy can serve kNN queries.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use vectl_core::config::{load_dotenv, VectlConfig};
use vectl_embed::{ConnectionArgs, CreateArgs, MigrateArgs, SearchArgs, Settings};

mod commands;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "vectl",
    author,
    version,
    about = "Embed, store and semantically search text with pgvector and Elasticsearch"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Suppress progress spinners and bars (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Debug logging (unless RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List Elasticsearch indices
    Collections,
    /// Embed texts and store them in postgres and Elasticsearch
    Create(CreateArgs),
    /// Count stored rows
    Count,
    /// Find stored texts semantically close to a query
    Search(SearchArgs),
    /// Apply or revert the database schema
    Migrate(MigrateArgs),
    /// Wait for the database to accept queries, using the compose healthcheck
    Health(commands::health::HealthArgs),
    /// Inspect the docker-compose manifest (check, url)
    Compose(commands::compose::ComposeArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads DATABASE_URL / ELASTIC_URL
    let env_files = load_dotenv();
    let cli = Cli::parse();

    if let Err(e) = tracing_setup::init(cli.debug) {
        eprintln!("warning: logging disabled: {e}");
    }
    if env_files.is_empty() {
        debug!("No .env files found (current dir or ~/.vectl)");
    } else {
        let sources: Vec<_> = env_files.iter().map(|p| p.display().to_string()).collect();
        info!("Loaded environment from: {}", sources.join(", "));
    }
    ui::init_quiet_mode(cli.quiet);

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = VectlConfig::load();
    let settings = || Settings::resolve(&cli.connection, config.clone(), !ui::is_quiet());

    match cli.command {
        Commands::Collections => vectl_embed::run_collections(&settings()?).await,
        Commands::Create(args) => vectl_embed::run_create(args, &settings()?).await,
        Commands::Count => vectl_embed::run_count(&settings()?).await,
        Commands::Search(args) => vectl_embed::run_search(args, &settings()?).await,
        Commands::Migrate(args) => vectl_embed::run_migrate(args, &settings()?).await,
        Commands::Health(args) => {
            // --compose also decides where a missing DATABASE_URL is derived from
            let mut config = config.clone();
            if let Some(path) = &args.compose {
                config.database.compose_file = path.clone();
            }
            let settings = Settings::resolve(&cli.connection, config, !ui::is_quiet())?;
            commands::run_health(args, &settings).await
        }
        Commands::Compose(args) => {
            commands::run_compose(args, config.database.compose_file.clone())
        }
        Commands::Completions(args) => run_completions(args),
    }
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
