//! Deployment manifest commands
//!
//! Commands: check, url

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use vectl_core::{ComposeFile, Severity};

#[derive(Parser, Debug)]
pub struct ComposeArgs {
    #[command(subcommand)]
    pub command: ComposeCommands,
}

#[derive(Subcommand, Debug)]
pub enum ComposeCommands {
    /// Validate the database service declared in the compose manifest
    Check(CheckArgs),
    /// Print the database URL derived from the compose manifest
    Url(UrlArgs),
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the compose manifest (default from config)
    #[arg(long, value_name = "PATH")]
    pub compose: Option<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct UrlArgs {
    /// Path to the compose manifest (default from config)
    #[arg(long, value_name = "PATH")]
    pub compose: Option<PathBuf>,

    /// Host the published port is reached on
    #[arg(long, default_value = "localhost")]
    pub host: String,
}

pub fn run_compose(args: ComposeArgs, default_path: PathBuf) -> Result<()> {
    match args.command {
        ComposeCommands::Check(check) => {
            let path = check.compose.clone().unwrap_or(default_path);
            run_check(&path, check.strict)
        }
        ComposeCommands::Url(url) => {
            let path = url.compose.clone().unwrap_or(default_path);
            run_url(&path, &url.host)
        }
    }
}

fn load(path: &Path) -> Result<ComposeFile> {
    ComposeFile::from_path(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_check(path: &Path, strict: bool) -> Result<()> {
    let compose = load(path)?;
    let findings = compose.validate();

    for finding in &findings {
        println!("{finding}");
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error || strict)
        .count();
    if errors > 0 {
        bail!("{} failed validation with {} problem(s)", path.display(), errors);
    }

    println!("{}: ok ({} warning(s))", path.display(), findings.len());
    Ok(())
}

fn run_url(path: &Path, host: &str) -> Result<()> {
    let url = load(path)?.database_url(host)?;
    println!("{url}");
    Ok(())
}
