//! `pipecard` — attach and inspect pipeline step cards from the command line.
//!
//! # Usage
//!
//! ```text
//! pipecard card create acme/widgets 42 2 3 --schema table --data '{"rows":[["ok","12s"]]}'
//! pipecard card create acme/widgets 42 2 3 --schema markdown --data @report.json
//! pipecard card show acme/widgets 42 2 3
//! ```

mod client;

use std::{io::Read as _, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use client::{ApiClient, StepRef};
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pipecard", about = "Pipeline step card client")]
struct Cli {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the pipecard server (default: http://localhost:8080).
  #[arg(long, env = "PIPECARD_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Card operations.
  #[command(subcommand)]
  Card(CardCommand),
}

#[derive(Subcommand, Debug)]
enum CardCommand {
  /// Attach a card to a step.
  Create {
    #[command(flatten)]
    at:     StepArgs,
    /// Schema identifier, e.g. `table`.
    #[arg(long)]
    schema: String,
    /// JSON payload, `@path` to read a file, or `-` for stdin.
    #[arg(long)]
    data:   String,
  },
  /// Print the card attached to a step.
  Show {
    #[command(flatten)]
    at: StepArgs,
  },
}

#[derive(Args, Debug)]
struct StepArgs {
  /// Repository as `namespace/name`.
  repo:  String,
  build: i64,
  stage: isize,
  step:  isize,
}

impl StepArgs {
  fn into_ref(self) -> Result<StepRef> {
    let (namespace, name) = self
      .repo
      .split_once('/')
      .filter(|(ns, n)| !ns.is_empty() && !n.is_empty() && !n.contains('/'))
      .ok_or_else(|| anyhow!("repository must be namespace/name, got {:?}", self.repo))?;
    Ok(StepRef {
      namespace: namespace.to_owned(),
      name:      name.to_owned(),
      build:     self.build,
      stage:     self.stage,
      step:      self.step,
    })
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let file_cfg: ConfigFile = if let Some(path) = &cli.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flag / env override config file, which overrides the default.
  let base_url = cli
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:8080".to_string());
  tracing::debug!(%base_url, "using server");

  let client = ApiClient::new(&base_url)?;

  let card = match cli.command {
    Command::Card(CardCommand::Create { at, schema, data }) => {
      let at = at.into_ref()?;
      let data = read_data(&data)?;
      client.create_card(&at, &schema, &data).await?
    }
    Command::Card(CardCommand::Show { at }) => client.get_card(&at.into_ref()?).await?,
  };

  println!("{}", serde_json::to_string_pretty(&card)?);
  Ok(())
}

/// Resolve the `--data` argument to raw JSON. Only syntax is checked here;
/// the server owns schema validation.
fn read_data(arg: &str) -> Result<Box<RawValue>> {
  let text = if arg == "-" {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("reading card data from stdin")?;
    buf
  } else if let Some(path) = arg.strip_prefix('@') {
    std::fs::read_to_string(path).with_context(|| format!("reading card data from {path}"))?
  } else {
    arg.to_owned()
  };
  RawValue::from_string(text.trim().to_owned()).context("card data is not valid JSON")
}
