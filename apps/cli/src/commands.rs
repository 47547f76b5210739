//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use topicpress_core::{Pipeline, ProgressReporter};
use topicpress_crawler::{CrawlReport, EntryPoint};
use topicpress_shared::{
    AppConfig, Document, config_file_path, init_config, load_config, load_config_from,
};
use topicpress_storage::Store;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TopicPress: research a topic on the web and write it up as a blog article.
#[derive(Parser)]
#[command(
    name = "topicpress",
    version,
    about = "Crawl the web for a topic and turn what it finds into a structured blog article.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.topicpress/topicpress.toml).
    #[arg(long, global = true, env = "TOPICPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate and store an article for a topic.
    Generate {
        /// Topic to write about.
        topic: String,

        /// Print the generated document as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// List stored articles.
    List,

    /// Print one stored article as JSON.
    Show {
        /// Document id.
        id: String,
    },

    /// Start the HTTP API.
    Serve {
        /// Address to listen on (overrides `server.bind`).
        #[arg(long, env = "TOPICPRESS_BIND")]
        bind: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topicpress=info",
        1 => "topicpress=debug,tower_http=debug",
        _ => "topicpress=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Generate { topic, json } => {
            cmd_generate(&resolve_config(config_path.as_deref())?, &topic, json).await
        }
        Command::List => cmd_list(&resolve_config(config_path.as_deref())?).await,
        Command::Show { id } => cmd_show(&resolve_config(config_path.as_deref())?, &id).await,
        Command::Serve { bind } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            cmd_serve(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config: &AppConfig, topic: &str, json: bool) -> Result<()> {
    let store = Arc::new(Store::open(&config.storage).await?);
    let pipeline = Pipeline::from_config(config, store)?;

    info!(topic, generator = ?config.generator.mode, "generating article");

    let reporter = CliProgress::new();
    let result = pipeline.generate_with_progress(topic, &reporter).await;
    reporter.spinner.finish_and_clear();
    let doc = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!();
    println!("  Article generated!");
    println!("  ID:      {}", doc.id);
    println!("  Title:   {}", doc.title);
    println!("  Blocks:  {}", doc.content.len());
    println!("  Reading: {} min", doc.reading_time);
    println!("  Stored:  {}", config.storage.path.display());
    println!();

    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let store = Store::open(&config.storage).await?;
    let docs = store.list().await?;

    if docs.is_empty() {
        println!("No articles stored in {}", config.storage.path.display());
        return Ok(());
    }

    println!("{:<36}  {:<10}  {:>4}  TITLE", "ID", "DATE", "MIN");
    for doc in &docs {
        println!("{}", list_row(doc));
    }
    Ok(())
}

fn list_row(doc: &Document) -> String {
    format!(
        "{:<36}  {:<10}  {:>4}  {}",
        doc.id.to_string(),
        doc.date.to_string(),
        doc.reading_time,
        doc.title
    )
}

async fn cmd_show(config: &AppConfig, id: &str) -> Result<()> {
    let store = Store::open(&config.storage).await?;
    let doc = store.get(id).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn cmd_serve(config: &AppConfig) -> Result<()> {
    info!(bind = %config.server.bind, "starting HTTP API");
    topicpress_api::serve(config).await?;
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn crawled(&self, report: &CrawlReport) {
        let source = match report.entry {
            EntryPoint::Primary => "search",
            EntryPoint::Fallback => "encyclopedia",
            EntryPoint::Unreachable => "offline",
        };
        self.spinner.println(format!(
            "  Crawled {} pages via {source}: {} records, {} synthetic",
            report.pages_fetched, report.extracted, report.backfilled
        ));
    }

    fn done(&self, _doc: &Document) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use topicpress_shared::DocumentId;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "topicpress",
            "generate",
            "Renewable Energy",
            "--json",
            "-vv",
            "--config",
            "/tmp/tp.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/tp.toml")));
        match cli.command {
            Command::Generate { topic, json } => {
                assert_eq!(topic, "Renewable Energy");
                assert!(json);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn serve_accepts_bind_override() {
        let cli = Cli::try_parse_from(["topicpress", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:9000"
        ));
    }

    #[test]
    fn list_row_is_aligned() {
        let doc = Document {
            id: DocumentId::new(),
            title: "Tides".into(),
            author: "AI Content Generator".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            summary: String::new(),
            content: Vec::new(),
            featured_image: String::new(),
            tags: Vec::new(),
            reading_time: 3,
            topic: "Tides".into(),
        };
        let row = list_row(&doc);
        assert!(row.starts_with(&doc.id.to_string()));
        assert!(row.contains("2024-05-01"));
        assert!(row.ends_with("   3  Tides"));
    }
}
