// ABOUTME: CLI for the pagelens engine: fetch and score articles, build rating prompts, inspect profiles.
// ABOUTME: Also exposes the HTML-to-text cleaner on files or stdin for quick checks.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pagelens::{clean_html, generate_rating_prompt, ArticleContent, Engine, FetchError};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagelens")]
#[command(about = "Extract and score article content from web pages", version)]
struct Cli {
    /// Navigation timeout in seconds
    #[arg(long, global = true, env = "PAGELENS_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// User-Agent sent with requests
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Allow fetching from private/local networks
    #[arg(long, global = true)]
    allow_private_networks: bool,

    /// Page backend
    #[arg(long, global = true, value_enum, default_value_t = Backend::Http)]
    browser: Backend,

    /// Debug logging for pagelens on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one or more articles concurrently and print the results
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print full JSON instead of a one-line summary per URL
        #[arg(long)]
        json: bool,

        /// Compact JSON (with --json)
        #[arg(long)]
        compact: bool,
    },
    /// Print a rating prompt for an article, falling back to a visit-the-URL prompt
    Prompt { url: String },
    /// Print the site profile that would be used for a URL
    Profile { url: String },
    /// Convert HTML from a file (or stdin) to plain text
    Clean { file: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Http,
    Chromium,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,pagelens=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Clean { file } => {
            let html = read_input(file.as_ref())?;
            println!("{}", clean_html(&html));
            Ok(ExitCode::SUCCESS)
        }
        Command::Profile { url } => {
            let engine = build_engine(&cli).await?;
            let profile = engine.registry().resolve(url);
            println!("{}", serde_json::to_string_pretty(profile)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Prompt { url } => {
            let engine = build_engine(&cli).await?;
            let article = match engine.fetch(url).await {
                Ok(article) => Some(article),
                Err(err) => {
                    eprintln!("warning: {err}");
                    None
                }
            };
            println!("{}", generate_rating_prompt(article.as_ref(), url));
            Ok(ExitCode::SUCCESS)
        }
        Command::Fetch { urls, json, compact } => {
            let engine = build_engine(&cli).await?;
            let results =
                futures::future::join_all(urls.iter().map(|url| engine.fetch(url))).await;
            let failed = results.iter().filter(|r| r.is_err()).count();

            if *json {
                let output = fetch_json(&results);
                if *compact {
                    println!("{}", serde_json::to_string(&output)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            } else {
                for result in &results {
                    match result {
                        Ok(article) => println!("{}", summary_line(article)),
                        Err(err) => eprintln!("{}", failure_line(err)),
                    }
                }
            }

            Ok(if failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

async fn build_engine(cli: &Cli) -> Result<Engine> {
    let mut builder = Engine::builder()
        .navigation_timeout(Duration::from_secs(cli.timeout_secs))
        .allow_private_networks(cli.allow_private_networks);
    if let Some(user_agent) = &cli.user_agent {
        builder = builder.user_agent(user_agent);
    }

    if cli.browser == Backend::Chromium {
        let backend = chromium_backend(&builder).await?;
        builder = builder.browser(backend);
    }
    let engine = builder.build().context("failed to build engine")?;
    tracing::debug!(backend = engine.backend_name(), "engine ready");
    Ok(engine)
}

#[cfg(feature = "chromium")]
async fn chromium_backend(builder: &pagelens::EngineBuilder) -> Result<Arc<dyn pagelens::Browser>> {
    let browser = pagelens::ChromiumBrowser::launch(builder.options())
        .await
        .context("failed to launch chromium")?;
    Ok(Arc::new(browser))
}

#[cfg(not(feature = "chromium"))]
async fn chromium_backend(_builder: &pagelens::EngineBuilder) -> Result<Arc<dyn pagelens::Browser>> {
    anyhow::bail!("this build of pagelens has no chromium support (rebuild with --features chromium)")
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn fetch_json(results: &[Result<ArticleContent, FetchError>]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = results
        .iter()
        .map(|result| match result {
            Ok(article) => json!({ "ok": true, "article": article }),
            Err(err) => json!({
                "ok": false,
                "url": err.url,
                "error": err.source.to_string(),
                "classification": err.classification,
            }),
        })
        .collect();
    let failed = entries.iter().filter(|e| e["ok"] == false).count();
    json!({
        "results": entries,
        "total": results.len(),
        "extracted": results.len() - failed,
        "failed": failed,
    })
}

fn summary_line(article: &ArticleContent) -> String {
    format!(
        "{}\t{}\t{}\tquality={:.2}\treliability={:.2}\t{}",
        article.url,
        article.site,
        article.extraction_method,
        article.quality_score,
        article.reliability_score,
        article.title
    )
}

fn failure_line(err: &FetchError) -> String {
    let c = &err.classification;
    format!(
        "error: {}: {} ({}; retry={}, delay={}ms, fallback={})",
        err.url,
        err.source,
        c.kind,
        c.should_retry,
        c.delay.as_millis(),
        c.fallback_strategy
    )
}
