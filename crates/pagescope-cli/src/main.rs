use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pagescope_client::{
    DEFAULT_MAX_PAGE_BYTES, HttpRenderer, InferenceConfig, OpenAiSchemaInferrer, ReqwestFetcher,
};
use pagescope_core::config::{CoverageConfig, PagescopeConfig, ProbeConfig};
use pagescope_core::inference::DEFAULT_MAX_ATTEMPTS;
use pagescope_core::service::DEFAULT_BLOCK_LIMIT;
use pagescope_core::traits::PageRenderer;
use pagescope_core::{
    BlockScorer, CoverageValidator, EndpointCategory, EndpointClassifier, Schema, extract_records,
    infer_schema, validate_target_url,
};

#[derive(Parser)]
#[command(
    name = "pagescope",
    version,
    about = "Classify how a web endpoint behaves before scraping it"
)]
struct Cli {
    /// Render pages with headless Chromium instead of plain HTTP
    #[arg(long, global = true)]
    browser: bool,

    /// Navigation timeout in seconds
    #[arg(long, global = true, env = "PAGESCOPE_NAV_TIMEOUT", default_value_t = 30)]
    nav_timeout: u64,

    /// Settling delay after scrolling, in milliseconds
    #[arg(long, global = true, env = "PAGESCOPE_SCROLL_WAIT_MS", default_value_t = 2000)]
    scroll_wait_ms: u64,

    /// Pages larger than this are truncated before analysis
    #[arg(long, global = true, env = "PAGESCOPE_MAX_PAGE_BYTES", default_value_t = DEFAULT_MAX_PAGE_BYTES)]
    max_page_bytes: usize,

    /// Longest wait for a rendered page to stop changing, in milliseconds (browser only)
    #[arg(long, global = true, env = "PAGESCOPE_SETTLE_MS", default_value_t = 5000)]
    settle_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the scraping behaviour of an endpoint
    Classify {
        /// Target URL
        #[arg(short, long)]
        url: String,
    },

    /// Rank the content blocks most likely to hold the page's data entities
    Blocks {
        /// Target URL (rendered before scoring)
        #[arg(short, long, required_unless_present = "html", conflicts_with = "html")]
        url: Option<String>,

        /// Score a saved HTML file instead of fetching
        #[arg(long)]
        html: Option<PathBuf>,

        /// Maximum number of blocks to return
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_LIMIT)]
        limit: usize,
    },

    /// Check how well an extraction schema covers a saved page
    Validate {
        /// Path to the schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the HTML file
        #[arg(long)]
        html: PathBuf,

        /// Endpoint category, selects the coverage threshold
        #[arg(short, long, default_value = "default")]
        category: EndpointCategory,
    },

    /// Apply a schema to a page and print the extracted records
    Extract {
        /// Path to the schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Target URL (fetched without rendering)
        #[arg(short, long, required_unless_present = "html", conflicts_with = "html")]
        url: Option<String>,

        /// Extract from a saved HTML file instead of fetching
        #[arg(long)]
        html: Option<PathBuf>,

        /// Base URL for resolving relative links in `url` fields
        #[arg(long, conflicts_with = "url")]
        base_url: Option<String>,
    },

    /// Classify, rank blocks and ask a model for an extraction schema
    Infer {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// Model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
        #[arg(short, long, env = "PAGESCOPE_MODEL")]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(
            short,
            long,
            env = "PAGESCOPE_BASE_URL",
            default_value = "https://api.openai.com/v1"
        )]
        base_url: String,

        /// API key (reads from PAGESCOPE_API_KEY if not provided)
        #[arg(short, long, env = "PAGESCOPE_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Inference attempts before settling for the best proposal
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        attempts: usize,

        /// Content blocks included in the prompt
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // stdout carries JSON only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagescope=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = PagescopeConfig {
        probe: ProbeConfig::default()
            .with_navigation_timeout(Duration::from_secs(cli.nav_timeout))
            .with_scroll_dwell(Duration::from_millis(cli.scroll_wait_ms)),
        ..Default::default()
    };

    match cli.command {
        Commands::Validate {
            schema,
            html,
            category,
        } => cmd_validate(&schema, &html, category, config.coverage),
        Commands::Blocks {
            html: Some(path),
            limit,
            ..
        } => cmd_blocks_file(&path, limit, &config),
        Commands::Extract {
            schema,
            url,
            html,
            base_url,
        } => {
            let fetcher = http_fetcher(cli.max_page_bytes)?;
            cmd_extract(&schema, url, html, base_url, &fetcher).await
        }
        command => {
            let fetcher = http_fetcher(cli.max_page_bytes)?;
            if cli.browser {
                let settle = Duration::from_millis(cli.settle_ms);
                run_with_browser(command, fetcher, config, settle, cli.max_page_bytes).await
            } else {
                let renderer = HttpRenderer::new(fetcher.clone());
                let coverage = config.coverage.clone();
                run_online(command, EndpointClassifier::new(fetcher, renderer, config), coverage)
                    .await
            }
        }
    }
}

#[cfg(feature = "browser")]
async fn run_with_browser(
    command: Commands,
    fetcher: ReqwestFetcher,
    config: PagescopeConfig,
    settle: Duration,
    max_page_bytes: usize,
) -> Result<()> {
    let renderer = pagescope_client::ChromiumRenderer::launch()
        .await
        .context("Failed to launch headless browser")?
        .with_settle(pagescope_client::SettlePolicy {
            max_wait: settle,
            ..Default::default()
        })
        .with_max_page_bytes(max_page_bytes);
    let coverage = config.coverage.clone();
    run_online(command, EndpointClassifier::new(fetcher, renderer, config), coverage).await
}

#[cfg(not(feature = "browser"))]
async fn run_with_browser(
    _command: Commands,
    _fetcher: ReqwestFetcher,
    _config: PagescopeConfig,
    _settle: Duration,
    _max_page_bytes: usize,
) -> Result<()> {
    anyhow::bail!("--browser requires pagescope to be built with the `browser` feature")
}

fn http_fetcher(max_page_bytes: usize) -> Result<ReqwestFetcher> {
    Ok(ReqwestFetcher::new()
        .context("Failed to create HTTP client")?
        .with_max_page_bytes(max_page_bytes))
}

/// Commands that fetch and render the target URL.
async fn run_online<R: PageRenderer>(
    command: Commands,
    classifier: EndpointClassifier<ReqwestFetcher, R>,
    coverage: CoverageConfig,
) -> Result<()> {
    match command {
        Commands::Classify { url } => {
            let classification = classifier.classify(&url).await?;
            print_json(&classification)
        }
        Commands::Blocks {
            url: Some(url),
            limit,
            ..
        } => {
            let analysis = classifier.analyze(&url, limit).await?;
            tracing::info!(
                category = %analysis.classification.category,
                blocks = analysis.blocks.len(),
                "Blocks ready"
            );
            print_json(&analysis.fragments())
        }
        Commands::Infer {
            url,
            model,
            base_url,
            api_key,
            attempts,
            limit,
        } => {
            let inferrer = OpenAiSchemaInferrer::new(
                InferenceConfig::new(&api_key, &model).with_base_url(&base_url),
            )
            .context("Failed to create inference client")?;

            let analysis = classifier.analyze(&url, limit).await?;
            let category = analysis.classification.category;
            let fragments = analysis.fragments();
            if fragments.is_empty() {
                anyhow::bail!("No content blocks found on {url}; nothing to infer a schema from");
            }

            tracing::info!(%category, blocks = fragments.len(), %model, "Inferring schema");
            let inferred = infer_schema(
                &inferrer,
                &CoverageValidator::new(coverage),
                category,
                &fragments,
                &analysis.markup,
                attempts,
            )
            .await
            .context("Schema inference failed")?;

            print_json(&serde_json::json!({
                "classification": analysis.classification,
                "schema": inferred.schema,
                "verdict": inferred.verdict,
                "attempts": inferred.attempts,
            }))
        }
        Commands::Validate { .. }
        | Commands::Extract { .. }
        | Commands::Blocks { url: None, .. } => {
            anyhow::bail!("command does not take a URL")
        }
    }
}

fn cmd_validate(
    schema_path: &Path,
    html_path: &Path,
    category: EndpointCategory,
    coverage: CoverageConfig,
) -> Result<()> {
    let schema = Schema::load(schema_path)?;
    let html = read_html(html_path)?;

    let verdict = CoverageValidator::new(coverage).validate(&schema, &html, category)?;
    tracing::info!(
        valid = verdict.valid,
        confidence = verdict.confidence,
        containers = verdict.containers_found,
        "Schema validated"
    );
    print_json(&verdict)
}

async fn cmd_extract(
    schema_path: &Path,
    url: Option<String>,
    html_path: Option<PathBuf>,
    base_url: Option<String>,
    fetcher: &ReqwestFetcher,
) -> Result<()> {
    let schema = Schema::load(schema_path)?;
    let (html, base_url) = match (url, html_path) {
        (Some(url), _) => {
            let url = validate_target_url(&url)?;
            let (html, resolved) = fetcher
                .fetch_resolved(&url)
                .await
                .with_context(|| format!("Failed to fetch {url}"))?;
            (html, Some(resolved))
        }
        (None, Some(path)) => (read_html(&path)?, base_url),
        (None, None) => anyhow::bail!("either --url or --html is required"),
    };

    let records = extract_records(&schema, &html, base_url.as_deref())?;
    tracing::info!(entity = %schema.entity, records = records.len(), "Records extracted");
    print_json(&records)
}

fn cmd_blocks_file(path: &Path, limit: usize, config: &PagescopeConfig) -> Result<()> {
    let html = read_html(path)?;
    let fragments = BlockScorer::new(config.scorer.clone()).extract_fragments(&html, limit);
    tracing::info!(blocks = fragments.len(), "Blocks ready");
    print_json(&fragments)
}

fn read_html(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file: {}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
