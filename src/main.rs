use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use listing_search::{
    CriteriaExtractor, EmbeddingsProvider, HybridSearch, LlmCriteriaExtractor, LlmEmbedder,
    MemoryListingStore, NO_RESULTS_MESSAGE, NoopEmbedder, RelevanceTier, SearchConfig,
    StubEmbedder, embed::stub_embedder::DEFAULT_STUB_DIM, ingest,
};
use llm_provider::{EmbeddingBackend, LlmServiceProfiles, config_chat, config_embedding};
use tracing::{error, info};

mod demo;
mod telemetry;

/// Hybrid filter + semantic search over real-estate listings.
#[derive(Debug, Parser)]
#[command(name = "estate-search", version, about)]
struct Cli {
    /// Rank every listing by similarity to TEXT.
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["stats", "populate", "serve"])]
    search: Option<String>,

    /// Print listing counts for the snapshot.
    #[arg(long, conflicts_with_all = ["populate", "serve"])]
    stats: bool,

    /// Embed raw scraped listings and write the snapshot.
    #[arg(long, value_name = "RAW_JSONL", conflicts_with = "serve")]
    populate: Option<PathBuf>,

    /// Snapshot written by --populate (defaults to the listings path).
    #[arg(long, value_name = "PATH", requires = "populate")]
    out: Option<PathBuf>,

    /// Run the HTTP API.
    #[arg(long)]
    serve: bool,

    /// Listing snapshot to load (overrides LISTINGS_PATH).
    #[arg(long, value_name = "PATH")]
    listings: Option<PathBuf>,

    /// Number of results (overrides SEARCH_DEFAULT_LIMIT).
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; everything has defaults or comes from the shell.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = telemetry::init(cli.verbose) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "estate-search failed");
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Embedder chosen by `EMBEDDING_PROVIDER`, plus the shared LLM profiles.
struct Providers {
    embedder: Arc<dyn EmbeddingsProvider>,
    llm: Arc<LlmServiceProfiles>,
}

fn providers(cfg: &SearchConfig) -> anyhow::Result<Providers> {
    let backend = config_embedding().context("invalid embedding provider configuration")?;
    let chat = config_chat().context("invalid chat provider configuration")?;

    let embedding_profile = match &backend {
        EmbeddingBackend::Llm(p) => Some(p.clone()),
        EmbeddingBackend::Stub | EmbeddingBackend::Disabled => None,
    };
    let llm = Arc::new(
        LlmServiceProfiles::new(embedding_profile, chat, Some(5))
            .context("failed to build LLM clients")?,
    );

    let embedder: Arc<dyn EmbeddingsProvider> = match backend {
        EmbeddingBackend::Llm(_) => Arc::new(LlmEmbedder::new(llm.clone(), cfg.embedding_dim)),
        EmbeddingBackend::Stub => Arc::new(StubEmbedder::new(
            cfg.embedding_dim.unwrap_or(DEFAULT_STUB_DIM),
        )),
        EmbeddingBackend::Disabled => Arc::new(NoopEmbedder),
    };
    info!(provider = embedder.name(), chat = llm.has_chat(), "providers configured");
    Ok(Providers { embedder, llm })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = SearchConfig::from_env().context("invalid search configuration")?;
    if let Some(path) = cli.listings.clone() {
        cfg.listings_path = path;
    }
    if let Some(limit) = cli.limit {
        if limit == 0 {
            bail!("--limit must be greater than 0");
        }
        cfg.default_limit = limit;
    }
    let Providers { embedder, llm } = providers(&cfg)?;

    if let Some(raw) = &cli.populate {
        let out = cli.out.clone().unwrap_or_else(|| cfg.listings_path.clone());
        let report = ingest::populate(raw, &out, embedder.as_ref(), &cfg)
            .await
            .with_context(|| format!("populate from {} failed", raw.display()))?;
        println!(
            "{} {} listings written to {} ({} embedded, {} reused, {} duplicates, {} skipped)",
            "✔".green(),
            report.written,
            out.display(),
            report.embedded,
            report.reused,
            report.duplicates,
            report.skipped_empty + report.skipped_invalid,
        );
        return Ok(());
    }

    let store = if cfg.listings_path.exists() {
        MemoryListingStore::from_jsonl(&cfg.listings_path, cfg.embedding_dim, &cfg.link_base)
            .with_context(|| format!("failed to load {}", cfg.listings_path.display()))?
    } else if cli.search.is_none() && !cli.stats && !cli.serve {
        info!(
            path = %cfg.listings_path.display(),
            "snapshot not found, using the bundled sample"
        );
        demo::sample_store(embedder.as_ref(), &cfg).await?
    } else {
        bail!(
            "listing snapshot {} not found; create it with --populate",
            cfg.listings_path.display()
        );
    };

    let limit = cfg.default_limit;
    let search = Arc::new(HybridSearch::new(Arc::new(store), embedder, cfg));

    if let Some(text) = &cli.search {
        return print_semantic(&search, text, limit).await;
    }
    if cli.stats {
        print_stats(&search);
        return Ok(());
    }
    if cli.serve {
        let extractor: Option<Arc<dyn CriteriaExtractor>> = llm
            .has_chat()
            .then(|| Arc::new(LlmCriteriaExtractor::new(llm.clone())) as _);
        let state = Arc::new(api::core::app_state::AppState::new(search, llm, extractor));
        return api::start(state).await.context("HTTP server failed");
    }
    demo::run(&search).await
}

async fn print_semantic(search: &HybridSearch, text: &str, limit: usize) -> anyhow::Result<()> {
    let hits = search
        .semantic_only(text, limit)
        .await
        .context("semantic search failed")?;
    if hits.is_empty() {
        println!("{NO_RESULTS_MESSAGE}");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        let score = hit.score.map(|s| format!("{s:.3}")).unwrap_or_else(|| "-".into());
        let score = match hit.tier {
            Some(RelevanceTier::High) => score.green(),
            Some(RelevanceTier::Medium) => score.yellow(),
            Some(RelevanceTier::Low) => score.red(),
            None => score.normal(),
        };
        println!("{:>2}. {} [{}]", i + 1, hit.listing.title.bold(), score);
        println!("    {}", hit.listing.link.dimmed());
    }
    Ok(())
}

fn print_stats(search: &HybridSearch) {
    let s = search.stats();
    println!("{}", "Listing snapshot".bold());
    println!("  total:     {}", s.total);
    println!("  rent:      {}", s.rent);
    println!("  sale:      {}", s.sale);
    match s.embedding_dim {
        Some(d) => println!("  embedding: {d} dims ({})", search.config().distance),
        None => println!("  embedding: {}", "none (filter-only)".yellow()),
    }
    println!("  by city:");
    for (city, n) in &s.by_city {
        println!("    {city:<16} {n}");
    }
}
