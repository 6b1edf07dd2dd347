use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SearchResults};
use crate::services::build_context;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long = "top-k", short = 'n', help = "Maximum number of results to return")]
    pub top_k: Option<u32>,

    #[arg(long, help = "Minimum cosine similarity (-1.0 to 1.0)")]
    pub threshold: Option<f32>,

    #[arg(long, short = 'd', help = "Only search chunks of this document id")]
    pub document: Option<String>,
}

#[derive(Debug, Args)]
pub struct ContextArgs {
    #[arg(required = true, help = "Question or query text")]
    pub query: String,

    #[arg(long = "top-k", short = 'n', help = "Maximum number of chunks to consider")]
    pub top_k: Option<u32>,

    #[arg(long, help = "Maximum context length in characters")]
    pub max_length: Option<u32>,
}

fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }
    Ok(query)
}

fn validate_top_k(top_k: u32) -> Result<usize> {
    if top_k == 0 {
        anyhow::bail!("top-k must be at least 1");
    }
    Ok(top_k as usize)
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = validate_query(&args.query)?;
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let top_k = validate_top_k(args.top_k.unwrap_or(config.search.top_k))?;
    let threshold = args.threshold.unwrap_or(config.search.similarity_threshold);
    if !(-1.0..=1.0).contains(&threshold) {
        anyhow::bail!("threshold must be between -1.0 and 1.0");
    }

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Top-k: {top_k}");
        match args.document {
            Some(ref document_id) => eprintln!("  Document: {document_id}"),
            None => eprintln!("  Threshold: {threshold:.3}"),
        }
    }

    let (vector_store, _) = super::open_vector_store(&config)?;
    let results = match args.document {
        Some(ref document_id) => vector_store
            .try_search_in_document(document_id, query, top_k)
            .await
            .context("search failed")?,
        None => vector_store
            .try_search(query, top_k, threshold)
            .await
            .context("search failed")?,
    };

    let duration_ms = start_time.elapsed().as_millis() as u64;
    if verbose {
        eprintln!(
            "Embeddings: {} ({})",
            vector_store.embedder().mode(),
            vector_store.embedder().backend_name()
        );
        eprintln!("Total: {duration_ms}ms");
        eprintln!();
    }

    let search_results = SearchResults::new(query.to_string(), results, duration_ms);
    print!("{}", formatter.format_search_results(&search_results));

    Ok(())
}

pub async fn handle_context(args: ContextArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = validate_query(&args.query)?;
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let top_k = validate_top_k(args.top_k.unwrap_or(config.search.top_k))?;
    let max_length = args
        .max_length
        .unwrap_or(config.search.max_context_length) as usize;
    let threshold = config.search.similarity_threshold;

    let (vector_store, _) = super::open_vector_store(&config)?;
    let results = vector_store
        .try_search(query, top_k, threshold)
        .await
        .context("search failed")?;

    if verbose {
        eprintln!(
            "{} chunks above {:.2} similarity, budget {} chars",
            results.len(),
            threshold,
            max_length
        );
    }

    let context = build_context(&results, max_length);
    print!("{}", formatter.format_context(query, &context));

    Ok(())
}
