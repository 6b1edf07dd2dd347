//! Index command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;
use walkdir::WalkDir;

use crate::cli::output::{IndexStats, get_formatter};
use crate::models::{Config, IndexingState, OutputFormat};
use crate::services::{DocumentParser, PlainTextParser};

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Text file or directory to index
    #[arg(required = true)]
    pub path: PathBuf,

    #[arg(long, help = "Chunk size in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared by adjacent chunks")]
    pub overlap: Option<u32>,
}

pub async fn handle_index(args: IndexArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let chunk_size = args.chunk_size.unwrap_or(config.indexing.chunk_size) as usize;
    let overlap = args.overlap.unwrap_or(config.indexing.chunk_overlap) as usize;
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be at least 1");
    }
    if overlap >= chunk_size {
        anyhow::bail!("overlap ({overlap}) must be smaller than chunk size ({chunk_size})");
    }

    let path = args.path.canonicalize().context("invalid path")?;
    let parser = PlainTextParser;
    let files = collect_files(&path, &parser)?;

    if files.is_empty() {
        println!("{}", formatter.format_message("No text files found to index."));
        return Ok(());
    }

    if verbose {
        eprintln!("Found {} files to process", files.len());
    }

    let (vector_store, _) = super::open_vector_store(&config)?;

    let mut stats = IndexStats {
        files_scanned: files.len() as u64,
        ..Default::default()
    };

    for file_path in &files {
        let document = match parser.parse(file_path) {
            Ok(document) => document,
            Err(e) => {
                if verbose {
                    eprintln!("Skipping {}: {}", file_path.display(), e);
                }
                stats.files_skipped += 1;
                continue;
            }
        };

        if document.content.trim().is_empty() {
            stats.files_skipped += 1;
            continue;
        }

        let pb = progress_bar(&document.file_name, format);
        let watcher = tokio::spawn(track_progress(vector_store.subscribe(), pb.clone()));

        let result = vector_store
            .index_document(document, chunk_size, overlap)
            .await;
        let _ = watcher.await;
        pb.finish_and_clear();

        let count = result.with_context(|| format!("failed to index {}", file_path.display()))?;
        stats.files_indexed += 1;
        stats.chunks_created += count as u64;
    }

    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    print!("{}", formatter.format_index_stats(&stats));

    Ok(())
}

fn progress_bar(file_name: &str, format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} chunks")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(file_name.to_string());
    pb
}

/// Mirror indexing state transitions onto `pb` until indexing ends.
///
/// `rx` must be subscribed before indexing starts.
async fn track_progress(mut rx: watch::Receiver<IndexingState>, pb: ProgressBar) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            IndexingState::Indexing {
                current_chunk,
                total_chunks,
                ..
            } => {
                pb.set_length(total_chunks as u64);
                pb.set_position(current_chunk as u64);
            }
            IndexingState::Complete { chunks_indexed } => {
                pb.set_length(chunks_indexed as u64);
                pb.set_position(chunks_indexed as u64);
                break;
            }
            IndexingState::Error { .. } => break,
            IndexingState::Idle => {}
        }
    }
}

/// Supported files under `path`, or `path` itself when it is a file.
fn collect_files(path: &Path, parser: &dyn DocumentParser) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if !parser.supports(path) {
            anyhow::bail!("unsupported file type: {}", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.context("failed to read directory entry")?;
        let entry_path = entry.path();
        if entry_path.is_file() && parser.supports(entry_path) {
            files.push(entry_path.to_path_buf());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_filters_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Water").unwrap();
        std::fs::write(dir.path().join("a.txt"), "Shelter").unwrap();
        std::fs::write(dir.path().join("photo.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "Fire").unwrap();

        let files = collect_files(dir.path(), &PlainTextParser).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.md", "c.txt"]);
    }

    #[tokio::test]
    async fn test_progress_bar_reaches_total_for_short_document() {
        use std::sync::Arc;

        use crate::models::ParsedDocument;
        use crate::services::{EmbeddingGenerator, SqliteChunkStore, VectorStore};

        let vector_store = VectorStore::new(
            Arc::new(EmbeddingGenerator::fallback(32)),
            Arc::new(SqliteChunkStore::open_in_memory().unwrap()),
        );
        let pb = ProgressBar::hidden();
        let watcher = tokio::spawn(track_progress(vector_store.subscribe(), pb.clone()));

        let count = vector_store
            .index_document(ParsedDocument::new("Boil water before drinking.", "water.txt"), 100, 10)
            .await
            .unwrap();
        assert_eq!(count, 1);

        tokio::time::timeout(std::time::Duration::from_secs(5), watcher)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pb.length(), Some(1));
        assert_eq!(pb.position(), 1);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Notes").unwrap();
        assert_eq!(collect_files(&path, &PlainTextParser).unwrap(), vec![path]);

        let binary = dir.path().join("archive.zip");
        std::fs::write(&binary, [0u8]).unwrap();
        assert!(collect_files(&binary, &PlainTextParser).is_err());
    }
}
