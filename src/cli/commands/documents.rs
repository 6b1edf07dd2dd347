//! Listing and removal of indexed documents.

use anyhow::Result;
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Document id as shown by `list`
    #[arg(required = true)]
    pub document_id: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub force: bool,
}

pub async fn handle_list(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (vector_store, _) = super::open_vector_store(&config)?;
    let documents = vector_store.list_indexed_documents()?;

    print!("{}", formatter.format_documents(&documents));
    Ok(())
}

pub async fn handle_delete(args: DeleteArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if !args.force
        && !confirm(&format!(
            "This will delete indexed document '{}'. Continue? [y/N]",
            args.document_id
        ))?
    {
        println!("{}", formatter.format_message("Cancelled."));
        return Ok(());
    }

    let (vector_store, _) = super::open_vector_store(&config)?;
    let deleted = vector_store.delete_document(&args.document_id)?;

    if verbose {
        eprintln!("Removed {deleted} chunks");
    }

    let message = if deleted == 0 {
        format!("No document with id '{}'.", args.document_id)
    } else {
        format!("Deleted document '{}' ({} chunks).", args.document_id, deleted)
    };
    println!("{}", formatter.format_message(&message));

    Ok(())
}

pub async fn handle_clear(force: bool, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if verbose {
        eprintln!("Clearing all indexed documents...");
    }

    if !force && !confirm("This will delete ALL indexed documents. Continue? [y/N]")? {
        println!("{}", formatter.format_message("Cancelled."));
        return Ok(());
    }

    let (vector_store, _) = super::open_vector_store(&config)?;
    let deleted = vector_store.clear_all().await?;

    println!(
        "{}",
        formatter.format_message(&format!(
            "All indexed documents have been cleared ({deleted} chunks)."
        ))
    );

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{prompt}");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
