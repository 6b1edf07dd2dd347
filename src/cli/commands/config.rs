use anyhow::{Context, Result};
use clap::Subcommand;
use std::process::Command;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with default values")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration and data paths")]
    Path,
    #[command(about = "Edit configuration file")]
    Edit,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(format),
        ConfigCommand::Edit => handle_edit(formatter.as_ref()),
    }
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))
}

fn handle_init(force: bool, formatter: &dyn Formatter) -> Result<()> {
    let path = config_path()?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save()
        .context("failed to write config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match Config::config_path() {
        Some(path) if path.exists() => println!("# Config: {}", path.display()),
        _ => println!("# Config: defaults (no config file)"),
    }
    println!("# Database: {}", config.database_path()?.display());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let config_file = config_path()?;
    let database = config.database_path()?;
    let model = config.embedding.resolved_model_path();
    let tokenizer = config.embedding.resolved_tokenizer_path();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config_file,
            "database": database,
            "model": model,
            "tokenizer": tokenizer,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let state = |exists: bool| if exists { "active" } else { "would be" };
    println!("Configuration paths:");
    println!();
    println!(
        "Config file ({}): {}",
        state(config_file.exists()),
        config_file.display()
    );
    println!(
        "Database ({}): {}",
        state(database.exists()),
        database.display()
    );
    if let Some(path) = model {
        println!("Model ({}): {}", state(path.exists()), path.display());
    }
    if let Some(path) = tokenizer {
        println!("Tokenizer ({}): {}", state(path.exists()), path.display());
    }
    Ok(())
}

fn handle_edit(formatter: &dyn Formatter) -> Result<()> {
    let path = config_path()?;
    if !path.exists() {
        Config::default()
            .save()
            .context("failed to write config")?;
        println!(
            "{}",
            formatter.format_message(&format!("Created config at: {}", path.display()))
        );
    }

    let editor = std::env::var("EDITOR")
        .unwrap_or_else(|_| std::env::var("VISUAL").unwrap_or_else(|_| "vim".into()));

    Command::new(&editor)
        .arg(&path)
        .status()
        .context(format!("failed to open editor: {}", editor))?;

    Ok(())
}
