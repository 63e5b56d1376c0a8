//! LTR CLI - Resolve learning-to-rank configs from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ltr_core::{LtrConfig, LtrError, TemplateParams};
use ltr_service::LearnToRankService;
use ltr_store::MemoryModelStore;
use ltr_template::MustacheEngine;

/// LTR - Resolve templated ranking configs of learning-to-rank models
#[derive(Parser)]
#[command(name = "ltr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/ltr/config.toml, then ./ltr.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model records file (overrides the configured path)
    #[arg(short, long, global = true)]
    models: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a model's ranking config with template params
    Resolve {
        /// Model id
        model_id: String,

        /// Template param as key=value (value parsed as JSON when possible)
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,

        /// JSON file holding an object of template params
        #[arg(long)]
        params_file: Option<PathBuf>,
    },

    /// List stored models
    Models,
}

/// Parse a `key=value` template param.
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got [{}]", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty param name in [{}]", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_params(
    params_file: Option<&Path>,
    params: Vec<(String, Value)>,
) -> Result<TemplateParams, LtrError> {
    let mut merged = match params_file {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<TemplateParams>(&content)?
        }
        None => TemplateParams::new(),
    };

    // Command line params win over the file
    merged.extend(params);
    Ok(merged)
}

fn setup_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn load_config(path: Option<&Path>) -> Result<LtrConfig, LtrError> {
    match path {
        Some(path) => LtrConfig::load(path),
        None => LtrConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    setup_logging(cli.verbose, &config.logging.level);

    let models_path = cli.models.unwrap_or_else(|| config.store.models_path.clone());
    debug!("Using model records from {:?}", models_path);

    let store = match MemoryModelStore::open(&models_path) {
        Ok(store) => Arc::new(store),
        Err(e) => exit_with(&e),
    };

    match cli.command {
        Commands::Resolve {
            model_id,
            params,
            params_file,
        } => {
            let params = match load_params(params_file.as_deref(), params) {
                Ok(params) => params,
                Err(e) => exit_with(&e),
            };

            let service = LearnToRankService::with_settings(
                store.clone(),
                store,
                Arc::new(MustacheEngine::new()),
                &config.template,
            );

            match service.resolve_config(&model_id, &params).await {
                Ok(resolved) => println!("{}", serde_json::to_string_pretty(&resolved)?),
                Err(e) => exit_with(&e),
            }
        }
        Commands::Models => {
            let records = match store.list() {
                Ok(records) => records,
                Err(e) => exit_with(&e),
            };

            if records.is_empty() {
                println!("No models found in: {}", models_path.display());
            }
            for record in records {
                println!("{}\t{}", record.model_id, record.inference_config_name());
            }
        }
    }

    Ok(())
}

fn exit_with(err: &LtrError) -> ! {
    eprintln!("Error [{}]: {}", err.error_code(), err);
    std::process::exit(1);
}
