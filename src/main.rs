use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use condition_parser::scanner::Scanner;
use condition_parser::{ConditionEngine, Diagnostic, EngineConfig, LiteralValue, ParserOptions, PropertyBag, SourceLocation};

/// Evaluate a build-file condition and print `true` or `false`.
#[derive(Parser, Debug)]
#[command(name = "condition_parser", version)]
struct Cli {
    /// The condition, e.g. "'$(Configuration)' == 'Debug'".
    condition: String,

    /// Set a property (repeatable).
    #[arg(short = 'p', long = "property", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    properties: Vec<(String, String)>,

    /// Set the includes of an item type, separated by ';' (repeatable).
    #[arg(short = 'i', long = "item", value_name = "NAME=A;B", value_parser = parse_assignment)]
    items: Vec<(String, String)>,

    /// JSON file with "properties", "items" and "metadata".
    #[arg(long)]
    context: Option<PathBuf>,

    /// JSON engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reject item list and item metadata references.
    #[arg(long)]
    properties_only: bool,

    /// Nesting limit (1-64).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the tokens of the condition before evaluating it.
    #[arg(long)]
    tokens: bool,

    /// Print the parsed tree before evaluating it.
    #[arg(long)]
    tree: bool,
}

/// Build state read from `--context`. Metadata keys are `Item.Name` or `Name`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ContextFile {
    properties: HashMap<String, String>,
    items: HashMap<String, Vec<String>>,
    metadata: HashMap<String, String>,
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got \"{}\"", arg)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<Diagnostic>() {
                Some(diagnostic) => {
                    if diagnostic.print().is_err() {
                        eprintln!("{}", diagnostic);
                    }
                }
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let engine = ConditionEngine::new(engine_config(cli)?)?;
    let context = build_context(cli, &engine)?;
    let location = SourceLocation::default();

    if cli.tokens {
        let tokens = Scanner::tokenize(&cli.condition, engine.config().options)
            .map_err(|e| e.with_source(&cli.condition, &location))?;
        for token in tokens {
            println!("{}", token);
        }
    }
    if cli.tree && !cli.condition.is_empty() {
        println!("{}", engine.parse(&cli.condition, &location)?);
    }

    Ok(engine.evaluate(&cli.condition, &location, &context)?)
}

fn engine_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    if cli.properties_only {
        config.options = ParserOptions::AllowProperties;
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    Ok(config)
}

fn build_context(cli: &Cli, engine: &ConditionEngine) -> anyhow::Result<PropertyBag> {
    let mut bag = PropertyBag::with_functions(engine.functions()?);
    bag.functions_mut().register("Exists", 1, |args| {
        let path = args[0].as_text();
        Ok(LiteralValue::Bool(!path.trim().is_empty() && Path::new(path.trim()).exists()))
    });

    if let Some(path) = &cli.context {
        let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read context {}", path.display()))?;
        let file: ContextFile = serde_json::from_str(&json).with_context(|| format!("Failed to parse context {}", path.display()))?;
        for (name, value) in &file.properties {
            bag.set_property(name, value.as_str());
        }
        for (name, includes) in &file.items {
            for include in includes {
                bag.add_item(name, include.as_str());
            }
        }
        for (key, value) in &file.metadata {
            let (item, metadata) = key.split_once('.').unwrap_or(("", key.as_str()));
            bag.set_metadata(item, metadata, value.as_str());
        }
    }

    for (name, value) in &cli.properties {
        bag.set_property(name, value.as_str());
    }
    for (name, includes) in &cli.items {
        for include in includes.split(';').filter(|include| !include.is_empty()) {
            bag.add_item(name, include);
        }
    }
    Ok(bag)
}
