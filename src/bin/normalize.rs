//! Schema Normalizer CLI
//!
//! Normalizes JSON records with a schema file or a schema registered through
//! configuration. Records are read from a file or stdin; results go to stdout
//! unless an output file is given.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schema_normalizer::{
    DiagnosticEvent, MemoryDiagnostics, NormalizerConfig, SchemaRegistry, SchemaTransformer,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-normalize")]
#[command(about = "Normalize records into the shape declared by a schema")]
struct Cli {
    /// Configuration file (defaults to normalizer.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform records and print the normalized output
    Transform {
        /// Schema file, or the name of a schema registered in configuration
        #[arg(short, long)]
        schema: String,
        /// Input file with a JSON record, a JSON array, or JSON lines (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reject records missing required fields
        #[arg(long)]
        strict: bool,
        /// Skip rejected records instead of stopping at the first one
        #[arg(long)]
        keep_going: bool,
        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Check that every record passes validation
    Validate {
        #[arg(short, long)]
        schema: String,
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List the fields a schema produces
    Fields {
        #[arg(short, long)]
        schema: String,
    },

    /// List schemas registered through configuration
    Schemas,
}

fn main() {
    let cli = Cli::parse();

    let config = match NormalizerConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &NormalizerConfig) -> anyhow::Result<()> {
    let registry = SchemaRegistry::from_config(config).context("failed to build schema registry")?;

    match command {
        Commands::Transform {
            schema,
            input,
            output,
            strict,
            keep_going,
            compact,
        } => {
            let diagnostics = Arc::new(MemoryDiagnostics::new());
            let transformer = load_transformer(&registry, config, &schema, strict)?
                .with_diagnostics(diagnostics.clone());
            let data = read_records(input.as_deref())?;

            let (result, events) = transform_records(&transformer, &data, keep_going, &diagnostics);
            report_diagnostics(&events);
            let result = result?;

            let rendered = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("✅ Output written to {}", path.display());
                }
                None => println!("{}", rendered),
            }
            Ok(())
        }

        Commands::Validate { schema, input } => {
            let transformer = load_transformer(&registry, config, &schema, true)?;
            let data = read_records(input.as_deref())?;
            let records: Vec<&Value> = match &data {
                Value::Array(records) => records.iter().collect(),
                single => vec![single],
            };

            let mut invalid = 0;
            for (index, result) in transformer.transform_each(records).into_iter().enumerate() {
                if let Err(e) = result {
                    invalid += 1;
                    eprintln!("❌ record {}: {}", index, e);
                }
            }

            if invalid > 0 {
                bail!("{} record(s) failed validation", invalid);
            }
            eprintln!("✅ All records valid");
            Ok(())
        }

        Commands::Fields { schema } => {
            let transformer = load_transformer(&registry, config, &schema, false)?;
            let required = transformer.required_fields();
            for (name, spec) in transformer.schema().properties.iter() {
                let marker = if required.iter().any(|r| r == name) { " (required)" } else { "" };
                println!("{}: {}{}", name, spec.field_type(), marker);
            }
            Ok(())
        }

        Commands::Schemas => {
            if registry.is_empty() {
                eprintln!("No schemas registered");
            }
            for name in registry.list_schemas() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

/// Resolve `schema` as a registered name first, then as a file path
fn load_transformer(
    registry: &SchemaRegistry,
    config: &NormalizerConfig,
    schema: &str,
    strict: bool,
) -> anyhow::Result<SchemaTransformer> {
    if let Some(registered) = registry.get(schema) {
        return Ok(SchemaTransformer::new(
            registered.schema().clone(),
            strict || registered.is_strict(),
        ));
    }

    SchemaTransformer::from_file(schema, strict || config.transform.strict)
        .with_context(|| format!("failed to load schema '{}'", schema))
}

/// Transform `data`, returning the diagnostics collected even when the
/// batch fails
fn transform_records(
    transformer: &SchemaTransformer,
    data: &Value,
    keep_going: bool,
    diagnostics: &MemoryDiagnostics,
) -> (anyhow::Result<Value>, Vec<DiagnosticEvent>) {
    let result = if keep_going {
        Ok(transform_keep_going(transformer, data))
    } else {
        transformer.transform(data).map_err(anyhow::Error::from)
    };
    (result, diagnostics.drain())
}

fn transform_keep_going(transformer: &SchemaTransformer, data: &Value) -> Value {
    let records: Vec<&Value> = match data {
        Value::Array(records) => records.iter().collect(),
        single => vec![single],
    };

    let mut rejected = 0;
    let mut out = Vec::with_capacity(records.len());
    for (index, result) in transformer.transform_each(records).into_iter().enumerate() {
        match result {
            Ok(record) => out.push(Value::Object(record)),
            Err(e) => {
                rejected += 1;
                tracing::warn!(record = index, error = %e, "skipping record");
            }
        }
    }
    if rejected > 0 {
        eprintln!("⚠️  {} record(s) rejected", rejected);
    }

    match data {
        Value::Array(_) => Value::Array(out),
        _ => out.pop().unwrap_or(Value::Null),
    }
}

/// Read a JSON document, falling back to JSON lines
fn read_records(input: Option<&Path>) -> anyhow::Result<Value> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
            buf
        }
    };

    if let Ok(document) = serde_json::from_str::<Value>(&content) {
        return Ok(document);
    }

    let records = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<Value>(line)
                .with_context(|| format!("invalid JSON on line {}", index + 1))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Value::Array(records))
}

fn report_diagnostics(events: &[DiagnosticEvent]) {
    for event in events {
        match event {
            DiagnosticEvent::CoercionFailed { field, message } => {
                tracing::warn!(field = %field, "{}", message);
            }
            DiagnosticEvent::RequiredMissing { field } => {
                tracing::error!(field = %field, "required field is missing");
            }
        }
    }
    let fallbacks = events
        .iter()
        .filter(|e| matches!(e, DiagnosticEvent::CoercionFailed { .. }))
        .count();
    if fallbacks > 0 {
        eprintln!("⚠️  {} field(s) fell back to defaults", fallbacks);
    }
}
