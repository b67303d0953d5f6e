//! treesync CLI tool
//!
//! Builds a tree from a JSON array of records and a TOML addressing configuration.
//!
//! ## Commands
//!
//! - `show <rows.json>`: print the tree and any diagnostics
//! - `check <rows.json>`: run the structural self-check, exiting non-zero on failure

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    process::ExitCode,
};
use treesync_core::{
    config::{ConfigProvider, TomlConfigProvider},
    engine::TreeEngine,
    json::addressing_from_config,
    TreeSyncError,
};

#[derive(Parser)]
#[command(name = "treesync")]
#[command(author, version, about = "Inspect trees built from flat JSON records", long_about = None)]
struct Cli {
    /// TOML configuration ([addressing], [expansion], [selection], [sync])
    #[arg(short, long, default_value = "tree.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the tree and print it with its diagnostics
    Show {
        /// JSON file holding an array of records
        rows: PathBuf,

        /// Use the record order of the file as leaf order
        #[arg(long)]
        reorder: bool,

        /// Print collapsed groups' children too
        #[arg(short, long)]
        all: bool,
    },

    /// Build the tree and run the invariant self-check
    Check {
        /// JSON file holding an array of records
        rows: PathBuf,
    },
}

fn load(config: &Path, rows: &Path) -> Result<(TreeEngine<Value>, Vec<Value>), TreeSyncError> {
    let config = TomlConfigProvider::new(config).get_config()?;
    let addressing = addressing_from_config(&config.addressing)?;
    let records = match serde_json::from_str::<Value>(&read_to_string(rows)?)? {
        Value::Array(records) => records,
        other => {
            return Err(TreeSyncError::InvalidOperation(format!(
                "expected a JSON array of records, found {}",
                json_kind(&other)
            )))
        }
    };
    Ok((TreeEngine::new(addressing, config), records))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn print_tree(engine: &mut TreeEngine<Value>, all: bool) {
    if all {
        engine.expand_all();
    }
    for id in engine.display_rows() {
        let Some(node) = engine.node(id) else {
            continue;
        };
        let marker = match (node.is_group(), node.expanded()) {
            (true, true) => "v",
            (true, false) => ">",
            (false, _) => "-",
        };
        let indent = "  ".repeat(node.level().max(0) as usize);
        let filler = if node.is_filler() { " (filler)" } else { "" };
        println!(
            "{indent}{marker} {}{filler} [{} rows]",
            node.key(),
            node.leaf_descendants().len()
        );
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Show { rows, reorder, all } => {
            load(&cli.config, &rows).map(|(mut engine, records)| {
                let report = engine.set_rows(records, reorder);
                print_tree(&mut engine, all);
                if !report.diagnostics.is_empty() {
                    println!("\n=== Diagnostics ===");
                    for diagnostic in report.diagnostics.iter() {
                        println!("{diagnostic}");
                    }
                }
                true
            })
        }
        Commands::Check { rows } => load(&cli.config, &rows).map(|(mut engine, records)| {
            let report = engine.set_rows(records, false);
            let errors = engine.check_invariants();
            println!(
                "{} rows, {} nodes, {} diagnostics, {} cycle re-runs",
                engine.tree().row_count(),
                engine.tree().node_count(),
                report.diagnostics.len(),
                report.guard_reruns
            );
            for error in errors.iter() {
                eprintln!("{error}");
            }
            errors.is_empty()
        }),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
