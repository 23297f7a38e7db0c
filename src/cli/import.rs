use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::cli::{open_library, save_library, OutputFormat};
use crate::parsing::records::parse_records_file;
use crate::store::EntityStore;
use crate::utils::validation::check_record_limit;

#[derive(Args)]
pub struct ImportArgs {
    /// Record file (JSON array, TSV or CSV)
    #[arg(required = true)]
    pub input: PathBuf,
}

/// Execute import subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be parsed or the library cannot be
/// read or written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: ImportArgs,
    library: &Path,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let records = parse_records_file(&args.input)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    if verbose {
        eprintln!("Parsed {} records from {}", records.len(), args.input.display());
    }

    let mut store = open_library(library)?;
    let mut inserted = 0;
    let mut updated = 0;
    for record in records {
        // Updates do not grow the library, so only new ids count against the limit
        if store.record(&record.external_id)?.is_none() {
            if let Some(msg) = check_record_limit(store.len()) {
                anyhow::bail!(msg);
            }
        }
        if store.upsert_record(record)? {
            inserted += 1;
        } else {
            updated += 1;
        }
    }
    save_library(&store, library)?;

    match format {
        OutputFormat::Text => {
            println!("Imported {inserted} new and {updated} updated records");
            println!("Library now holds {} records", store.len());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "inserted": inserted,
                "updated": updated,
                "total": store.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("inserted\tupdated\ttotal");
            println!("{inserted}\t{updated}\t{}", store.len());
        }
    }

    Ok(())
}
