use std::path::Path;

use clap::Args;

use crate::cli::{open_library, tsv_cell, OutputFormat};
use crate::core::record::Record;
use crate::matching::review::{LibraryStats, ReviewBoard};

#[derive(Args)]
pub struct StatusArgs {
    /// List records that have no match instead of the totals
    #[arg(long)]
    pub unmatched: bool,
}

/// Execute status subcommand
///
/// # Errors
///
/// Returns an error if the library cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: StatusArgs, library: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = open_library(library)?;
    let board = ReviewBoard::new(&mut store);

    if args.unmatched {
        print_unmatched(&board.unmatched_records()?, format)
    } else {
        print_stats(&board.summary()?, format)
    }
}

fn print_stats(stats: &LibraryStats, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Records:  {}", stats.records);
            println!("Series:   {}", stats.series);
            println!(
                "Matches:  {} ({} pending, {} approved, {} rejected)",
                stats.memberships, stats.pending, stats.approved, stats.rejected
            );
            println!("Unmatched records: {}", stats.unmatched);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Tsv => {
            println!("records\tseries\tmatches\tpending\tapproved\trejected\tunmatched");
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                stats.records,
                stats.series,
                stats.memberships,
                stats.pending,
                stats.approved,
                stats.rejected,
                stats.unmatched
            );
        }
    }
    Ok(())
}

fn print_unmatched(records: &[Record], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("Every record has a match.");
            }
            for record in records {
                match record.author() {
                    Some(author) => println!("{}\t{} by {author}", record.external_id, record.title),
                    None => println!("{}\t{}", record.external_id, record.title),
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Tsv => {
            println!("external_id\ttitle\tauthor");
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    tsv_cell(record.external_id.as_str()),
                    tsv_cell(&record.title),
                    tsv_cell(record.author().unwrap_or_default())
                );
            }
        }
    }
    Ok(())
}
