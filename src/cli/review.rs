use std::path::Path;

use clap::{Args, Subcommand};

use crate::cli::{open_library, save_library, tsv_cell, OutputFormat, StatusArg};
use crate::config::Config;
use crate::core::types::MatchId;
use crate::matching::review::{MatchView, ReviewBoard, ReviewOutcome};

#[derive(Args)]
pub struct ReviewArgs {
    #[command(subcommand)]
    pub command: ReviewCommands,
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// List matches
    List {
        /// Only show matches in this review state
        #[arg(short, long, value_enum, default_value = "all")]
        status: StatusArg,
    },

    /// Approve a match
    Approve {
        /// Match ID
        #[arg(required = true)]
        id: u64,
    },

    /// Reject a match
    Reject {
        /// Match ID
        #[arg(required = true)]
        id: u64,
    },

    /// Approve every pending match at or above a score
    ApproveAll {
        /// Minimum score (defaults to matching.autoApproveThreshold)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,
    },

    /// Reject every pending match
    RejectAll,

    /// Delete a match
    Remove {
        /// Match ID
        #[arg(required = true)]
        id: u64,
    },
}

/// Execute review subcommand
///
/// # Errors
///
/// Returns an error if the library cannot be read or written, or if a point
/// operation names an unknown match.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: ReviewArgs,
    library: &Path,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = open_library(library)?;
    let mut board = ReviewBoard::new(&mut store);

    let (action, outcome) = match args.command {
        ReviewCommands::List { status } => {
            let views = board.list(status.into())?;
            return print_views(&views, format);
        }
        ReviewCommands::Approve { id } => ("approved", Change::Point(id, board.approve(MatchId(id))?)),
        ReviewCommands::Reject { id } => ("rejected", Change::Point(id, board.reject(MatchId(id))?)),
        ReviewCommands::Remove { id } => ("removed", Change::Point(id, board.remove(MatchId(id))?)),
        ReviewCommands::ApproveAll { threshold } => {
            let threshold = threshold.unwrap_or(config.matching.auto_approve_threshold);
            ("approved", Change::Bulk(board.approve_all(threshold)?))
        }
        ReviewCommands::RejectAll => ("rejected", Change::Bulk(board.reject_all_pending()?)),
    };

    let count = match outcome {
        Change::Point(id, ReviewOutcome::NotFound) => {
            anyhow::bail!("Match {id} not found");
        }
        Change::Point(_, ReviewOutcome::Updated(_)) => 1,
        Change::Bulk(count) => count,
    };
    save_library(&store, library)?;

    match format {
        OutputFormat::Text => match outcome {
            Change::Point(id, _) => println!("Match {id} {action}"),
            Change::Bulk(count) => println!("{count} matches {action}"),
        },
        OutputFormat::Json => {
            let output = serde_json::json!({ "action": action, "count": count });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("action\tcount");
            println!("{action}\t{count}");
        }
    }

    Ok(())
}

enum Change {
    Point(u64, ReviewOutcome),
    Bulk(usize),
}

fn print_views(views: &[MatchView], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if views.is_empty() {
                println!("No matches found.");
                return Ok(());
            }
            for view in views {
                let author = view.record.author().unwrap_or("unknown author");
                let position = view
                    .record
                    .position
                    .as_ref()
                    .map(|p| format!(" #{p}"))
                    .unwrap_or_default();
                println!(
                    "[{}] {} ({author}) -> {}{position}",
                    view.id, view.record.title, view.series.name
                );
                println!(
                    "     score {} via {}, {}",
                    view.score,
                    view.method,
                    view.status()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(views)?);
        }
        OutputFormat::Tsv => {
            println!("id\trecord_id\ttitle\tauthor\tseries\tposition\tscore\tmethod\tapproved\trejected");
            for view in views {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    view.id,
                    tsv_cell(view.record.external_id.as_str()),
                    tsv_cell(&view.record.title),
                    tsv_cell(view.record.author().unwrap_or_default()),
                    tsv_cell(&view.series.name),
                    view.record.position.as_ref().map(ToString::to_string).unwrap_or_default(),
                    view.score,
                    view.method,
                    view.approved,
                    view.rejected,
                );
            }
        }
    }
    Ok(())
}
