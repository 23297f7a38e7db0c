use std::path::Path;

use clap::Args;

use crate::cli::{open_library, save_library, OutputFormat};
use crate::config::Config;
use crate::core::types::MatchMethod;
use crate::lookup::cache::LookupStats;
use crate::lookup::SeriesLookup;
use crate::matching::engine::{MatchSummary, MatchingEngine};

#[derive(Args)]
pub struct MatchArgs {
    /// Minimum fuzzy score for a match (overrides the config file)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: Option<u8>,

    /// Skip the external lookup even if it is enabled in the config
    #[arg(long)]
    pub offline: bool,

    /// Disable the fuzzy fallback
    #[arg(long)]
    pub no_fuzzy: bool,
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the library cannot be read or written, the external
/// lookup cannot be set up, or the store fails during the run. Matches made
/// before a failure are still saved.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: MatchArgs,
    library: &Path,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut matching = config.matching_config();
    if let Some(threshold) = args.threshold {
        matching.confidence_threshold = threshold;
    }
    if args.no_fuzzy {
        matching.fuzzy_enabled = false;
    }

    let lookup = if args.offline {
        None
    } else {
        config.build_lookup()?
    };

    let mut store = open_library(library)?;
    if store.is_empty() {
        eprintln!("Warning: Library is empty, nothing to match. Run `import` first.");
        return Ok(());
    }

    if verbose {
        eprintln!(
            "Matching {} records (threshold {}, fuzzy {}, external lookup {})",
            store.len(),
            matching.confidence_threshold,
            if matching.fuzzy_enabled { "on" } else { "off" },
            lookup
                .as_ref()
                .map_or_else(|| "off".to_string(), |l| l.provider().kind().to_string()),
        );
    }

    let (result, lookup_stats) = {
        let mut engine = MatchingEngine::new(&mut store, matching).with_optional_lookup(lookup);
        let result = engine.run();
        (result, engine.lookup_stats())
    };

    // Keep whatever was matched before a failure
    save_library(&store, library)?;
    let summary = result?;

    match format {
        OutputFormat::Text => print_text_summary(&summary, lookup_stats.as_ref()),
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&summary)?;
            output["unmatched"] = summary.unmatched().into();
            if let Some(stats) = lookup_stats {
                output["lookup"] = serde_json::json!({
                    "requests": stats.requests,
                    "cache_hits": stats.cache_hits,
                    "cooldown_skips": stats.cooldown_skips,
                    "failures": stats.failures,
                });
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("method\tcount");
            for method in MatchMethod::ALL {
                println!("{method}\t{}", summary.count(method));
            }
            println!("unmatched\t{}", summary.unmatched());
        }
    }

    Ok(())
}

fn print_text_summary(summary: &MatchSummary, lookup: Option<&LookupStats>) {
    println!(
        "Matched {} of {} records ({} new series)",
        summary.matched, summary.processed, summary.series_created
    );
    for method in MatchMethod::ALL {
        let count = summary.count(method);
        if count > 0 {
            println!("   {method}: {count}");
        }
    }
    if summary.unmatched() > 0 {
        println!("   unmatched: {}", summary.unmatched());
    }

    if let Some(stats) = lookup {
        println!(
            "External lookup: {} requests, {} cache hits, {} skipped during cooldown, {} failed",
            stats.requests, stats.cache_hits, stats.cooldown_skips, stats.failures
        );
    }
}
