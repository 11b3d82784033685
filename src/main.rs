use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Cli, Command},
    entry::Filter,
};

mod bibtex;
mod cli;
mod config;
mod dedup;
mod entry;
mod output;
mod pipeline;
mod scholar;
mod similarity;
mod source;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose, args.quiet);

    let progress = !args.quiet;
    let summary = match args.command {
        Command::Collect { config } => {
            let config = config::load(&config)?;
            pipeline::collect(&config, progress)?
        }
        Command::Dedup {
            from,
            threshold,
            mandatory,
        } => {
            let filter = Filter {
                mandatory_fields: mandatory,
                skip_titles: Vec::new(),
            };
            let (entries, summary) = pipeline::merge(
                from.iter().map(|t| (t.name(), &t.source)),
                filter,
                threshold,
                progress,
            )?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            summary
        }
    };

    eprintln!("{summary}");
    if summary.all_failed() {
        anyhow::bail!("no source could be loaded");
    }
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
