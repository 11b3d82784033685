//! Gathering sources into one pool and writing the results.
//!
//! Each source is loaded on its own; a source that fails is logged, counted and
//! left out while the rest carry on. The successful batches are kept as loaded
//! for per-source output, and their union is deduplicated once.

use std::{collections::HashMap, fmt, path::Path};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};

use crate::{
    config::Config,
    dedup::{self, ResolveError},
    entry::{Entry, Filter, Method, Record},
    output,
    source::Source,
};

/// Entries of one successfully loaded source, undeduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Unique within a run; names the per-source output file.
    pub id: String,
    pub name: String,
    pub method: Method,
    pub entries: Vec<Entry>,
}

#[derive(Debug)]
pub struct Failure {
    pub id: String,
    pub error: anyhow::Error,
}

/// Names of the run-wide outputs; no per-source dump may take them.
const RESERVED_IDS: &[&str] = &["combined", "all"];

pub struct Aggregator {
    filter: Filter,
    batches: Vec<Batch>,
    failures: Vec<Failure>,
    ids: HashMap<String, usize>,
}

impl Aggregator {
    pub fn new(filter: Filter) -> Self {
        Aggregator {
            filter,
            batches: Vec::new(),
            failures: Vec::new(),
            ids: RESERVED_IDS.iter().map(|id| (id.to_string(), 1)).collect(),
        }
    }

    /// Record the outcome of loading one source.
    pub fn ingest(&mut self, id: &str, name: &str, method: Method, loaded: anyhow::Result<Vec<Record>>) {
        let id = self.unique_id(id);
        match loaded {
            Ok(records) => {
                let entries = self.filter.ingest(records, name, method);
                tracing::info!(source = %id, name, %method, count = entries.len(), "loaded source");
                self.batches.push(Batch {
                    id,
                    name: name.to_string(),
                    method,
                    entries,
                });
            }
            Err(error) => {
                tracing::error!(source = %id, "{error:#}");
                self.failures.push(Failure { id, error });
            }
        }
    }

    /// Two sources with the same id would overwrite each other's output, and a
    /// source named after a run-wide output would be overwritten by it.
    fn unique_id(&mut self, id: &str) -> String {
        let seen = self.ids.entry(id.to_string()).or_default();
        *seen += 1;
        if *seen == 1 {
            id.to_string()
        } else {
            format!("{id}_{seen}")
        }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn summary(&self) -> Summary {
        Summary {
            ok: self.batches.len(),
            failed: self.failures.len(),
        }
    }

    /// The union of every batch, in load order, deduplicated.
    pub fn combine(&self, threshold: f64) -> Result<Vec<Entry>, ResolveError> {
        let pool: Vec<Entry> = self
            .batches
            .iter()
            .flat_map(|b| b.entries.iter().cloned())
            .collect();
        dedup::resolve(pool, threshold)
    }
}

/// How many sources loaded and how many did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub ok: usize,
    pub failed: usize,
}

impl Summary {
    /// Nothing loaded although something was asked for.
    pub fn all_failed(&self) -> bool {
        self.ok == 0 && self.failed > 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = format!("✓ {}", self.ok);
        let failed = format!("✗ {}", self.failed);
        write!(
            f,
            "{} {}",
            ok.if_supports_color(Stream::Stderr, |t| t.green()),
            failed.if_supports_color(Stream::Stderr, |t| t.red())
        )
    }
}

/// Load every `(name, source)` pair, downloading remote ones into `download_dir`.
pub fn gather<'a>(
    sources: impl ExactSizeIterator<Item = (String, &'a Source)>,
    filter: Filter,
    download_dir: &Path,
    progress: bool,
) -> Aggregator {
    let bar = if progress {
        ProgressBar::new(sources.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}") {
        bar.set_style(style);
    }

    let mut aggregator = Aggregator::new(filter);
    for (name, source) in sources {
        bar.set_message(format!("{name} ({})", source.id()));
        let loaded = bar.suspend(|| source.load(download_dir));
        aggregator.ingest(&source.id(), &name, source.method(), loaded);
        bar.inc(1);
    }
    bar.finish_and_clear();
    aggregator
}

/// Full run from a config: per-source dumps, the deduplicated union in
/// `combined.json`, and a second pass over the per-source dumps in `all.json`.
pub fn collect(config: &Config, progress: bool) -> anyhow::Result<Summary> {
    let aggregator = gather(
        config.sources.iter().map(|s| (s.name(), &s.source)),
        config.filter(),
        &config.output_dir,
        progress,
    );

    if !aggregator.failures().is_empty() {
        let skipped: Vec<String> = aggregator
            .failures()
            .iter()
            .map(|f| format!("{}: {:#}", f.id, f.error))
            .collect();
        tracing::warn!(?skipped, "left failed sources out of the combined records");
    }

    let mut dumps = Vec::new();
    for batch in aggregator.batches() {
        let path = config.output_dir.join(format!("{}.json", batch.id));
        tracing::debug!(source = %batch.id, name = %batch.name, method = %batch.method, "writing source records");
        output::write_json(&batch.entries, &path)?;
        dumps.push(path);
    }

    let combined = aggregator.combine(config.threshold)?;
    output::write_json(&combined, &config.output_dir.join("combined.json"))?;

    let mut reloaded = Vec::new();
    for path in &dumps {
        reloaded.extend(output::read_json(path)?);
    }
    let all = dedup::resolve(reloaded, config.threshold)?;
    output::write_json(&all, &config.output_dir.join("all.json"))?;

    Ok(aggregator.summary())
}

/// Load the given sources and return their deduplicated union.
pub fn merge<'a>(
    sources: impl ExactSizeIterator<Item = (String, &'a Source)>,
    filter: Filter,
    threshold: f64,
    progress: bool,
) -> anyhow::Result<(Vec<Entry>, Summary)> {
    let download_dir = std::env::temp_dir().join("bibmerge");
    let aggregator = gather(sources, filter, &download_dir, progress);
    let combined = aggregator.combine(threshold)?;
    Ok((combined, aggregator.summary()))
}
