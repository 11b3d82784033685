use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{entry::Filter, similarity::DEFAULT_THRESHOLD, source::Source};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where downloads and record dumps are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Records missing any of these fields are dropped
    #[serde(default = "default_mandatory_fields")]
    pub mandatory_fields: Vec<String>,

    /// Records whose title resembles one of these are dropped
    #[serde(default)]
    pub skip_titles: Vec<String>,

    /// Similarity ratio above which two titles are the same work
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Who the entries belong to; defaults to the source's id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub source: Source,
}

impl SourceConfig {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.source.id())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_mandatory_fields() -> Vec<String> {
    vec!["year".to_string()]
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Config {
    pub fn filter(&self) -> Filter {
        Filter {
            mandatory_fields: self.mandatory_fields.clone(),
            skip_titles: self.skip_titles.clone(),
        }
    }

    /// Parse a config. Relative paths are taken relative to `base`.
    pub fn from_json(json: &str, base: &Path) -> anyhow::Result<Self> {
        let mut config: Config = serde_json::from_str(json)?;
        if !(0.0..=1.0).contains(&config.threshold) {
            anyhow::bail!("threshold must be within [0, 1], got {}", config.threshold);
        }
        if config.output_dir.is_relative() {
            config.output_dir = base.join(&config.output_dir);
        }
        config.sources = config
            .sources
            .into_iter()
            .map(|s| SourceConfig {
                name: s.name,
                source: s.source.rebase(base),
            })
            .collect();
        Ok(config)
    }
}

/// Load the config file at `path`.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Config::from_json(&json, base).with_context(|| format!("invalid config {}", path.display()))
}
