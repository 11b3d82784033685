use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{bibtex, entry::Method, entry::Record, scholar::Export};

/// Where a batch of bibliography records comes from, which can either be
///
/// - a Google Scholar profile export, or
/// - a BibTeX file maintained by hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Scholar { user_id: String, code: String },
    File { path: PathBuf },
}

impl Source {
    pub fn method(&self) -> Method {
        match self {
            Source::Scholar { .. } => Method::Scraped,
            Source::File { .. } => Method::Curated,
        }
    }

    /// Short identifier, used for naming per-source output files.
    pub fn id(&self) -> String {
        match self {
            Source::Scholar { user_id, .. } => user_id.clone(),
            Source::File { path } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    /// Resolve relative file paths against `base`.
    pub fn rebase(self, base: &Path) -> Self {
        match self {
            Source::File { path } if path.is_relative() => Source::File {
                path: base.join(path),
            },
            other => other,
        }
    }

    /// Fetch (if remote) and parse the records of this source. Downloads land in
    /// `output_dir`.
    pub fn load(&self, output_dir: &Path) -> anyhow::Result<Vec<Record>> {
        let path = match self {
            Source::Scholar { user_id, code } => Export {
                user_id,
                code,
            }
            .download(output_dir)?,
            Source::File { path } => path.clone(),
        };
        bibtex::load(&path)
    }
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `scholar:USER:CODE` is a profile export; anything else is taken to be a
        // path. Whether the file exists is only checked when it is loaded.
        if let Some(rest) = s.strip_prefix("scholar:") {
            return match rest.split_once(':') {
                Some((user, code)) if !user.is_empty() && !code.is_empty() => Ok(Source::Scholar {
                    user_id: user.to_string(),
                    code: code.to_string(),
                }),
                _ => Err(format!("expected scholar:USER_ID:CODE, got `{s}`")),
            };
        }
        if s.is_empty() {
            return Err("empty source".to_string());
        }

        let path = fs::canonicalize(s).unwrap_or_else(|_| PathBuf::from(s));
        Ok(Source::File { path })
    }
}
