use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::similarity::{self, DEFAULT_THRESHOLD};

/// How an entry made it into the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Exported automatically from a scholar profile.
    Scraped,
    /// Supplied as a ready-made bibliography file. Preferred over [`Method::Scraped`].
    Curated,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Scraped => f.write_str("scraped"),
            Method::Curated => f.write_str("curated"),
        }
    }
}

/// A bibliography record as it comes out of a `.bib` file, before any filtering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub entry_type: String,
    /// Every non-person field, flattened to plain text.
    pub fields: BTreeMap<String, String>,
    /// Role (`author`, `editor`) to names, in order.
    pub persons: BTreeMap<String, Vec<String>>,
}

/// The unit of deduplication: a record plus its provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub year: i64,
    /// Who the entry was collected for. Never looked at when comparing.
    pub name: String,
    pub method: Method,
    pub fields: BTreeMap<String, String>,
    pub persons: BTreeMap<String, Vec<String>>,
    /// Scholar search link for the title.
    pub url: String,
}

/// Which records are allowed into the pool.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub mandatory_fields: Vec<String>,
    pub skip_titles: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            mandatory_fields: vec!["year".to_string()],
            skip_titles: Vec::new(),
        }
    }
}

impl Filter {
    /// Turn a record into an [`Entry`], or `None` if it does not belong in the pool.
    pub fn admit(&self, record: Record, name: &str, method: Method) -> Option<Entry> {
        let title = match record.fields.get("title").map(|t| t.trim()) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                tracing::debug!(key = %record.key, "skipping record without a title");
                return None;
            }
        };

        if self
            .skip_titles
            .iter()
            .any(|skip| similarity::is_similar(&title, skip, DEFAULT_THRESHOLD))
        {
            tracing::debug!(key = %record.key, %title, "skipping listed title");
            return None;
        }

        let year = record.fields.get("year")?;
        if let Some(missing) = self
            .mandatory_fields
            .iter()
            .find(|f| !record.fields.contains_key(f.as_str()) && !record.persons.contains_key(f.as_str()))
        {
            tracing::debug!(key = %record.key, field = %missing, "skipping record missing a mandatory field");
            return None;
        }

        let year = match year.trim().parse::<i64>() {
            Ok(y) => y,
            Err(_) => {
                tracing::warn!(key = %record.key, %year, "skipping record with a non-numeric year");
                return None;
            }
        };

        Some(Entry {
            url: scholar_search_link(&title),
            key: record.key,
            entry_type: record.entry_type,
            title,
            year,
            name: name.to_string(),
            method,
            fields: record.fields,
            persons: record.persons,
        })
    }

    /// Admit every record of one batch, keeping file order.
    pub fn ingest(&self, records: Vec<Record>, name: &str, method: Method) -> Vec<Entry> {
        let total = records.len();
        let entries: Vec<Entry> = records
            .into_iter()
            .filter_map(|r| self.admit(r, name, method))
            .collect();
        tracing::debug!(name, %method, total, kept = entries.len(), "ingested batch");
        entries
    }
}

/// Link to a Google Scholar search for `title`. Built only, never requested.
pub fn scholar_search_link(title: &str) -> String {
    let mut url = Url::parse("https://scholar.google.com/scholar").expect("static URL is valid");
    url.query_pairs_mut().append_pair("q", title);
    url.into()
}
