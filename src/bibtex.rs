use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::Context;
use biblatex::{Bibliography, Chunk, Person, Spanned};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::entry::Record;

/// Fields holding people rather than text.
const PERSON_ROLES: &[&str] = &["author", "editor"];

static ENTRY_HEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)\{([^,]+),").unwrap());

/// Read and parse a `.bib` file into records, in file order.
pub fn load(path: &Path) -> anyhow::Result<Vec<Record>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse BibTeX source into records, in source order.
pub fn parse(content: &str) -> anyhow::Result<Vec<Record>> {
    let content = disambiguate_keys(content);
    let bib = Bibliography::parse(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse BibLaTeX: {e}"))?;

    Ok(bib
        .iter()
        .map(|entry| {
            let fields = entry
                .fields
                .iter()
                .filter(|(name, _)| !PERSON_ROLES.contains(&name.as_str()))
                .map(|(name, chunks)| (name.clone(), chunks_to_string(chunks)))
                .collect();

            let persons = PERSON_ROLES
                .iter()
                .filter_map(|role| {
                    let people = entry.get_as::<Vec<Person>>(role).ok()?;
                    Some((role.to_string(), people.iter().map(format_person).collect()))
                })
                .collect();

            Record {
                key: entry.key.clone(),
                entry_type: entry.entry_type.to_string(),
                fields,
                persons,
            }
        })
        .collect())
}

/// Rename keys that occur more than once to `key_1`, `key_2`, ... in order of
/// appearance, skipping any suffix another entry already uses. Scholar exports
/// routinely reuse keys.
pub fn disambiguate_keys(content: &str) -> Cow<'_, str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for caps in ENTRY_HEAD_RE.captures_iter(content) {
        if let Some(key) = caps.get(2) {
            *counts.entry(key.as_str().trim()).or_default() += 1;
        }
    }

    let (repeated, unique): (HashMap<&str, usize>, HashMap<&str, usize>) =
        counts.into_iter().partition(|(_, n)| *n > 1);
    if repeated.is_empty() {
        return Cow::Borrowed(content);
    }
    for (key, n) in &repeated {
        tracing::info!(key, count = *n, "renaming repeated citation key");
    }

    let mut taken: HashSet<String> = unique.into_keys().map(str::to_string).collect();
    let mut seen: HashMap<String, usize> = HashMap::new();
    ENTRY_HEAD_RE.replace_all(content, |caps: &Captures<'_>| {
        let kind = &caps[1];
        let key = caps[2].trim();
        if !repeated.contains_key(key) {
            return caps[0].to_string();
        }
        let counter = seen.entry(key.to_string()).or_default();
        let renamed = loop {
            *counter += 1;
            let candidate = format!("{key}_{counter}");
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        format!("@{kind}{{{renamed},")
    })
}

fn chunks_to_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            Chunk::Normal(s) | Chunk::Verbatim(s) | Chunk::Math(s) => s.as_str(),
        })
        .collect::<String>()
}

/// `Family, Given` with optional particle and suffix, the way BibTeX writes names.
fn format_person(p: &Person) -> String {
    let mut family = String::new();
    if !p.prefix.is_empty() {
        family.push_str(&p.prefix);
        family.push(' ');
    }
    family.push_str(&p.name);
    if !p.suffix.is_empty() {
        family.push_str(", ");
        family.push_str(&p.suffix);
    }
    if p.given_name.is_empty() {
        family
    } else {
        format!("{family}, {}", p.given_name)
    }
}
