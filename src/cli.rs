use std::{path::PathBuf, str::FromStr};

use clap::{ArgAction, Parser, Subcommand};

use crate::{similarity::DEFAULT_THRESHOLD, source::Source};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more (repeat for trace output). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect every configured source and write per-source and combined records
    Collect {
        #[arg(short, long, value_name = "PATH", default_value = "config.json")]
        config: PathBuf,
    },
    /// Merge the given sources and print the deduplicated records as JSON
    Dedup {
        #[arg(value_name = "[NAME=]SRC", required = true)]
        from: Vec<Target>,
        /// Titles scoring above this ratio are duplicates
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
        threshold: f64,
        /// Fields a record must carry to be kept
        #[arg(short, long = "mandatory", value_name = "FIELD", default_values_t = [String::from("year")])]
        mandatory: Vec<String>,
    },
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&t) {
        Ok(t)
    } else {
        Err(format!("{t} is not within [0, 1]"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A source plus who its entries belong to. Written `NAME=SRC`, or just `SRC`, in
/// which case the owner is the source's own id.
///
/// `SRC` is either `scholar:USER_ID:CODE` or a path to a BibTeX file.
pub struct Target {
    pub name: Option<String>,
    pub source: Source,
}

impl Target {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.source.id())
    }
}

impl FromStr for Target {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only treat `=` as a name separator ahead of the source proper, so that
        // paths containing `=` still work when given without a name.
        if let Some((name, rest)) = s.split_once('=')
            && !name.is_empty()
            && !name.contains(['/', '\\', ':'])
        {
            return Ok(Target {
                name: Some(name.to_string()),
                source: rest.parse()?,
            });
        }
        Ok(Target {
            name: None,
            source: s.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn target_with_name() {
        let t: Target = "alice=scholar:u1:c1".parse().expect("parse");
        assert_eq!(t.name(), "alice");
        assert_eq!(
            t.source,
            Source::Scholar {
                user_id: "u1".into(),
                code: "c1".into()
            }
        );
    }

    #[test]
    fn target_without_name_uses_source_id() {
        let t: Target = "scholar:u1:c1".parse().expect("parse");
        assert_eq!(t.name, None);
        assert_eq!(t.name(), "u1");

        let t: Target = "/bibs/bob.bib".parse().expect("parse");
        assert_eq!(t.name(), "bob");
    }

    #[test]
    fn equals_inside_a_path_is_not_a_name() {
        let t: Target = "/bibs/a=b.bib".parse().expect("parse");
        assert_eq!(t.name, None);
        assert_eq!(
            t.source,
            Source::File {
                path: "/bibs/a=b.bib".into()
            }
        );
    }

    #[test]
    fn dedup_parses_defaults() {
        let cli = Cli::try_parse_from(["bibmerge", "dedup", "carol=/x/carol.bib"]).expect("parse");
        match cli.command {
            Command::Dedup {
                from,
                threshold,
                mandatory,
            } => {
                assert_eq!(from.len(), 1);
                assert_eq!(from[0].name(), "carol");
                assert_eq!(threshold, DEFAULT_THRESHOLD);
                assert_eq!(mandatory, vec!["year".to_string()]);
            }
            other => panic!("expected dedup, got {other:?}"),
        }
    }

    #[test]
    fn threshold_must_be_a_ratio() {
        assert!(Cli::try_parse_from(["bibmerge", "dedup", "-t", "1.5", "a.bib"]).is_err());
        assert!(Cli::try_parse_from(["bibmerge", "dedup", "-t", "x", "a.bib"]).is_err());
        assert!(Cli::try_parse_from(["bibmerge", "dedup", "-t", "0.8", "a.bib"]).is_ok());
    }

    #[test]
    fn collect_defaults_to_config_json() {
        let cli = Cli::try_parse_from(["bibmerge", "-v", "collect"]).expect("parse");
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Collect { config } => assert_eq!(config, PathBuf::from("config.json")),
            other => panic!("expected collect, got {other:?}"),
        }
    }
}
