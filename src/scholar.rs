use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use url::Url;

const EXPORT_URL: &str = "https://scholar.googleusercontent.com/citations";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const GLOBAL_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// A Google Scholar profile's BibTeX export, identified by the profile id and
/// the export signature Scholar hands out alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export<'a> {
    pub user_id: &'a str,
    pub code: &'a str,
}

impl<'a> Export<'a> {
    pub fn to_url(&self) -> anyhow::Result<Url> {
        let mut url = Url::parse(EXPORT_URL)?;
        url.query_pairs_mut()
            .append_pair("view_op", "export_citations")
            .append_pair("user", self.user_id)
            .append_pair("citsig", self.code);
        Ok(url)
    }

    /// Download the export into `<output_dir>/<user_id>.bib` and return that path.
    pub fn download(&self, output_dir: &Path) -> anyhow::Result<PathBuf> {
        let url = self.to_url()?;
        tracing::debug!(%url, "downloading scholar export");
        let body: String = agent()
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", "https://google.com")
            .call()
            .with_context(|| format!("failed to download citations for user {}", self.user_id))?
            .body_mut()
            .read_to_string()?;

        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create {}", output_dir.display()))?;
        let path = output_dir.join(format!("{}.bib", self.user_id));
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// A stalled export must fail its own source rather than hang the run.
fn agent() -> ureq::Agent {
    let cfg = ureq::Agent::config_builder()
        .timeout_connect(Some(CONNECT_TIMEOUT))
        .timeout_global(Some(GLOBAL_TIMEOUT))
        .build();
    ureq::Agent::new_with_config(cfg)
}
