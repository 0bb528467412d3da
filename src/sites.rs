use std::path::Path;

use anyhow::{Context, Error, Result};
use reqwest::Url;
use serde::Deserialize;
use tokio::fs::read_to_string;

/// Demo targets used when no site list is given.
pub const DEFAULT_SITES: [(&str, &str); 2] = [
    ("DuckDuckGo", "https://duckduckgo.com/?q=test"),
    ("Nextcloud", "https://demo2.nextcloud.com/index.php/login"),
];

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Site {
    pub url: String,
    pub name: Option<String>,
}

impl Site {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Display name, or the host when there is none.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Run settings a TOML site file may carry next to its sites.
#[derive(Debug, Default, Deserialize)]
pub struct SiteFile {
    #[serde(default)]
    pub sites: Vec<Site>,
    pub languages: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub max_redirects: Option<usize>,
    pub workers: Option<usize>,
    pub user_agent: Option<String>,
}

pub fn default_sites() -> Vec<Site> {
    DEFAULT_SITES
        .iter()
        .map(|(name, url)| Site::new(*url).named(*name))
        .collect()
}

/// Read a site list from `path`; `.toml` files are parsed as [`SiteFile`],
/// anything else as plain text.
pub async fn load<P>(path: P) -> Result<SiteFile>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = read_to_string(path)
        .await
        .with_context(|| format!("reading site list {}", path.display()))?;
    let site_file = if path.extension().map_or(false, |ext| ext == "toml") {
        parse_toml(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        SiteFile {
            sites: parse_lines(&text),
            ..SiteFile::default()
        }
    };
    if site_file.sites.is_empty() {
        return Err(Error::msg(format!(
            "site list {} contains no sites",
            path.display()
        )));
    }
    Ok(site_file)
}

pub fn parse_toml(text: &str) -> Result<SiteFile> {
    let mut site_file: SiteFile = toml::from_str(text)?;
    for site in &mut site_file.sites {
        site.url = site.url.trim().to_owned();
    }
    Ok(site_file)
}

/// One site per line as `URL [display name]`; blank lines and `#`
/// comments are skipped.
pub fn parse_lines(text: &str) -> Vec<Site> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once(char::is_whitespace) {
            Some((url, name)) => Site::new(url).named(name.trim()),
            None => Site::new(line),
        })
        .collect()
}
