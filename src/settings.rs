//! Merges command-line options with what a site file carries.
//!
//! Command line beats the file, which beats the built-in defaults.
use std::time::Duration;

use anyhow::{Error, Result};

use crate::{
    config::{ProberConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, DEFAULT_WORKERS},
    language::Language,
    sites::SiteFile,
};

/// Run options given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub languages: Vec<String>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub max_redirects: Option<usize>,
    pub workers: Option<usize>,
    pub user_agent: Option<String>,
    pub head: bool,
    pub strict: bool,
}

#[derive(Debug)]
pub struct RunSettings {
    pub languages: Vec<Language>,
    pub workers: usize,
    pub config: ProberConfig,
}

impl RunSettings {
    pub fn resolve(overrides: &Overrides, site_file: &SiteFile) -> Result<Self> {
        let languages = languages(&overrides.languages, site_file.languages.as_deref())?;

        let timeout = match (overrides.timeout, site_file.timeout_secs) {
            (Some(millis), _) => Duration::from_millis(millis),
            (None, Some(secs)) => Duration::from_secs(secs),
            (None, None) => DEFAULT_TIMEOUT,
        };
        if timeout.is_zero() {
            return Err(Error::msg("timeout must be positive"));
        }
        let max_redirects = overrides
            .max_redirects
            .or(site_file.max_redirects)
            .unwrap_or(DEFAULT_MAX_REDIRECTS);
        let workers = overrides
            .workers
            .or(site_file.workers)
            .unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            return Err(Error::msg("workers must be at least 1"));
        }

        let mut config = ProberConfig::default()
            .timeout(timeout)
            .max_redirects(max_redirects);
        if let Some(user_agent) = overrides
            .user_agent
            .clone()
            .or_else(|| site_file.user_agent.clone())
        {
            config = config.user_agent(user_agent);
        }
        if overrides.head {
            config = config.head();
        }
        if overrides.strict {
            config = config.strict();
        }
        Ok(Self {
            languages,
            workers,
            config,
        })
    }
}

fn parse_code(code: &str) -> Result<Language> {
    Language::parse(code).ok_or_else(|| Error::msg(format!("invalid language code `{code}`")))
}

/// `--lang` beats the site file, which beats the built-in pair.
pub fn languages(flags: &[String], from_file: Option<&[String]>) -> Result<Vec<Language>> {
    let codes = match (flags, from_file) {
        ([], Some(codes)) => codes,
        ([], None) => return Ok(Language::defaults()),
        (flags, _) => flags,
    };
    let languages = codes
        .iter()
        .map(|code| parse_code(code))
        .collect::<Result<Vec<_>>>()?;
    if languages.is_empty() {
        return Err(Error::msg("no languages to probe"));
    }
    Ok(languages)
}

/// The one language an interactive run was told to use, if any.
pub fn single_language(flags: &[String]) -> Result<Option<Language>> {
    match flags {
        [] => Ok(None),
        [code] => parse_code(code).map(Some),
        _ => Err(Error::msg(format!(
            "interactive mode takes one language, got {} (use --report for several)",
            flags.len()
        ))),
    }
}
