use std::fmt::Write as _;

use anyhow::{Error, Result};
use futures::{stream, StreamExt};
use log::info;
use serde::Serialize;

use crate::{
    language::Language,
    probe::{Outcome, ProbeRequest, ProbeResult, Prober},
    sites::Site,
};

pub const COLUMNS: [&str; 11] = [
    "site",
    "url",
    "language",
    "status",
    "outcome",
    "redirects",
    "final_url",
    "content_language",
    "detected_language",
    "detected_from",
    "error",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Aligned columns followed by a summary.
    #[default]
    Table,
    Csv,
    /// One JSON object per line.
    Jsonl,
}

/// Results for every site and language, in site-list order.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub results: Vec<ProbeResult>,
}

/// Every (site, language) pair, sites outermost.
pub fn requests(sites: &[Site], languages: &[Language]) -> Vec<ProbeRequest> {
    sites
        .iter()
        .flat_map(|site| {
            languages.iter().map(move |language| ProbeRequest {
                site: site.clone(),
                language: language.clone(),
            })
        })
        .collect()
}

impl Report {
    /// Probe every pair with at most `workers` requests in flight.
    ///
    /// `buffered` yields in submission order, so the report keeps the
    /// site-list order whatever the latencies.
    pub async fn generate(
        prober: &Prober,
        sites: &[Site],
        languages: &[Language],
        workers: usize,
    ) -> Self {
        let requests = requests(sites, languages);
        let total = requests.len();
        info!(
            "Probing {} sites x {} languages with {} workers.",
            sites.len(),
            languages.len(),
            workers.max(1)
        );
        let results: Vec<_> = stream::iter(requests.iter())
            .map(|request| prober.probe(request))
            .buffered(workers.max(1))
            .collect()
            .await;
        debug_assert_eq!(results.len(), total);
        Self { results }
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == outcome)
            .count()
    }

    pub fn collisions(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|result| result.is_collision())
    }

    pub fn render(&self, format: Format) -> Result<String> {
        match format {
            Format::Table => Ok(self.to_table()),
            Format::Csv => self.to_csv(),
            Format::Jsonl => self.to_jsonl(),
        }
    }

    pub fn to_table(&self) -> String {
        let rows: Vec<[String; 11]> = self.results.iter().map(row).collect();
        let mut widths = COLUMNS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_row(&mut out, &COLUMNS.map(str::to_owned), &widths);
        let rule: usize = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
        out.push_str(&"=".repeat(rule));
        out.push('\n');
        for row in &rows {
            push_row(&mut out, row, &widths);
        }

        let _ = writeln!(
            out,
            "\n{} probes: {} localized, {} redirected, {} ignored, {} errors.",
            self.results.len(),
            self.count(Outcome::Localized),
            self.count(Outcome::Redirected),
            self.count(Outcome::Ignored),
            self.count(Outcome::Error),
        );
        let collisions: Vec<_> = self.collisions().collect();
        if collisions.is_empty() {
            out.push_str("No collisions in this run.\n");
        } else {
            out.push_str("Collisions detected:\n");
            for result in collisions {
                let _ = writeln!(
                    out,
                    "  - {} asked {} got {}",
                    result.site,
                    result.language,
                    result.detected_language.as_deref().unwrap_or_default()
                );
            }
        }
        out
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(COLUMNS)?;
        for result in &self.results {
            writer.write_record(row(result))?;
        }
        let bytes = writer.into_inner().map_err(|err| Error::msg(err.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for result in &self.results {
            out.push_str(&serde_json::to_string(result)?);
            out.push('\n');
        }
        Ok(out)
    }
}

fn row(result: &ProbeResult) -> [String; 11] {
    let opt = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_owned());
    [
        result.site.clone(),
        result.url.clone(),
        result.language.clone(),
        result
            .status
            .map_or_else(|| "-".to_owned(), |status| status.to_string()),
        result.outcome.to_string(),
        if result.redirects.is_empty() {
            "-".to_owned()
        } else {
            result.redirects.join(" ")
        },
        opt(&result.final_url),
        opt(&result.content_language),
        opt(&result.detected_language),
        result
            .detected_from
            .map_or_else(|| "-".to_owned(), |source| source.as_str().to_owned()),
        opt(&result.error),
    ]
}

fn push_row(out: &mut String, cells: &[String; 11], widths: &[usize; 11]) {
    let line: Vec<_> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}

/// One result, as printed by the interactive mode.
pub fn describe(result: &ProbeResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Site:             {} <{}>", result.site, result.url);
    let _ = writeln!(out, "Accept-Language:  {}", result.language);
    let _ = writeln!(out, "Outcome:          {}", result.outcome);
    if let Some(status) = result.status {
        let _ = writeln!(out, "Status:           {status}");
    }
    for hop in &result.redirects {
        let _ = writeln!(out, "Redirected to:    {hop}");
    }
    if let Some(final_url) = &result.final_url {
        let _ = writeln!(out, "Final URL:        {final_url}");
    }
    let _ = writeln!(
        out,
        "Content-Language: {}",
        result.content_language.as_deref().unwrap_or("(none)")
    );
    if let (Some(tag), Some(source)) = (&result.detected_language, result.detected_from) {
        let _ = writeln!(out, "Detected:         {tag} (from {})", source.as_str());
    }
    if result.is_collision() {
        out.push_str("Collision:        server answered in another language\n");
    }
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error:            {error}");
    }
    out
}
