use std::fmt;

use bytes::Bytes;
use log::{debug, info, warn};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client, Response, StatusCode, Url,
};
use serde::Serialize;
use tokio::time::timeout;

use crate::{
    config::{ProberConfig, MAX_BODY_BYTES},
    error::ProbeError,
    language::{
        cookie_locale, first_content_language, html_lang, is_fallback, is_registered, Language,
    },
    sites::Site,
};

/// What a site did with the requested language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Served content in the requested language.
    Localized,
    /// Redirected to a URL that names the requested language.
    Redirected,
    /// Served its default content.
    Ignored,
    /// Network failure, timeout, or a 4xx/5xx answer.
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Localized => "localized",
            Outcome::Redirected => "redirected",
            Outcome::Ignored => "ignored",
            Outcome::Error => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the detected page language came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HintSource {
    Header,
    Html,
    Cookie,
}

impl HintSource {
    pub fn as_str(self) -> &'static str {
        match self {
            HintSource::Header => "header",
            HintSource::Html => "html",
            HintSource::Cookie => "cookie",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeRequest {
    pub site: Site,
    pub language: Language,
}

/// Everything observed for one (site, language) pair.
#[derive(Clone, Debug, Serialize)]
pub struct ProbeResult {
    pub site: String,
    pub url: String,
    pub language: String,
    pub status: Option<u16>,
    pub final_url: Option<String>,
    pub redirects: Vec<String>,
    pub content_language: Option<String>,
    pub detected_language: Option<String>,
    pub detected_from: Option<HintSource>,
    pub outcome: Outcome,
    pub error: Option<String>,
}

impl ProbeResult {
    fn failed(request: &ProbeRequest, err: ProbeError) -> Self {
        let redirects = match &err {
            ProbeError::TooManyRedirects { hops, .. } => hops.clone(),
            _ => Vec::new(),
        };
        Self {
            site: request.site.label(),
            url: request.site.url.clone(),
            language: request.language.code.clone(),
            status: None,
            final_url: None,
            redirects,
            content_language: None,
            detected_language: None,
            detected_from: None,
            outcome: Outcome::Error,
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }

    /// The server ignored the header but served some other registered
    /// language instead of its fallback.
    pub fn is_collision(&self) -> bool {
        self.outcome == Outcome::Ignored
            && self
                .detected_language
                .as_deref()
                .map_or(false, |tag| is_registered(tag) && !is_fallback(tag))
    }
}

/// Final response of a redirect chain, reduced to what classification
/// needs.
#[derive(Debug)]
pub struct Observation {
    pub status: StatusCode,
    pub final_url: Option<Url>,
    pub redirects: Vec<Url>,
    pub content_language: Option<String>,
    pub hint: Option<(String, HintSource)>,
}

/// Decide the outcome of a completed request chain.
pub fn classify(language: &Language, observation: &Observation, strict: bool) -> Outcome {
    if let Some((tag, _)) = &observation.hint {
        if language.matches(tag, strict) {
            return Outcome::Localized;
        }
    }
    if !observation.redirects.is_empty() {
        if let Some(final_url) = &observation.final_url {
            if url_names_language(final_url, language) {
                return Outcome::Redirected;
            }
        }
    }
    if observation.status.is_client_error() || observation.status.is_server_error() {
        return Outcome::Error;
    }
    Outcome::Ignored
}

/// Whether a path segment, the leftmost host label or a `lang`-like query
/// value spells the language.
pub fn url_names_language(url: &Url, language: &Language) -> bool {
    let codes = language.accepted_codes();
    let names = |part: &str| {
        let part = part.to_ascii_lowercase();
        codes.iter().any(|code| {
            part == *code
                || part.starts_with(&format!("{code}-"))
                || part.starts_with(&format!("{code}_"))
        })
    };
    if let Some(mut segments) = url.path_segments() {
        if segments.any(names) {
            return true;
        }
    }
    if let Some(host) = url.host_str() {
        if host.split('.').next().map_or(false, names) {
            return true;
        }
    }
    url.query_pairs()
        .any(|(key, value)| {
            matches!(key.as_ref(), "lang" | "hl" | "locale") && names(value.as_ref())
        })
}

#[derive(Debug)]
pub struct Prober {
    client: Client,
    config: ProberConfig,
}

impl Prober {
    pub fn new(config: ProberConfig) -> anyhow::Result<Self> {
        let client = config.client()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Probe one site; failures come back as error results.
    pub async fn probe(&self, request: &ProbeRequest) -> ProbeResult {
        let bound = self.config.timeout;
        let observed = match timeout(bound, self.follow(request)).await {
            Ok(observed) => observed,
            Err(_) => Err(ProbeError::Timeout(bound)),
        };
        let result = match observed {
            Ok(observation) => self.conclude(request, observation),
            Err(err) => {
                warn!(
                    "{} [{}]: {err}.",
                    request.site.url, request.language.code
                );
                ProbeResult::failed(request, err)
            }
        };
        info!(
            "{} [{}]: {}.",
            request.site.url, result.language, result.outcome
        );
        result
    }

    fn conclude(&self, request: &ProbeRequest, observation: Observation) -> ProbeResult {
        let outcome = classify(&request.language, &observation, self.config.strict);
        let error = match outcome {
            Outcome::Error => Some(format!("HTTP {}", observation.status)),
            _ => None,
        };
        let (detected_language, detected_from) = match observation.hint {
            Some((tag, source)) => (Some(tag), Some(source)),
            None => (None, None),
        };
        ProbeResult {
            site: request.site.label(),
            url: request.site.url.clone(),
            language: request.language.code.clone(),
            status: Some(observation.status.as_u16()),
            final_url: observation.final_url.map(|url| url.to_string()),
            redirects: observation
                .redirects
                .iter()
                .map(|url| url.to_string())
                .collect(),
            content_language: observation.content_language,
            detected_language,
            detected_from,
            outcome,
            error,
        }
    }

    /// Walk the redirect chain by hand so each hop keeps our headers.
    async fn follow(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let mut current = Url::parse(request.site.url.trim()).map_err(|err| {
            ProbeError::InvalidUrl {
                url: request.site.url.clone(),
                reason: err.to_string(),
            }
        })?;
        let mut redirects = Vec::new();
        loop {
            let response = self.send(&current, &request.language).await?;
            let status = response.status();
            debug!("{current} [{}]: {status}.", request.language.code);
            if status.is_redirection() {
                if let Some(next) = redirect_target(&current, response.headers())? {
                    if redirects.len() == self.config.max_redirects {
                        return Err(ProbeError::TooManyRedirects {
                            limit: self.config.max_redirects,
                            hops: redirects.iter().map(Url::to_string).collect(),
                        });
                    }
                    debug!("{current} redirected to {next}.");
                    redirects.push(next.clone());
                    current = next;
                    continue;
                }
                warn!("{current}: redirect status {status} without a Location header.");
            }
            return self.observe(response, redirects).await;
        }
    }

    async fn send(&self, url: &Url, language: &Language) -> Result<Response, ProbeError> {
        let mut builder = self
            .client
            .request(self.config.method.clone(), url.clone())
            .header(header::ACCEPT_LANGUAGE, language.code.as_str());
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.header(header::USER_AGENT, user_agent.as_str());
        }
        builder
            .send()
            .await
            .map_err(|err| ProbeError::from_reqwest(err, self.config.timeout))
    }

    async fn observe(
        &self,
        mut response: Response,
        redirects: Vec<Url>,
    ) -> Result<Observation, ProbeError> {
        let status = response.status();
        let final_url = response.url().to_owned();
        let headers = response.headers().clone();
        let content_language = header_str(&headers, header::CONTENT_LANGUAGE)
            .and_then(first_content_language);

        let mut hint = content_language
            .clone()
            .map(|tag| (tag, HintSource::Header));
        if hint.is_none() && is_html(&headers) {
            // A broken body still leaves the status line and headers usable.
            match read_capped(&mut response, MAX_BODY_BYTES).await {
                Ok(body) => {
                    hint = html_lang(&String::from_utf8_lossy(&body))
                        .map(|tag| (tag, HintSource::Html));
                }
                Err(err) => warn!(
                    "{final_url}: reading body failed, skipping <html lang>: {}.",
                    ProbeError::from_reqwest(err, self.config.timeout)
                ),
            }
        }
        if hint.is_none() {
            hint = headers
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .find_map(cookie_locale)
                .map(|tag| (tag, HintSource::Cookie));
        }

        Ok(Observation {
            status,
            final_url: Some(final_url),
            redirects,
            content_language,
            hint,
        })
    }
}

fn redirect_target(current: &Url, headers: &HeaderMap) -> Result<Option<Url>, ProbeError> {
    let location = match headers.get(header::LOCATION) {
        Some(location) => location,
        None => return Ok(None),
    };
    let location = location
        .to_str()
        .map_err(|_| {
            ProbeError::BadLocation(String::from_utf8_lossy(location.as_bytes()).into_owned())
        })?;
    current
        .join(location)
        .map(Some)
        .map_err(|_| ProbeError::BadLocation(location.to_owned()))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value: &HeaderValue| value.to_str().ok())
}

fn is_html(headers: &HeaderMap) -> bool {
    header_str(headers, header::CONTENT_TYPE)
        .map_or(false, |content| content.contains("text/html"))
}

/// Read the body in chunks, stopping once `cap` bytes are in.
async fn read_capped(response: &mut Response, cap: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while body.len() < cap {
        let chunk: Option<Bytes> = response.chunk().await?;
        match chunk {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }
    body.truncate(cap);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn seen(status: u16) -> Observation {
        Observation {
            status: StatusCode::from_u16(status).unwrap(),
            final_url: Some(url("https://example.org/")),
            redirects: Vec::new(),
            content_language: None,
            hint: None,
        }
    }

    #[test]
    fn content_language_wins() {
        let observation = Observation {
            content_language: Some("kab".into()),
            hint: Some(("kab".into(), HintSource::Header)),
            ..seen(200)
        };
        assert_eq!(classify(&lang("kab"), &observation, false), Outcome::Localized);
        assert_eq!(classify(&lang("oci"), &observation, false), Outcome::Ignored);
    }

    #[test]
    fn region_variants_need_loose_matching() {
        let observation = Observation {
            hint: Some(("kab-DZ".into(), HintSource::Html)),
            ..seen(200)
        };
        assert_eq!(classify(&lang("kab"), &observation, false), Outcome::Localized);
        assert_eq!(classify(&lang("kab"), &observation, true), Outcome::Ignored);
    }

    #[test]
    fn redirect_to_language_path() {
        let observation = Observation {
            final_url: Some(url("https://example.org/kab/home")),
            redirects: vec![url("https://example.org/kab/home")],
            ..seen(200)
        };
        assert_eq!(classify(&lang("kab"), &observation, false), Outcome::Redirected);

        let elsewhere = Observation {
            final_url: Some(url("https://example.org/login")),
            redirects: vec![url("https://example.org/login")],
            ..seen(200)
        };
        assert_eq!(classify(&lang("kab"), &elsewhere, false), Outcome::Ignored);
    }

    #[test]
    fn error_statuses() {
        assert_eq!(classify(&lang("oci"), &seen(404), false), Outcome::Error);
        assert_eq!(classify(&lang("oci"), &seen(503), false), Outcome::Error);
        assert_eq!(classify(&lang("oci"), &seen(204), false), Outcome::Ignored);
    }

    #[test]
    fn language_in_urls() {
        let kab = lang("kab");
        let oci = lang("oci");
        assert!(url_names_language(&url("https://kab.example.org/"), &kab));
        assert!(url_names_language(&url("https://example.org/?hl=kab"), &kab));
        assert!(url_names_language(&url("https://example.org/oc/"), &oci));
        assert!(url_names_language(&url("https://example.org/oc-FR/x"), &oci));
        assert!(!url_names_language(&url("https://example.org/kabuki"), &kab));
        assert!(!url_names_language(&url("https://example.org/?q=kab"), &kab));
    }

    #[test]
    fn collisions_only_for_foreign_languages() {
        let mut result = ProbeResult::failed(
            &ProbeRequest {
                site: Site::new("https://example.org"),
                language: lang("kab"),
            },
            ProbeError::Connect("refused".into()),
        );
        assert!(result.is_error());
        assert!(!result.is_collision());

        result.outcome = Outcome::Ignored;
        result.detected_language = Some("kat".into());
        assert!(result.is_collision());
        result.detected_language = Some("en-US".into());
        assert!(!result.is_collision());
        result.detected_language = Some("zz".into());
        assert!(!result.is_collision());
        result.detected_language = Some("ka-GE".into());
        assert!(result.is_collision());
        result.detected_language = None;
        assert!(!result.is_collision());
    }

    #[test]
    fn redirect_overflow_keeps_hops() {
        let result = ProbeResult::failed(
            &ProbeRequest {
                site: Site::new("https://example.org/loop"),
                language: lang("oci"),
            },
            ProbeError::TooManyRedirects {
                limit: 2,
                hops: vec![
                    "https://example.org/loop".into(),
                    "https://example.org/loop".into(),
                ],
            },
        );
        assert_eq!(result.redirects.len(), 2);
        assert_eq!(
            result.error.as_deref(),
            Some("too many redirects (more than 2)")
        );
    }

    #[test]
    fn relative_locations_resolve() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/kab/"));
        let next = redirect_target(&url("https://example.org/a/b"), &headers).unwrap();
        assert_eq!(next, Some(url("https://example.org/kab/")));
        let none = redirect_target(&url("https://example.org/"), &HeaderMap::new()).unwrap();
        assert_eq!(none, None);
    }
}
