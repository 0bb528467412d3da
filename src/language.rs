//! Language codes we know how to ask for, and how to read back what a
//! server says it served.
use std::sync::OnceLock;

use regex::Regex;
use select::{document::Document, predicate::Name};

/// Codes a report covers unless told otherwise.
pub const DEFAULT_LANGUAGES: [&str; 2] = ["oci", "kab"];

/// `(code, English name)`. Occitan and Kabyle first, then the `ka*`
/// neighbours that tend to collide with `kab`.
pub const CATALOG: [(&str, &str); 10] = [
    ("oci", "Occitan"),
    ("kab", "Kabyle"),
    ("kam", "Kamba"),
    ("kac", "Kachin"),
    ("kal", "Greenlandic"),
    ("kar", "Karen"),
    ("kat", "Georgian"),
    ("kau", "Kanuri"),
    ("kaw", "Kawi"),
    ("kaz", "Kazakh"),
];

/// Tags a server may answer with that still mean the requested language.
const ALTERNATES: [(&str, &str); 1] = [("oci", "oc")];

/// Tags a server falls back to when it does not know the requested one.
const FALLBACKS: [&str; 1] = ["en"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub name: Option<&'static str>,
}

impl Language {
    /// Lowercases `code` and checks it looks like a language tag.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        if !is_valid_tag(&code) {
            return None;
        }
        let name = CATALOG
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| *name);
        Some(Self { code, name })
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_LANGUAGES
            .iter()
            .filter_map(|code| Self::parse(code))
            .collect()
    }

    /// The requested code plus any alternate spelling.
    pub fn accepted_codes(&self) -> Vec<&str> {
        let mut codes = vec![self.code.as_str()];
        codes.extend(
            ALTERNATES
                .iter()
                .filter(|(code, _)| *code == self.code)
                .map(|(_, alt)| *alt),
        );
        codes
    }

    /// Whether a served tag counts as this language.
    ///
    /// Loose matching accepts any tag starting with the code (`kab-DZ` for
    /// `kab`) or an alternate with a region (`oc-FR` for `oci`); strict
    /// matching wants an accepted code itself.
    pub fn matches(&self, served: &str, strict: bool) -> bool {
        let served = served.trim().to_ascii_lowercase();
        if strict {
            return self.accepted_codes().contains(&served.as_str());
        }
        if served.starts_with(&self.code) {
            return true;
        }
        self.accepted_codes()
            .iter()
            .any(|code| primary_subtag(&served) == *code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name {
            Some(name) => write!(f, "{} ({name})", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

pub fn is_fallback(tag: &str) -> bool {
    let primary = primary_subtag(tag);
    FALLBACKS.iter().any(|fallback| primary == *fallback)
}

pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Loose BCP 47 shape check: a 2 to 8 letter primary subtag followed by
/// alphanumeric subtags of up to 8 characters.
pub fn is_valid_tag(tag: &str) -> bool {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,8}([-_][A-Za-z0-9]{1,8})*$").expect("static regex")
    })
    .is_match(tag.trim())
}

/// Whether the primary subtag is an ISO 639-1 or 639-3 code.
pub fn is_registered(tag: &str) -> bool {
    if !is_valid_tag(tag) {
        return false;
    }
    let primary = primary_subtag(tag);
    match primary.len() {
        2 => isolang::Language::from_639_1(&primary).is_some(),
        3 => isolang::Language::from_639_3(&primary).is_some(),
        _ => false,
    }
}

/// First value of a `Content-Language` header, which may list several.
pub fn first_content_language(header: &str) -> Option<String> {
    header
        .split(',')
        .map(str::trim)
        .find(|tag| !tag.is_empty())
        .map(str::to_owned)
}

/// `<html lang="...">` of a page, if any.
pub fn html_lang(html: &str) -> Option<String> {
    let document = Document::from(html);
    let lang = document
        .find(Name("html"))
        .next()
        .and_then(|node| node.attr("lang").or_else(|| node.attr("xml:lang")))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned);
    lang
}

/// Locale preference some sites store in a cookie as `ae=l=<tag>`.
pub fn cookie_locale(set_cookie: &str) -> Option<String> {
    static COOKIE: OnceLock<Regex> = OnceLock::new();
    COOKIE
        .get_or_init(|| Regex::new(r"ae=l=([-a-zA-Z]+)").expect("static regex"))
        .captures(set_cookie)
        .map(|captures| captures[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_and_names() {
        let kab = Language::parse(" KAB ").unwrap();
        assert_eq!(kab.code, "kab");
        assert_eq!(kab.name, Some("Kabyle"));
        assert_eq!(kab.to_string(), "kab (Kabyle)");

        let other = Language::parse("br").unwrap();
        assert_eq!(other.name, None);
        assert!(Language::parse("k").is_none());
        assert!(Language::parse("kab;q=0.9").is_none());
    }

    #[test]
    fn loose_and_strict_matching() {
        let kab = Language::parse("kab").unwrap();
        assert!(kab.matches("kab", true));
        assert!(kab.matches("KAB", true));
        assert!(kab.matches("kab-DZ", false));
        assert!(!kab.matches("kab-DZ", true));
        assert!(!kab.matches("ka", false));
        assert!(!kab.matches("kat", false));

        let oci = Language::parse("oci").unwrap();
        assert!(oci.matches("oc", true));
        assert!(oci.matches("oc-FR", false));
        assert!(!oci.matches("ocx", false));
        assert!(!oci.matches("fr", false));
    }

    #[test]
    fn hints_from_responses() {
        assert_eq!(
            first_content_language(" kab, fr").as_deref(),
            Some("kab")
        );
        assert_eq!(first_content_language(" , "), None);
        assert_eq!(
            html_lang(r#"<!doctype html><html class="x" lang="oc"><body></body></html>"#)
                .as_deref(),
            Some("oc")
        );
        assert_eq!(html_lang("<html><body>hi</body></html>"), None);
        assert_eq!(
            cookie_locale("ae=l=kab-DZ; Path=/").as_deref(),
            Some("kab-DZ")
        );
        assert_eq!(cookie_locale("session=abc"), None);
    }

    #[test]
    fn registered_tags() {
        assert!(is_registered("kat"));
        assert!(is_registered("ka-GE"));
        assert!(is_registered("kab_DZ"));
        assert!(is_registered("EN"));
        assert!(!is_registered("zz"));
        assert!(!is_registered("klingons"));
        assert!(!is_registered("k@t"));
    }

    #[test]
    fn fallbacks() {
        assert!(is_fallback("en"));
        assert!(is_fallback("en-US"));
        assert!(!is_fallback("eu"));
    }
}
