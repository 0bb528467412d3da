//! This is intended to serve as a binary crate.
//!
//! Probes websites with `Accept-Language: oci` (Occitan) and
//! `Accept-Language: kab` (Kabyle) and reports whether each one localizes,
//! redirects to a localized variant, or ignores the header.
pub mod config;
pub mod error;
pub mod interactive;
pub mod io;
pub mod language;
pub mod probe;
pub mod report;
pub mod settings;
pub mod sites;
