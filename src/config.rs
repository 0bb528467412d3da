use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Method};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_WORKERS: usize = 4;
/// Cap on how much of a page is read looking for `<html lang>`.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (Android 13; Mobile; rv:109.0) Gecko/109.0 Firefox/119.0";

/// User-Agent profiles to probe as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Device {
    /// The HTTP client's own User-Agent.
    #[default]
    Desktop,
    /// Firefox on Android.
    Mobile,
}

impl Device {
    pub fn user_agent(self) -> Option<&'static str> {
        match self {
            Device::Desktop => None,
            Device::Mobile => Some(MOBILE_USER_AGENT),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: Option<String>,
    pub method: Method,
    pub strict: bool,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: None,
            method: Method::GET,
            strict: false,
        }
    }
}

impl ProberConfig {
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn max_redirects(self, max_redirects: usize) -> Self {
        Self {
            max_redirects,
            ..self
        }
    }

    pub fn user_agent(self, user_agent: String) -> Self {
        Self {
            user_agent: Some(user_agent),
            ..self
        }
    }

    /// Use the device's User-Agent unless one was set explicitly.
    pub fn device(self, device: Device) -> Self {
        match (device.user_agent(), &self.user_agent) {
            (Some(user_agent), None) => self.user_agent(user_agent.to_owned()),
            _ => self,
        }
    }

    pub fn head(self) -> Self {
        Self {
            method: Method::HEAD,
            ..self
        }
    }

    pub fn strict(self) -> Self {
        Self {
            strict: true,
            ..self
        }
    }

    /// Client with redirects disabled so the prober can record every hop.
    pub fn client(&self) -> Result<Client> {
        let client = Client::builder()
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(client)
    }
}
