//! Ad-hoc single probe, prompting for whatever was not given on the
//! command line.
use anyhow::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::{
    config::{Device, ProberConfig},
    language::Language,
    probe::{ProbeRequest, ProbeResult, Prober},
    report::describe,
    sites::Site,
};

pub struct Prompter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn ask(&mut self, question: &str) -> Result<String> {
        self.say(question).await?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_owned()),
            None => Err(Error::msg("input closed before a choice was made")),
        }
    }

    /// Pick by number, or type a URL.
    pub async fn choose_site(&mut self, sites: &[Site]) -> Result<Site> {
        let mut menu = String::from("\nChoose site to test:\n");
        for (index, site) in sites.iter().enumerate() {
            menu.push_str(&format!("  {}  {} <{}>\n", index + 1, site.label(), site.url));
        }
        self.say(&menu).await?;
        loop {
            let answer = self
                .ask(&format!("Enter 1-{} or a URL: ", sites.len()))
                .await?;
            if let Some(site) = pick(&answer, sites) {
                return Ok(site.clone());
            }
            if answer.starts_with("http://") || answer.starts_with("https://") {
                return Ok(Site::new(answer));
            }
            self.say("Please type a listed number or an http(s) URL.\n")
                .await?;
        }
    }

    /// Pick by number, or type any language code.
    pub async fn choose_language(&mut self, languages: &[Language]) -> Result<Language> {
        let mut menu = String::from("\nChoose Accept-Language:\n");
        for (index, language) in languages.iter().enumerate() {
            menu.push_str(&format!("  {}  {language}\n", index + 1));
        }
        self.say(&menu).await?;
        loop {
            let answer = self
                .ask(&format!("Enter 1-{} or a code: ", languages.len()))
                .await?;
            if let Some(language) = pick(&answer, languages) {
                return Ok(language.clone());
            }
            if let Some(language) = Language::parse(&answer) {
                return Ok(language);
            }
            self.say("Please type a listed number or a language code like `kab`.\n")
                .await?;
        }
    }

    pub async fn choose_device(&mut self) -> Result<Device> {
        self.say("\nChoose device profile:\n  1  desktop\n  2  mobile\n")
            .await?;
        loop {
            match self.ask("Enter 1 or 2: ").await?.as_str() {
                "1" | "desktop" => return Ok(Device::Desktop),
                "2" | "mobile" => return Ok(Device::Mobile),
                _ => self.say("Please type 1 or 2.\n").await?,
            }
        }
    }
}

fn pick<'a, T>(answer: &str, items: &'a [T]) -> Option<&'a T> {
    let index: usize = answer.parse().ok()?;
    index.checked_sub(1).and_then(|index| items.get(index))
}

/// What the command line already decided.
#[derive(Debug, Default)]
pub struct Preset {
    pub site: Option<Site>,
    pub language: Option<Language>,
    pub device: Option<Device>,
}

/// Prompt for the missing pieces, run one probe and print it.
pub async fn run<R, W>(
    prompter: &mut Prompter<R, W>,
    config: ProberConfig,
    sites: &[Site],
    languages: &[Language],
    preset: Preset,
) -> Result<ProbeResult>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let site = match preset.site {
        Some(site) => site,
        None => prompter.choose_site(sites).await?,
    };
    let language = match preset.language {
        Some(language) => language,
        None => prompter.choose_language(languages).await?,
    };
    let device = match preset.device {
        Some(device) => device,
        None => prompter.choose_device().await?,
    };

    let prober = Prober::new(config.device(device))?;
    prompter
        .say(&format!(
            "\nTesting {} with Accept-Language: {} ({device:?}) ...\n\n",
            site.url, language.code
        ))
        .await?;
    let result = prober.probe(&ProbeRequest { site, language }).await;
    prompter.say(&describe(&result)).await?;
    Ok(result)
}
