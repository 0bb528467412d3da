use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use langprobe::{
    config::Device,
    interactive::{self, Preset, Prompter},
    io::emit,
    probe::{Outcome, Prober},
    report::{Format, Report},
    settings::{single_language, Overrides, RunSettings},
    sites::{self, default_sites, Site, SiteFile},
};
use log::{debug, info};
use tokio::io::{stdin, stdout, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    debug!("Starting with {args:#?}.");

    let site_file = match &args.sites {
        Some(path) => sites::load(path).await?,
        None => SiteFile {
            sites: default_sites(),
            ..SiteFile::default()
        },
    };
    let overrides = Overrides {
        languages: args.lang.clone(),
        timeout: args.timeout,
        max_redirects: args.max_redirects,
        workers: args.workers,
        user_agent: args.user_agent.clone(),
        head: args.head,
        strict: args.strict,
    };
    let RunSettings {
        languages,
        workers,
        config,
    } = RunSettings::resolve(&overrides, &site_file)?;

    if args.report {
        let prober = Prober::new(config.device(args.device.unwrap_or_default()))
            .context("building HTTP client")?;
        let report = Report::generate(&prober, &site_file.sites, &languages, workers).await;
        info!(
            "{} probes done, {} errors.",
            report.results.len(),
            report.count(Outcome::Error)
        );
        let rendered = report.render(args.format)?;
        emit(args.output.as_ref(), rendered)
            .await
            .context("writing report")?;
    } else {
        let preset = Preset {
            site: args.site.map(Site::new),
            language: single_language(&args.lang)?,
            device: args.device,
        };
        let mut prompter = Prompter::new(BufReader::new(stdin()), stdout());
        interactive::run(&mut prompter, config, &site_file.sites, &languages, preset).await?;
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[clap(
    author,
    version,
    about = "Probes websites with Occitan (oci) and Kabyle (kab) Accept-Language headers.

Without --report, asks for one site, language and device and prints that probe.\n\
With --report, probes every site in the list with every language."
)]
struct Args {
    #[clap(short, long, action, help = "Probe every site with every language.")]
    report: bool,
    #[clap(
        short,
        long,
        help = "Site list: a .toml file with [[sites]], or one `URL [name]` per line."
    )]
    sites: Option<PathBuf>,
    #[clap(
        short,
        long,
        help = "Language code to send; repeat for several. Defaults to oci and kab."
    )]
    lang: Vec<String>,
    #[clap(short = 'u', long, help = "Single site URL for interactive mode.")]
    site: Option<String>,
    #[clap(short, long, value_enum, help = "Device profile to probe as.")]
    device: Option<Device>,
    #[clap(short = 'a', long, help = "Custom User-Agent header.")]
    user_agent: Option<String>,
    #[clap(
        short,
        long,
        help = "Timeout for each probe in integer milliseconds."
    )]
    timeout: Option<u64>,
    #[clap(short, long, help = "Maximum redirects to follow.")]
    max_redirects: Option<usize>,
    #[clap(short, long, help = "Probes in flight at once; 1 is sequential.")]
    workers: Option<usize>,
    #[clap(long, action, help = "Send HEAD instead of GET.")]
    head: bool,
    #[clap(
        long,
        action,
        help = "Only exact language tags count as localized (no kab-DZ for kab)."
    )]
    strict: bool,
    #[clap(short, long, value_enum, default_value_t = Format::Table, help = "Report format.")]
    format: Format,
    #[clap(short, long, help = "Write the report here instead of stdout.")]
    output: Option<PathBuf>,
}
