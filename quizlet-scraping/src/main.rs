use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use quizlet_scraping::{
    config::SiteConfig,
    driver::chrome::{ChromeLauncher, ChromeOptions},
    image::HttpImageDownloader,
    scrape::{scrape, ScrapeRequest},
};
use quizlet_scraping_utils::{
    credentials::Credentials,
    fs_json_util::{read_json, read_toml_or_default, write_json},
};
use url::Url;

#[derive(Parser)]
struct Opts {
    /// Page of the set to scrape.
    set_url: Url,
    /// Where the cards are written, as JSON.
    output_path: PathBuf,
    /// TOML file overriding selectors, timeouts and the login page.
    #[arg(long)]
    config_path: Option<PathBuf>,
    /// JSON file with `username` and `password`; log in first when given.
    #[arg(long)]
    credentials_path: Option<PathBuf>,
    /// Directory for downloaded images (system temp dir by default).
    #[arg(long)]
    image_dir: Option<PathBuf>,
    #[arg(long)]
    show_browser: bool,
    #[arg(long)]
    remote_debugging_port: Option<u16>,
    /// Chrome binary to use instead of the auto-detected one.
    #[arg(long)]
    browser_path: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let opts = Opts::parse();

    let config: SiteConfig = read_toml_or_default(opts.config_path.as_ref())?;
    let credentials: Option<Credentials> = opts
        .credentials_path
        .as_ref()
        .map(read_json)
        .transpose()?;
    if let Some(dir) = &opts.image_dir {
        fs_err::create_dir_all(dir)?;
    }

    let launcher = ChromeLauncher::new(ChromeOptions {
        headless: !opts.show_browser,
        remote_debugging_port: opts.remote_debugging_port,
        browser_path: opts.browser_path.clone(),
        ..ChromeOptions::default()
    });
    let downloader = HttpImageDownloader::new(opts.image_dir.clone())?;
    let request = ScrapeRequest {
        set_url: opts.set_url.as_str(),
        credentials: credentials.as_ref(),
    };
    let cards = scrape(&launcher, &downloader, &config, &request)
        .with_context(|| format!("While scraping {}", opts.set_url))?;

    write_json(&opts.output_path, &cards)?;
    let images = cards
        .iter()
        .filter(|card| card.back_image_path().is_some())
        .count();
    info!(
        "Saved {} cards ({images} with images) to {:?}.",
        cards.len(),
        opts.output_path
    );
    Ok(())
}
