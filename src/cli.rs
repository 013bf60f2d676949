use clap::{Parser, Subcommand};
use scrapebench::config::{Config, HumanDuration};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scrapebench")]
#[command(about = "Load-generation harness for a scraper service", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $SCRAPEBENCH_CONFIG or config/scrapebench.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed URLs to the scraper and record results
    Run(RunArgs),
    /// Print the URLs a run would feed, without contacting the scraper
    Sample(SelectionArgs),
    /// Print the effective configuration as TOML
    #[command(name = "config")]
    ShowConfig(RunArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct SelectionArgs {
    /// Input file (one URL per line)
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Number of URLs to feed, 0 feeds all
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Pick URLs uniformly at random instead of the first N
    #[arg(short = 'r', long)]
    pub random: bool,
}

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Address of the scraper
    #[arg(short = 's', long)]
    pub scraper: Option<String>,

    /// Number of workers
    #[arg(short = 'N', long)]
    pub workers: Option<usize>,

    /// Ask the scraper for cookies
    #[arg(short = 'c', long)]
    pub cookies: bool,

    /// Proxy address forwarded to the scraper
    #[arg(short = 'p', long)]
    pub proxy: Option<String>,

    /// Result database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Per-request timeout (e.g. "5m", "90s")
    #[arg(long)]
    pub timeout: Option<HumanDuration>,
}

impl SelectionArgs {
    /// Flags win over file and environment settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(count) = self.count {
            config.pipeline.max_urls = count;
        }
        if self.random {
            config.pipeline.random = true;
        }
    }
}

impl RunArgs {
    pub fn apply(&self, config: &mut Config) {
        self.selection.apply(config);

        if let Some(scraper) = &self.scraper {
            config.scraper.base_url = scraper.clone();
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
        if self.cookies {
            config.scraper.cookies = true;
        }
        if let Some(proxy) = &self.proxy {
            config.scraper.proxy = Some(proxy.clone());
        }
        if let Some(db) = &self.db {
            config.storage.path = db.clone();
        }
        if let Some(timeout) = self.timeout {
            config.scraper.request_timeout = timeout;
        }
    }
}
