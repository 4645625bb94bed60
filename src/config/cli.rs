use crate::config::toml_config::AppConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "corp-fetch")]
#[command(about = "Fetch corporate profiles from the ranking API and cluster them")]
#[command(version)]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the ranking GraphQL endpoint
    #[arg(long, global = true)]
    pub ranking_endpoint: Option<String>,

    /// Override the partner GraphQL endpoint
    #[arg(long, global = true)]
    pub partner_endpoint: Option<String>,

    /// Directory for written files
    #[arg(long, global = true)]
    pub output_path: Option<String>,

    /// Number of clusters
    #[arg(long, global = true)]
    pub clusters: Option<usize>,

    /// Stop fetching after this many pages
    #[arg(long, global = true)]
    pub max_pages: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Fetch every corporate once and write the collection to a file
    Fetch {
        /// Output file, relative to the output path
        #[arg(short, long, default_value = "corporates.json")]
        out: String,
    },
    /// Cluster a previously fetched collection
    Cluster {
        /// Collection file, relative to the output path
        #[arg(short, long, default_value = "corporates.json")]
        input: String,

        /// Report file, relative to the output path
        #[arg(short, long)]
        out: Option<String>,
    },
}

impl CliConfig {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Serve { bind: None })
    }

    /// 載入設定檔 (若有)，套用命令列覆蓋後驗證
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                AppConfig::from_file(path)?
            }
            None => AppConfig::default(),
        };

        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(endpoint) = &self.ranking_endpoint {
            config.ranking.endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &self.partner_endpoint {
            config.partners.endpoint = endpoint.clone();
        }
        if let Some(path) = &self.output_path {
            config.output.path = path.clone();
        }
        if let Some(clusters) = self.clusters {
            config.clustering.clusters = clusters;
        }
        if self.max_pages.is_some() {
            config.ranking.max_pages = self.max_pages;
        }

        match &self.command {
            Some(Command::Serve { bind: Some(bind) }) => config.server.bind = bind.clone(),
            Some(Command::Cluster { out: Some(out), .. }) => {
                config.clustering.output_file = out.clone()
            }
            _ => {}
        }
    }
}
