pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, PartnerClient, RankingClient};
pub use config::AppConfig;
pub use crate::core::{CorporateFetcher, CorporateService, SharedState, StartOutcome};
pub use http::HttpServer;
pub use utils::error::{AppError, Result};
