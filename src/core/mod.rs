pub mod clustering;
pub mod fetcher;
pub mod service;
pub mod state;

pub use crate::domain::ports::{CorporateSource, PartnerCounter, Storage};
pub use crate::utils::error::Result;
pub use fetcher::{CorporateFetcher, FetchSummary};
pub use service::CorporateService;
pub use state::{SharedState, StartOutcome};
