use crate::domain::model::{Corporate, CorporatePage};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Where `path` ends up, for log lines and CLI output.
    fn describe(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Paged source of corporate profiles.
#[async_trait]
pub trait CorporateSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<CorporatePage>;
    async fn fetch_details(&self, id: &str) -> Result<Corporate>;
}

/// Counts distinct startup partners for a company. Never fails; lookups that
/// go wrong count as zero.
#[async_trait]
pub trait PartnerCounter: Send + Sync {
    async fn count_partners(&self, company_name: &str) -> u64;
}
