use crate::core::state::SharedState;
use crate::domain::ports::{CorporateSource, PartnerCounter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Non-empty pages processed.
    pub pages: u32,
    pub corporates: usize,
    /// True when a request failure ended the loop early.
    pub aborted: bool,
}

/// Walks the ranking API page by page, enriching every corporate with its
/// partner count before appending it to the shared collection.
#[derive(Clone)]
pub struct CorporateFetcher {
    source: Arc<dyn CorporateSource>,
    partners: Arc<dyn PartnerCounter>,
    max_pages: Option<u32>,
}

impl CorporateFetcher {
    pub fn new(source: Arc<dyn CorporateSource>, partners: Arc<dyn PartnerCounter>) -> Self {
        Self {
            source,
            partners,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Runs the loop and marks the fetch done however it ended. The caller
    /// must already have claimed the fetch via `SharedState::try_begin_fetch`.
    pub async fn run(&self, state: &SharedState) -> FetchSummary {
        tracing::info!("🚀 Starting corporate fetch");
        let summary = self.paginate(state).await;
        state.finish_fetch().await;

        if summary.aborted {
            tracing::warn!(
                "⚠️ Fetch stopped early after {} pages, {} corporates",
                summary.pages,
                summary.corporates
            );
        } else {
            tracing::info!(
                "✅ Fetch completed: {} pages, {} corporates",
                summary.pages,
                summary.corporates
            );
        }
        summary
    }

    async fn paginate(&self, state: &SharedState) -> FetchSummary {
        let mut summary = FetchSummary::default();
        let mut page: u32 = 1;

        loop {
            if let Some(max_pages) = self.max_pages {
                if summary.pages >= max_pages {
                    tracing::info!("Reached page limit ({})", max_pages);
                    break;
                }
            }

            let listing = match self.source.fetch_page(page).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!("❌ Failed to fetch page {}: {}", page, e);
                    summary.aborted = true;
                    break;
                }
            };

            if listing.rows.is_empty() {
                tracing::debug!("Page {} is empty, stopping", page);
                break;
            }
            summary.pages += 1;

            for row in listing.rows {
                let mut corporate = match self.source.fetch_details(&row.id).await {
                    Ok(corporate) => corporate,
                    Err(e) => {
                        tracing::error!("❌ Failed to fetch details for corporate {}: {}", row.id, e);
                        summary.aborted = true;
                        return summary;
                    }
                };

                // 以合作夥伴 API 的不重複數量覆蓋上游提供的數值
                corporate.startup_partners_count = self.partners.count_partners(&corporate.name).await;

                tracing::debug!(
                    "Fetched '{}' ({} partners)",
                    corporate.name,
                    corporate.startup_partners_count
                );
                state.push_corporate(corporate).await;
                summary.corporates += 1;
            }

            tracing::info!(
                "📄 Page {} done, {} corporates so far",
                page,
                state.corporate_count().await
            );
            page += 1;
        }

        summary
    }
}
