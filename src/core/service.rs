use crate::adapters::{LocalStorage, PartnerClient, RankingClient};
use crate::config::toml_config::AppConfig;
use crate::core::clustering::{self, ClusterParams};
use crate::core::fetcher::{CorporateFetcher, FetchSummary};
use crate::core::state::{SharedState, StartOutcome};
use crate::domain::model::{ClusterReport, CorporateCollection};
use crate::domain::ports::Storage;
use crate::utils::error::{AppError, Result};
use std::sync::Arc;

pub const CLUSTERING_DONE_MESSAGE: &str = "Clustering performed successfully";

/// Shared state plus everything needed to fill it. Cheap to clone; handlers
/// each get their own copy.
#[derive(Clone)]
pub struct CorporateService {
    state: SharedState,
    fetcher: Arc<CorporateFetcher>,
    storage: Arc<dyn Storage>,
    params: ClusterParams,
    output_file: String,
}

impl CorporateService {
    pub fn new(
        fetcher: CorporateFetcher,
        storage: Arc<dyn Storage>,
        params: ClusterParams,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            state: SharedState::new(),
            fetcher: Arc::new(fetcher),
            storage,
            params,
            output_file: output_file.into(),
        }
    }

    /// Wires the real GraphQL clients and local storage from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let ranking = RankingClient::new(
            &config.ranking.endpoint,
            config.ranking_timeout(),
            &config.ranking.user_agent,
        )?;
        let partners = PartnerClient::new(&config.partners.endpoint, config.partner_timeout())?;
        let fetcher = CorporateFetcher::new(Arc::new(ranking), Arc::new(partners))
            .with_max_pages(config.ranking.max_pages);

        Ok(Self::new(
            fetcher,
            Arc::new(LocalStorage::new(&config.output.path)),
            config.clustering.params(),
            config.clustering.output_file.clone(),
        ))
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Claims the fetch slot and runs the fetch on a background task.
    pub async fn start_fetch(&self) -> StartOutcome {
        let outcome = self.state.try_begin_fetch().await;
        if outcome == StartOutcome::Started {
            let fetcher = self.fetcher.clone();
            let state = self.state.clone();
            tokio::spawn(async move {
                fetcher.run(&state).await;
            });
        } else {
            tracing::info!("💡 Fetch request ignored: {}", outcome.message());
        }
        outcome
    }

    /// Claims the fetch slot and waits for the fetch to finish. Used by the
    /// one-shot CLI command.
    pub async fn fetch_to_completion(&self) -> std::result::Result<FetchSummary, StartOutcome> {
        match self.state.try_begin_fetch().await {
            StartOutcome::Started => Ok(self.fetcher.run(&self.state).await),
            other => Err(other),
        }
    }

    pub async fn count_message(&self) -> String {
        format!("Total companies: {}", self.state.corporate_count().await)
    }

    /// Clusters the current collection, stores the report in memory and
    /// writes it to the output file. A failed write is logged only; the
    /// report stays available to the HTTP readers.
    pub async fn perform_clustering(&self) -> Result<ClusterReport> {
        let report = self.cluster_in_memory().await?;

        // 寫檔失敗不影響記憶體中的結果
        if let Err(e) = self.persist(&report).await {
            tracing::error!(
                "❌ Failed to write cluster report to {}: {}",
                self.storage.describe(&self.output_file),
                e
            );
            tracing::info!("💡 {}", e.recovery_suggestion());
        }

        Ok(report)
    }

    /// Same as `perform_clustering`, but a failed write is returned as the
    /// error. The `cluster` command has the file as its only output.
    pub async fn cluster_and_save(&self) -> Result<ClusterReport> {
        let report = self.cluster_in_memory().await?;
        self.persist(&report).await?;
        Ok(report)
    }

    async fn cluster_in_memory(&self) -> Result<ClusterReport> {
        let corporates = self.state.corporates().await;
        if corporates.is_empty() {
            return Err(AppError::NoData);
        }

        tracing::info!("🚀 Clustering {} corporates", corporates.len());
        let params = self.params.clone();
        let report = tokio::task::spawn_blocking(move || {
            clustering::cluster_corporates(&corporates, &params)
        })
        .await
        .map_err(|e| AppError::ClusteringError {
            message: format!("clustering task failed: {}", e),
        })??;

        self.state.set_clusters(report.clone()).await;
        Ok(report)
    }

    /// Message form of `perform_clustering` for the HTTP API.
    pub async fn clustering_message(&self) -> Result<String> {
        match self.perform_clustering().await {
            Ok(_) => Ok(CLUSTERING_DONE_MESSAGE.to_string()),
            Err(AppError::NoData) => Ok(AppError::NoData.to_string()),
            Err(e) => Err(e),
        }
    }

    /// Writes the current collection as pretty JSON; returns where it went.
    pub async fn export_collection(&self, path: &str) -> Result<String> {
        let collection = self.state.collection().await;
        let json = serde_json::to_vec_pretty(&collection)?;
        self.storage.write_file(path, &json).await?;

        let location = self.storage.describe(path);
        tracing::info!(
            "📄 Wrote {} corporates to {}",
            collection.corporate_count,
            location
        );
        Ok(location)
    }

    /// Loads a collection written by `export_collection` into the state.
    pub async fn import_collection(&self, path: &str) -> Result<usize> {
        let data = self.storage.read_file(path).await?;
        let collection: CorporateCollection = serde_json::from_slice(&data)?;
        if collection.corporate_count != collection.corporate_details.len() {
            tracing::warn!(
                "⚠️ {} declares {} corporates but holds {}",
                self.storage.describe(path),
                collection.corporate_count,
                collection.corporate_details.len()
            );
        }
        Ok(self.state.load_corporates(collection.corporate_details).await)
    }

    async fn persist(&self, report: &ClusterReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)?;
        self.storage.write_file(&self.output_file, &json).await?;
        tracing::info!(
            "📄 Cluster report written to {}",
            self.storage.describe(&self.output_file)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Corporate, CorporatePage, CorporateRow, FetchStatus};
    use crate::domain::ports::{CorporateSource, PartnerCounter};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct OnePageSource;

    #[async_trait]
    impl CorporateSource for OnePageSource {
        async fn fetch_page(&self, page: u32) -> Result<CorporatePage> {
            let rows = if page == 1 {
                ["x", "y", "z"]
                    .iter()
                    .map(|id| CorporateRow {
                        id: id.to_string(),
                        name: None,
                    })
                    .collect()
            } else {
                vec![]
            };
            Ok(CorporatePage { rows, count: None })
        }

        async fn fetch_details(&self, id: &str) -> Result<Corporate> {
            Ok(Corporate {
                name: format!("Corp {}", id),
                description: Some(format!("{} industrial robotics", id)),
                hq_country: Some("Japan".to_string()),
                ..Default::default()
            })
        }
    }

    struct NoPartners;

    #[async_trait]
    impl PartnerCounter for NoPartners {
        async fn count_partners(&self, _company_name: &str) -> u64 {
            0
        }
    }

    /// Storage that refuses every write.
    struct ReadOnlyStorage;

    #[async_trait]
    impl Storage for ReadOnlyStorage {
        async fn read_file(&self, _path: &str) -> Result<Vec<u8>> {
            Ok(vec![])
        }

        async fn write_file(&self, _path: &str, _data: &[u8]) -> Result<()> {
            Err(AppError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn service(storage: Arc<dyn Storage>) -> CorporateService {
        let fetcher = CorporateFetcher::new(Arc::new(OnePageSource), Arc::new(NoPartners));
        CorporateService::new(fetcher, storage, ClusterParams::default(), "clusters.json")
    }

    async fn wait_until_done(service: &CorporateService) {
        for _ in 0..200 {
            if service.state().status().await == FetchStatus::Done {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("fetch did not finish");
    }

    #[tokio::test]
    async fn test_start_fetch_runs_in_background_once() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(Arc::new(LocalStorage::new(temp_dir.path())));

        assert_eq!(service.start_fetch().await, StartOutcome::Started);
        wait_until_done(&service).await;

        assert_eq!(service.start_fetch().await, StartOutcome::AlreadyCompleted);
        assert_eq!(service.count_message().await, "Total companies: 3");
    }

    #[tokio::test]
    async fn test_clustering_without_data() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(Arc::new(LocalStorage::new(temp_dir.path())));

        assert_eq!(
            service.clustering_message().await.unwrap(),
            "No data to perform clustering"
        );
        assert!(service.state().clusters().await.is_none());
    }

    #[tokio::test]
    async fn test_clustering_writes_report() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(Arc::new(LocalStorage::new(temp_dir.path())));
        service.fetch_to_completion().await.unwrap();

        assert_eq!(
            service.clustering_message().await.unwrap(),
            CLUSTERING_DONE_MESSAGE
        );

        let written = std::fs::read(temp_dir.path().join("clusters.json")).unwrap();
        let report: ClusterReport = serde_json::from_slice(&written).unwrap();
        assert_eq!(report.clusters.len(), 3);
        assert_eq!(report.assigned_count(), 3);
        assert_eq!(report.total_countries.get("Japan"), Some(&3));
        assert!(service.state().clusters().await.is_some());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_report_in_memory() {
        let service = service(Arc::new(ReadOnlyStorage));
        service.fetch_to_completion().await.unwrap();

        let report = service.perform_clustering().await.unwrap();

        assert_eq!(service.state().clusters().await, Some(report));
    }

    #[tokio::test]
    async fn test_cluster_and_save_reports_write_failure() {
        let service = service(Arc::new(ReadOnlyStorage));
        service.fetch_to_completion().await.unwrap();

        let result = service.cluster_and_save().await;

        assert!(matches!(result, Err(AppError::IoError(_))));
        // 報告仍保留在記憶體中
        let held = service.state().clusters().await.unwrap();
        assert_eq!(held.assigned_count(), 3);
    }

    #[tokio::test]
    async fn test_cluster_and_save_writes_report() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(Arc::new(LocalStorage::new(temp_dir.path())));
        service.fetch_to_completion().await.unwrap();

        let report = service.cluster_and_save().await.unwrap();

        let written = std::fs::read(temp_dir.path().join("clusters.json")).unwrap();
        let on_disk: ClusterReport = serde_json::from_slice(&written).unwrap();
        assert_eq!(on_disk.clusters, report.clusters);
    }

    #[tokio::test]
    async fn test_cluster_and_save_without_data() {
        let service = service(Arc::new(ReadOnlyStorage));

        assert!(matches!(
            service.cluster_and_save().await,
            Err(AppError::NoData)
        ));
    }

    #[tokio::test]
    async fn test_export_then_import_into_fresh_service() {
        let temp_dir = TempDir::new().unwrap();
        let first = service(Arc::new(LocalStorage::new(temp_dir.path())));
        first.fetch_to_completion().await.unwrap();

        let location = first.export_collection("corporates.json").await.unwrap();
        assert!(location.ends_with("corporates.json"));

        let second = service(Arc::new(LocalStorage::new(temp_dir.path())));
        assert_eq!(second.import_collection("corporates.json").await.unwrap(), 3);
        assert_eq!(second.state().corporates().await, first.state().corporates().await);
        assert_eq!(second.state().status().await, FetchStatus::Done);
    }

    #[tokio::test]
    async fn test_fetch_to_completion_refuses_second_run() {
        let service = service(Arc::new(ReadOnlyStorage));

        let summary = service.fetch_to_completion().await.unwrap();
        assert_eq!(summary.corporates, 3);
        assert_eq!(
            service.fetch_to_completion().await.unwrap_err(),
            StartOutcome::AlreadyCompleted
        );
    }
}
