use crate::domain::model::{ClusterReport, Corporate, CorporateCollection, FetchStatus};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of asking to start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    AlreadyCompleted,
}

impl StartOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            StartOutcome::Started => "Fetch started",
            StartOutcome::AlreadyRunning => "Fetch is already running",
            StartOutcome::AlreadyCompleted => "Fetch is already completed",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    status: FetchStatus,
    corporates: Vec<Corporate>,
    clusters: Option<ClusterReport>,
}

/// Process-wide fetch status, collected corporates and the last cluster
/// report. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<Inner>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 檢查並設定狀態在同一把寫鎖內完成，避免同時啟動兩個抓取任務
    pub async fn try_begin_fetch(&self) -> StartOutcome {
        let mut inner = self.inner.write().await;
        match inner.status {
            FetchStatus::Started => StartOutcome::AlreadyRunning,
            FetchStatus::Done => StartOutcome::AlreadyCompleted,
            FetchStatus::NotStarted => {
                inner.corporates.clear();
                inner.status = FetchStatus::Started;
                StartOutcome::Started
            }
        }
    }

    /// Appends one corporate and returns the new total.
    pub async fn push_corporate(&self, corporate: Corporate) -> usize {
        let mut inner = self.inner.write().await;
        inner.corporates.push(corporate);
        inner.corporates.len()
    }

    /// Replaces the collection with previously saved records and marks the
    /// fetch done.
    pub async fn load_corporates(&self, corporates: Vec<Corporate>) -> usize {
        let mut inner = self.inner.write().await;
        inner.corporates = corporates;
        inner.status = FetchStatus::Done;
        inner.corporates.len()
    }

    pub async fn finish_fetch(&self) {
        self.inner.write().await.status = FetchStatus::Done;
    }

    pub async fn status(&self) -> FetchStatus {
        self.inner.read().await.status
    }

    pub async fn corporate_count(&self) -> usize {
        self.inner.read().await.corporates.len()
    }

    /// Status and count read under one lock.
    pub async fn progress(&self) -> (FetchStatus, usize) {
        let inner = self.inner.read().await;
        (inner.status, inner.corporates.len())
    }

    pub async fn corporates(&self) -> Vec<Corporate> {
        self.inner.read().await.corporates.clone()
    }

    pub async fn collection(&self) -> CorporateCollection {
        CorporateCollection::from_details(self.corporates().await)
    }

    pub async fn set_clusters(&self, report: ClusterReport) {
        self.inner.write().await.clusters = Some(report);
    }

    pub async fn clusters(&self) -> Option<ClusterReport> {
        self.inner.read().await.clusters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corporate(name: &str) -> Corporate {
        Corporate {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_begin_fetch_transitions() {
        let state = SharedState::new();
        assert_eq!(state.status().await, FetchStatus::NotStarted);

        assert_eq!(state.try_begin_fetch().await, StartOutcome::Started);
        assert_eq!(state.status().await, FetchStatus::Started);
        assert_eq!(state.try_begin_fetch().await, StartOutcome::AlreadyRunning);

        state.finish_fetch().await;
        assert_eq!(state.try_begin_fetch().await, StartOutcome::AlreadyCompleted);
        assert_eq!(state.status().await, FetchStatus::Done);
    }

    #[tokio::test]
    async fn test_concurrent_begin_fetch_starts_once() {
        let state = SharedState::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let state = state.clone();
            handles.push(tokio::spawn(async move { state.try_begin_fetch().await }));
        }

        let mut started = 0;
        for handle in handles {
            if handle.await.unwrap() == StartOutcome::Started {
                started += 1;
            }
        }
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn test_push_and_collection_count() {
        let state = SharedState::new();
        state.try_begin_fetch().await;

        assert_eq!(state.push_corporate(corporate("A")).await, 1);
        assert_eq!(state.push_corporate(corporate("B")).await, 2);

        let collection = state.collection().await;
        assert_eq!(collection.corporate_count, 2);
        assert_eq!(collection.corporate_details[1].name, "B");
        assert_eq!(state.progress().await, (FetchStatus::Started, 2));
    }

    #[tokio::test]
    async fn test_load_corporates_marks_done() {
        let state = SharedState::new();
        let loaded = state
            .load_corporates(vec![corporate("A"), corporate("B")])
            .await;

        assert_eq!(loaded, 2);
        assert_eq!(state.progress().await, (FetchStatus::Done, 2));
        assert_eq!(state.try_begin_fetch().await, StartOutcome::AlreadyCompleted);
    }

    #[test]
    fn test_start_outcome_messages() {
        assert_eq!(StartOutcome::Started.message(), "Fetch started");
        assert_eq!(StartOutcome::AlreadyRunning.message(), "Fetch is already running");
        assert_eq!(StartOutcome::AlreadyCompleted.message(), "Fetch is already completed");
    }
}
