// 以描述文字的 TF-IDF 加上主題標籤的 one-hot 特徵做 k-means 分群

pub mod kmeans;
pub mod tfidf;

use crate::domain::model::{ClusterInfo, ClusterMember, ClusterReport, Corporate};
use crate::utils::error::{AppError, Result};
use indexmap::IndexMap;
use ndarray::{concatenate, Array2, Axis};
use std::collections::BTreeSet;

pub use kmeans::{KMeans, KMeansFit};
pub use tfidf::{TfidfMatrix, TfidfVectorizer};

const UNKNOWN_COUNTRY: &str = "Unknown";
const TOP_COUNTRIES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub n_clusters: usize,
    pub max_iterations: usize,
    pub n_init: usize,
    pub seed: u64,
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            max_iterations: 300,
            n_init: 10,
            seed: 0,
            tolerance: 1e-4,
        }
    }
}

/// One-hot theme matrix; columns follow the sorted set of all tags.
fn theme_matrix(corporates: &[Corporate]) -> Array2<f64> {
    let tags_per_row: Vec<Vec<String>> = corporates.iter().map(Corporate::theme_tags).collect();
    let all_tags: BTreeSet<&str> = tags_per_row
        .iter()
        .flat_map(|tags| tags.iter().map(String::as_str))
        .collect();
    let columns: Vec<&str> = all_tags.into_iter().collect();

    let mut matrix = Array2::<f64>::zeros((corporates.len(), columns.len()));
    for (row, tags) in tags_per_row.iter().enumerate() {
        for tag in tags {
            if let Ok(col) = columns.binary_search(&tag.as_str()) {
                matrix[[row, col]] = 1.0;
            }
        }
    }
    matrix
}

/// Feature rows in the same order as `corporates`.
pub fn build_features(corporates: &[Corporate]) -> Result<Array2<f64>> {
    let descriptions: Vec<&str> = corporates.iter().map(Corporate::description_text).collect();
    let text = TfidfVectorizer::english().fit_transform(&descriptions);
    let themes = theme_matrix(corporates);

    tracing::debug!(
        "Feature matrix: {} terms, {} theme tags",
        text.vocabulary.len(),
        themes.ncols()
    );

    concatenate(Axis(1), &[text.matrix.view(), themes.view()]).map_err(|e| {
        AppError::ClusteringError {
            message: format!("failed to combine features: {}", e),
        }
    })
}

fn country_of(corporate: &Corporate) -> String {
    corporate
        .hq_country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string()
}

/// Counts sorted by count descending; ties keep first-seen order.
fn sorted_counts(counts: IndexMap<String, usize>) -> IndexMap<String, usize> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().collect()
}

/// Groups `corporates` into at most `params.n_clusters` clusters.
pub fn cluster_corporates(corporates: &[Corporate], params: &ClusterParams) -> Result<ClusterReport> {
    if corporates.is_empty() {
        return Err(AppError::NoData);
    }

    let k = params.n_clusters.min(corporates.len());
    if k < params.n_clusters {
        tracing::warn!(
            "⚠️ Only {} corporates, reducing clusters from {} to {}",
            corporates.len(),
            params.n_clusters,
            k
        );
    }

    let features = build_features(corporates)?;
    let fit = KMeans {
        n_clusters: k,
        max_iterations: params.max_iterations,
        n_init: params.n_init,
        tolerance: params.tolerance,
        seed: params.seed,
    }
    .fit(features.view())?;

    let mut members: Vec<Vec<&Corporate>> = vec![Vec::new(); k];
    for (corporate, label) in corporates.iter().zip(&fit.labels) {
        members[*label].push(corporate);
    }

    let mut clusters = IndexMap::new();
    let mut sorted_countries = IndexMap::new();
    let mut total: IndexMap<String, usize> = IndexMap::new();

    for (idx, group) in members.into_iter().enumerate() {
        let cluster_id = idx + 1;
        let key = format!("Cluster {}", cluster_id);

        let mut countries: IndexMap<String, usize> = IndexMap::new();
        for corporate in &group {
            let country = country_of(corporate);
            *total.entry(country.clone()).or_insert(0) += 1;
            *countries.entry(country).or_insert(0) += 1;
        }
        let countries = sorted_counts(countries);

        let top: Vec<(String, usize)> = countries
            .iter()
            .take(TOP_COUNTRIES)
            .map(|(c, n)| (c.clone(), *n))
            .collect();
        sorted_countries.insert(key.clone(), top);

        clusters.insert(
            key,
            ClusterInfo {
                cluster_id,
                companies: group
                    .iter()
                    .map(|c| ClusterMember { name: c.name.clone() })
                    .collect(),
                countries,
            },
        );
    }

    tracing::info!(
        "✅ Clustered {} corporates into {} clusters (inertia {:.4})",
        corporates.len(),
        k,
        fit.inertia
    );

    Ok(ClusterReport {
        clusters,
        sorted_countries,
        total_countries: sorted_counts(total),
        generated_at: chrono::Utc::now(),
    })
}
