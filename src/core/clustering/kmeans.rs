use crate::utils::error::{AppError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lloyd's k-means with k-means++ seeding and several restarts.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iterations: usize,
    pub n_init: usize,
    /// Relative to the mean per-feature variance of the input.
    pub tolerance: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Array2<f64>,
    pub inertia: f64,
    pub iterations: usize,
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the closest centroid.
fn nearest(point: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

fn mean_variance(data: ArrayView2<f64>) -> f64 {
    if data.ncols() == 0 || data.nrows() == 0 {
        return 0.0;
    }
    data.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

impl KMeans {
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<KMeansFit> {
        let n_samples = data.nrows();
        if self.n_clusters == 0 {
            return Err(AppError::ClusteringError {
                message: "number of clusters must be at least 1".to_string(),
            });
        }
        if self.n_clusters > n_samples {
            return Err(AppError::ClusteringError {
                message: format!(
                    "cannot form {} clusters from {} samples",
                    self.n_clusters, n_samples
                ),
            });
        }

        let tolerance = self.tolerance * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for run in 0..self.n_init.max(1) {
            let initial = self.init_plus_plus(data, &mut rng);
            let fit = self.lloyd(data, initial, tolerance);
            tracing::debug!(
                "k-means run {}: inertia {:.6} after {} iterations",
                run,
                fit.inertia,
                fit.iterations
            );

            let better = best.as_ref().map_or(true, |b| fit.inertia < b.inertia);
            if better {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| AppError::ClusteringError {
            message: "k-means produced no result".to_string(),
        })
    }

    /// k-means++: first centre uniform, the rest weighted by squared distance
    /// to the closest centre picked so far.
    fn init_plus_plus(&self, data: ArrayView2<f64>, rng: &mut StdRng) -> Array2<f64> {
        let n_samples = data.nrows();
        let mut centroids = Array2::<f64>::zeros((self.n_clusters, data.ncols()));

        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&data.row(first));

        let mut closest: Vec<f64> = data
            .axis_iter(Axis(0))
            .map(|p| squared_distance(p, centroids.row(0)))
            .collect();

        for c in 1..self.n_clusters {
            let pick = match WeightedIndex::new(&closest) {
                Ok(weights) => weights.sample(rng),
                // 所有點都與現有中心重合
                Err(_) => rng.gen_range(0..n_samples),
            };
            centroids.row_mut(c).assign(&data.row(pick));

            for (i, point) in data.axis_iter(Axis(0)).enumerate() {
                let dist = squared_distance(point, centroids.row(c));
                if dist < closest[i] {
                    closest[i] = dist;
                }
            }
        }

        centroids
    }

    fn lloyd(&self, data: ArrayView2<f64>, mut centroids: Array2<f64>, tolerance: f64) -> KMeansFit {
        let k = self.n_clusters;
        let mut labels = vec![0usize; data.nrows()];
        let mut iterations = 0;

        for _ in 0..self.max_iterations.max(1) {
            iterations += 1;
            for (i, point) in data.axis_iter(Axis(0)).enumerate() {
                labels[i] = nearest(point, &centroids).0;
            }

            let mut sums = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; k];
            for (i, point) in data.axis_iter(Axis(0)).enumerate() {
                let mut row = sums.row_mut(labels[i]);
                row += &point;
                counts[labels[i]] += 1;
            }

            let mut shift = 0.0;
            for c in 0..k {
                // 空群集保留原本的中心
                if counts[c] == 0 {
                    continue;
                }
                let updated: Array1<f64> = sums.row(c).mapv(|v| v / counts[c] as f64);
                shift += squared_distance(updated.view(), centroids.row(c));
                centroids.row_mut(c).assign(&updated);
            }

            if shift <= tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (i, point) in data.axis_iter(Axis(0)).enumerate() {
            let (label, dist) = nearest(point, &centroids);
            labels[i] = label;
            inertia += dist;
        }

        KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }
}
