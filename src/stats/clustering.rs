//! Clustering Module
//! K-means over every numeric column:
//! Init → Assign → Update → (Converged | Iterate) → Done.
//!
//! Initial centroids come from a [`RowSampler`], so a run can be pinned to
//! specific rows or to a seeded random generator.

use crate::config::KMeansSettings;
use crate::data::Table;
use crate::error::{AnalyticsError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Chooses the rows whose coordinates seed the initial centroids.
pub trait RowSampler {
    /// Return `k` row positions in `0..n_rows`; repeats are allowed.
    fn sample(&mut self, n_rows: usize, k: usize) -> Vec<usize>;
}

/// Uniform sampling with replacement from any `rand` generator.
pub struct RandomSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSampler<StdRng> {
    /// Seeded when `seed` is set, entropy-seeded otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> RowSampler for RandomSampler<R> {
    fn sample(&mut self, n_rows: usize, k: usize) -> Vec<usize> {
        (0..k).map(|_| self.rng.gen_range(0..n_rows)).collect()
    }
}

/// Fixed seed rows, cycled if fewer than `k` are given.
#[derive(Debug, Clone)]
pub struct FixedSampler(pub Vec<usize>);

impl RowSampler for FixedSampler {
    fn sample(&mut self, n_rows: usize, k: usize) -> Vec<usize> {
        if self.0.is_empty() {
            return vec![0; k];
        }
        self.0.iter().cycle().take(k).map(|&i| i.min(n_rows - 1)).collect()
    }
}

/// One row's cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub row: usize,
    pub cluster: usize,
}

/// Outcome of a k-means run. Centroids are not retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub k: usize,
    pub features: Vec<String>,
    pub assignments: Vec<ClusterAssignment>,
    pub iterations: usize,
    /// False when the iteration cap stopped the run.
    pub converged: bool,
    /// Clusters that received no rows in the final round and kept their previous centroid.
    pub stale_clusters: Vec<usize>,
    /// Rows with a non-Number cell in some feature column.
    pub skipped_rows: Vec<usize>,
}

impl ClusteringResult {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for a in &self.assignments {
            sizes[a.cluster] += 1;
        }
        sizes
    }
}

type Centroid = Vec<f64>;

fn euclidean_dist_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid per point; ties go to the lowest centroid index.
fn assign(points: &[Vec<f64>], centroids: &[Centroid]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = euclidean_dist_sq(point, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Coordinate-wise mean of each cluster; empty clusters keep their centroid and are reported.
fn update(
    points: &[Vec<f64>],
    labels: &[usize],
    centroids: &[Centroid],
) -> (Vec<Centroid>, Vec<usize>) {
    let d = centroids.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; d]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (point, &c) in points.iter().zip(labels) {
        counts[c] += 1;
        for (s, v) in sums[c].iter_mut().zip(point) {
            *s += v;
        }
    }

    let mut stale = Vec::new();
    let next = sums
        .into_iter()
        .enumerate()
        .map(|(c, mut sum)| {
            if counts[c] == 0 {
                stale.push(c);
                centroids[c].clone()
            } else {
                for v in &mut sum {
                    *v /= counts[c] as f64;
                }
                sum
            }
        })
        .collect();
    (next, stale)
}

fn unchanged(old: &[Centroid], new: &[Centroid], tolerance: f64) -> bool {
    old.iter()
        .zip(new)
        .all(|(a, b)| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance))
}

struct LloydRun {
    labels: Vec<usize>,
    centroids: Vec<Centroid>,
    iterations: usize,
    converged: bool,
    stale: Vec<usize>,
}

fn lloyd(points: &[Vec<f64>], initial: Vec<Centroid>, settings: &KMeansSettings) -> LloydRun {
    let mut centroids = initial;
    let mut labels = Vec::new();
    let mut stale = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        iterations += 1;
        labels = assign(points, &centroids);
        let (next, empty) = update(points, &labels, &centroids);
        stale = empty;
        let done = unchanged(&centroids, &next, settings.tolerance);
        centroids = next;
        debug!(iteration = iterations, stale = stale.len(), done, "k-means round");
        if done {
            converged = true;
            break;
        }
    }

    LloydRun {
        labels,
        centroids,
        iterations,
        converged,
        stale,
    }
}

pub struct ClusteringEngine;

impl ClusteringEngine {
    /// Cluster the table's rows on every numeric column.
    pub fn kmeans(
        table: &Table,
        k: usize,
        settings: &KMeansSettings,
        sampler: &mut dyn RowSampler,
    ) -> Result<ClusteringResult> {
        let features = table.numeric_columns();
        if features.is_empty() {
            return Err(AnalyticsError::InsufficientData {
                column: "<numeric columns>".to_string(),
                required: 1,
                actual: 0,
            });
        }

        let mut rows = Vec::new();
        let mut points = Vec::new();
        let mut skipped_rows = Vec::new();
        for (i, row) in table.rows().iter().enumerate() {
            let point: Option<Vec<f64>> = features.iter().map(|&c| row[c].as_number()).collect();
            match point {
                Some(p) => {
                    rows.push(i);
                    points.push(p);
                }
                None => skipped_rows.push(i),
            }
        }
        if !skipped_rows.is_empty() {
            warn!(count = skipped_rows.len(), "rows with non-numeric features skipped");
        }

        if k == 0 || k > points.len() {
            return Err(AnalyticsError::invalid(
                "k",
                format!("must be between 1 and {} (usable rows), got {k}", points.len()),
            ));
        }
        if settings.max_iterations == 0 {
            return Err(AnalyticsError::invalid("max_iterations", "must be positive"));
        }

        let initial: Vec<Centroid> = sampler
            .sample(points.len(), k)
            .into_iter()
            .map(|i| points[i.min(points.len() - 1)].clone())
            .collect();

        let run = lloyd(&points, initial, settings);
        if !run.stale.is_empty() {
            warn!(clusters = ?run.stale, "clusters left without rows");
        }
        debug!(centroids = ?run.centroids, "final centroids");
        info!(
            k,
            iterations = run.iterations,
            converged = run.converged,
            "k-means finished"
        );

        Ok(ClusteringResult {
            k,
            features: features
                .iter()
                .map(|&c| table.column_name(c).to_string())
                .collect(),
            assignments: rows
                .into_iter()
                .zip(run.labels)
                .map(|(row, cluster)| ClusterAssignment { row, cluster })
                .collect(),
            iterations: run.iterations,
            converged: run.converged,
            stale_clusters: run.stale,
            skipped_rows,
        })
    }
}
