use crate::models::{NumericColumn, Track};
use rand::Rng;
use rand::seq::index;
use serde::Serialize;
use std::collections::BTreeMap;

/// Five-number summary with Tukey fences, the data behind a box or violin plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let q1 = quantile(&values, 0.25)?;
        let median = quantile(&values, 0.5)?;
        let q3 = quantile(&values, 0.75)?;
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = values.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
        let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count: values.len(),
            min: values[0],
            q1,
            median,
            q3,
            max: values[values.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers: values
                .iter()
                .copied()
                .filter(|v| *v < low_fence || *v > high_fence)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram; every bin is half-open except the last one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub mean: f64,
}

impl Histogram {
    pub fn from_values(values: &[f64], bin_count: usize) -> Option<Self> {
        if values.is_empty() || bin_count == 0 {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = mean(values.iter().copied())?;

        if min == max {
            return Some(Self {
                bins: vec![HistogramBin {
                    start: min,
                    end: max,
                    count: values.len(),
                }],
                mean,
            });
        }

        let width = (max - min) / bin_count as f64;
        let mut bins: Vec<HistogramBin> = (0..bin_count)
            .map(|i| HistogramBin {
                start: min + width * i as f64,
                end: if i + 1 == bin_count {
                    max
                } else {
                    min + width * (i + 1) as f64
                },
                count: 0,
            })
            .collect();

        for value in values {
            let slot = (((value - min) / width).floor() as usize).min(bin_count - 1);
            bins[slot].count += 1;
        }

        Some(Self { bins, mean })
    }
}

/// Pairwise Pearson correlations; `None` where a column has no variance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<NumericColumn>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(tracks: &[&Track], columns: &[NumericColumn]) -> Self {
        let series: Vec<Vec<f64>> = columns
            .iter()
            .map(|column| tracks.iter().map(|t| column.value(t)).collect())
            .collect();

        let values = series
            .iter()
            .map(|xs| series.iter().map(|ys| pearson(xs, ys)).collect())
            .collect();

        Self {
            columns: columns.to_vec(),
            values,
        }
    }

    pub fn get(&self, a: NumericColumn, b: NumericColumn) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == a)?;
        let j = self.columns.iter().position(|c| *c == b)?;
        self.values[i][j]
    }
}

/// Share of one label among a set of values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueShare {
    pub label: String,
    pub count: usize,
    pub proportion: f64,
}

pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn column_mean(tracks: &[&Track], column: NumericColumn) -> Option<f64> {
    mean(tracks.iter().map(|t| column.value(t)))
}

pub fn column_values(tracks: &[&Track], column: NumericColumn) -> Vec<f64> {
    tracks.iter().map(|t| column.value(t)).collect()
}

/// Linear-interpolated quantile of already sorted values
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs.iter().copied())?;
    let mean_y = mean(ys.iter().copied())?;

    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((covariance / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Tracks grouped by genre, genres in ascending order
pub fn group_by_genre<'a>(tracks: &[&'a Track]) -> BTreeMap<&'a str, Vec<&'a Track>> {
    let mut groups: BTreeMap<&str, Vec<&Track>> = BTreeMap::new();
    for &track in tracks {
        groups.entry(track.track_genre.as_str()).or_default().push(track);
    }
    groups
}

/// First entry holding the maximum value
pub fn idxmax(entries: &[(String, f64)]) -> Option<(String, f64)> {
    entries
        .iter()
        .fold(None::<&(String, f64)>, |best, entry| match best {
            Some(current) if current.1 >= entry.1 => Some(current),
            _ => Some(entry),
        })
        .cloned()
}

/// Sample up to `n` tracks without replacement, keeping their table order
pub fn sample_tracks<'a, R: Rng + ?Sized>(
    tracks: &[&'a Track],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Track> {
    if n >= tracks.len() {
        return tracks.to_vec();
    }
    let mut picked = index::sample(rng, tracks.len(), n).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| tracks[i]).collect()
}
