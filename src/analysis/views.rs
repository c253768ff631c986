use super::filters::{FilterError, TrackFilter};
use super::frame;
use super::stats::{self, BoxSummary, CorrelationMatrix, ValueShare};
use crate::dataset::Dataset;
use crate::models::{ExplicitLabel, NumericColumn, Track};
use polars::prelude::PolarsError;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Features drawn on the per-genre radar chart
pub const RADAR_FEATURES: [NumericColumn; 6] = [
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::Acousticness,
    NumericColumn::Instrumentalness,
    NumericColumn::Speechiness,
];

pub const CORRELATION_COLUMNS: [NumericColumn; 8] = [
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::Acousticness,
    NumericColumn::Instrumentalness,
    NumericColumn::Speechiness,
    NumericColumn::Liveness,
    NumericColumn::Popularity,
];

/// Features reported as "genre with the highest mean"
pub const INSIGHT_FEATURES: [NumericColumn; 4] = [
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::Acousticness,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("no tracks match this combination of filters")]
    EmptySelection,
    #[error("top N must be between {min} and {max} (got {requested})")]
    InvalidTopN {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("table operation failed: {0}")]
    Table(String),
}

impl From<PolarsError> for ViewError {
    fn from(error: PolarsError) -> Self {
        ViewError::Table(error.to_string())
    }
}

/// Tunables shared by the views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSettings {
    pub scatter_sample_size: usize,
    pub scatter_3d_sample_size: usize,
    pub histogram_bins: usize,
    pub default_top_genres: usize,
    pub preview_rows: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            scatter_sample_size: 1000,
            scatter_3d_sample_size: 500,
            histogram_bins: 30,
            default_top_genres: 10,
            preview_rows: 10,
        }
    }
}

/// Box summary of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBox {
    pub group: String,
    pub summary: BoxSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureValue {
    pub feature: NumericColumn,
    pub value: f64,
}

/// Mean feature values of one genre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreProfile {
    pub genre: String,
    pub features: Vec<FeatureValue>,
}

/// Headline numbers for the whole table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub tracks: usize,
    pub artists: usize,
    pub genres: usize,
    pub attributes: usize,
    pub columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub preview: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionMetrics {
    pub tracks: usize,
    pub artists: usize,
    pub genres: usize,
    pub mean_duration_min: f64,
}

/// Popularity and explicit-content overview of a filtered selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    pub filter: TrackFilter,
    pub metrics: SelectionMetrics,
    pub popularity_by_genre: Vec<GroupBox>,
    pub energy_by_explicit: Vec<GroupBox>,
    pub explicit_share: Vec<ValueShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub track_name: String,
    pub artists: String,
    pub track_genre: String,
    pub danceability: f64,
    pub energy: f64,
    pub popularity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub feature: NumericColumn,
    pub genre: String,
    pub value: f64,
}

/// Audio feature analysis of a filtered selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureView {
    pub filter: TrackFilter,
    pub tracks: usize,
    pub mean_danceability: f64,
    pub mean_energy: f64,
    pub mean_valence: f64,
    pub scatter: Vec<ScatterPoint>,
    pub radar: Vec<GenreProfile>,
    pub correlations: CorrelationMatrix,
    pub valence_by_genre: Vec<GroupBox>,
    pub insights: Vec<Insight>,
}

/// Summary of the whole table for the landing page
pub fn dataset_summary(dataset: &Dataset, preview_rows: usize) -> Result<DatasetSummary, ViewError> {
    if dataset.is_empty() {
        return Err(ViewError::EmptySelection);
    }
    let tracks = dataset.tracks();

    Ok(DatasetSummary {
        tracks: tracks.len(),
        artists: frame::unique_count(tracks.iter().map(|t| t.artists.as_str()))?,
        genres: frame::unique_count(tracks.iter().map(|t| t.track_genre.as_str()))?,
        attributes: dataset.column_count(),
        columns: dataset.column_names().into_iter().map(String::from).collect(),
        extra_columns: dataset.extra_columns().to_vec(),
        preview: dataset.head(preview_rows).to_vec(),
    })
}

/// The `n` genres with the most tracks, used when no genre was picked
pub fn default_genres(dataset: &Dataset, n: usize) -> Result<Vec<String>, ViewError> {
    let all: Vec<&Track> = dataset.tracks().iter().collect();
    Ok(frame::top_genres(&all, n)?
        .into_iter()
        .map(|share| share.label)
        .collect())
}

pub fn overview(dataset: &Dataset, filter: &TrackFilter) -> Result<OverviewView, ViewError> {
    let selection = select(dataset, filter)?;

    let metrics = SelectionMetrics {
        tracks: selection.len(),
        artists: frame::unique_count(selection.iter().map(|t| t.artists.as_str()))?,
        genres: frame::unique_count(selection.iter().map(|t| t.track_genre.as_str()))?,
        mean_duration_min: stats::column_mean(&selection, NumericColumn::DurationMin)
            .ok_or(ViewError::EmptySelection)?,
    };

    Ok(OverviewView {
        filter: filter.clone(),
        metrics,
        popularity_by_genre: boxes_by_genre(&selection, NumericColumn::Popularity),
        energy_by_explicit: boxes_by_explicit(&selection, NumericColumn::Energy),
        explicit_share: frame::value_counts(selection.iter().map(|t| t.explicit_str.label()))?,
    })
}

pub fn features<R: Rng + ?Sized>(
    dataset: &Dataset,
    filter: &TrackFilter,
    settings: &ViewSettings,
    rng: &mut R,
) -> Result<FeatureView, ViewError> {
    let selection = select(dataset, filter)?;
    let mean_of = |column| stats::column_mean(&selection, column).ok_or(ViewError::EmptySelection);

    let scatter = stats::sample_tracks(&selection, settings.scatter_sample_size, rng)
        .into_iter()
        .map(|t| ScatterPoint {
            track_name: t.track_name.clone(),
            artists: t.artists.clone(),
            track_genre: t.track_genre.clone(),
            danceability: t.danceability,
            energy: t.energy,
            popularity: t.popularity,
        })
        .collect();

    let means = frame::genre_means(&selection, &INSIGHT_FEATURES)?;
    let insights = INSIGHT_FEATURES
        .iter()
        .enumerate()
        .filter_map(|(i, &feature)| {
            let column: Vec<(String, f64)> = means
                .iter()
                .map(|group| (group.genre.clone(), group.means[i]))
                .collect();
            let (genre, value) = stats::idxmax(&column)?;
            Some(Insight {
                feature,
                genre,
                value,
            })
        })
        .collect();

    Ok(FeatureView {
        filter: filter.clone(),
        tracks: selection.len(),
        mean_danceability: mean_of(NumericColumn::Danceability)?,
        mean_energy: mean_of(NumericColumn::Energy)?,
        mean_valence: mean_of(NumericColumn::Valence)?,
        scatter,
        radar: genre_profiles(&selection, &RADAR_FEATURES)?,
        correlations: CorrelationMatrix::compute(&selection, &CORRELATION_COLUMNS),
        valence_by_genre: boxes_by_genre(&selection, NumericColumn::Valence),
        insights,
    })
}

/// Apply a filter and reject empty results
pub(crate) fn select<'a>(
    dataset: &'a Dataset,
    filter: &TrackFilter,
) -> Result<Vec<&'a Track>, ViewError> {
    let selection = filter.apply(dataset)?;
    if selection.is_empty() {
        return Err(ViewError::EmptySelection);
    }
    Ok(selection)
}

pub(crate) fn boxes_by_genre(tracks: &[&Track], column: NumericColumn) -> Vec<GroupBox> {
    stats::group_by_genre(tracks)
        .into_iter()
        .filter_map(|(genre, group)| {
            Some(GroupBox {
                group: genre.to_string(),
                summary: BoxSummary::from_values(stats::column_values(&group, column))?,
            })
        })
        .collect()
}

fn boxes_by_explicit(tracks: &[&Track], column: NumericColumn) -> Vec<GroupBox> {
    [ExplicitLabel::Explicito, ExplicitLabel::NaoExplicito]
        .into_iter()
        .filter_map(|label| {
            let values = tracks
                .iter()
                .filter(|t| t.explicit_str == label)
                .map(|t| column.value(t))
                .collect();
            Some(GroupBox {
                group: label.to_string(),
                summary: BoxSummary::from_values(values)?,
            })
        })
        .collect()
}

pub(crate) fn genre_profiles(
    tracks: &[&Track],
    features: &[NumericColumn],
) -> Result<Vec<GenreProfile>, ViewError> {
    Ok(frame::genre_means(tracks, features)?
        .into_iter()
        .map(|group| GenreProfile {
            genre: group.genre,
            features: features
                .iter()
                .zip(group.means)
                .map(|(&feature, value)| FeatureValue { feature, value })
                .collect(),
        })
        .collect())
}

pub(crate) fn feature_means(tracks: &[&Track], features: &[NumericColumn]) -> Vec<FeatureValue> {
    features
        .iter()
        .filter_map(|&feature| {
            Some(FeatureValue {
                feature,
                value: stats::column_mean(tracks, feature)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioFeatures;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn track(id: &str, artist: &str, genre: &str, popularity: i32, explicit: bool, energy: f64) -> Track {
        Track::new(
            id.to_string(),
            format!("Song {id}"),
            artist.to_string(),
            "Album".to_string(),
            popularity,
            120_000 + popularity as i64 * 1000,
            explicit,
            AudioFeatures {
                danceability: popularity as f64 / 100.0,
                energy,
                valence: 0.5,
                acousticness: 1.0 - energy,
                instrumentalness: 0.0,
                speechiness: 0.1,
                liveness: 0.2,
                loudness: -6.0,
            },
            genre.to_string(),
            Vec::new(),
        )
    }

    fn dataset() -> Dataset {
        Dataset::from_tracks(vec![
            track("1", "A", "rock", 30, false, 0.8),
            track("2", "A", "rock", 60, true, 0.9),
            track("3", "B", "pop", 85, true, 0.7),
            track("4", "C", "pop", 70, false, 0.4),
            track("5", "D", "pop", 90, false, 0.6),
            track("6", "E", "jazz", 15, false, 0.2),
        ])
    }

    #[test]
    fn test_dataset_summary() {
        let summary = dataset_summary(&dataset(), 4).unwrap();
        assert_eq!(summary.tracks, 6);
        assert_eq!(summary.artists, 5);
        assert_eq!(summary.genres, 3);
        assert_eq!(summary.attributes, 19);
        assert_eq!(summary.columns.len(), 19);
        assert_eq!(summary.columns[0], "track_id");
        assert_eq!(summary.columns[18], "classe_popularidade");
        assert!(summary.extra_columns.is_empty());
        assert_eq!(summary.preview.len(), 4);

        let empty = Dataset::default();
        assert_eq!(dataset_summary(&empty, 10), Err(ViewError::EmptySelection));
    }

    #[test]
    fn test_default_genres_by_volume() {
        assert_eq!(default_genres(&dataset(), 2).unwrap(), vec!["pop", "rock"]);
        assert!(default_genres(&Dataset::default(), 2).unwrap().is_empty());
    }

    #[test]
    fn test_overview_metrics() {
        let dataset = dataset();
        let view = overview(&dataset, &TrackFilter::for_genres(["rock", "pop"])).unwrap();

        assert_eq!(view.metrics.tracks, 5);
        assert_eq!(view.metrics.artists, 4);
        assert_eq!(view.metrics.genres, 2);
        // durations are 150, 180, 205, 190 and 210 seconds
        assert_relative_eq!(view.metrics.mean_duration_min, 3.1166666666666667, epsilon = 1e-9);

        let groups: Vec<&str> = view.popularity_by_genre.iter().map(|b| b.group.as_str()).collect();
        assert_eq!(groups, vec!["pop", "rock"]);
        assert_relative_eq!(view.popularity_by_genre[0].summary.median, 85.0);

        assert_eq!(view.energy_by_explicit.len(), 2);
        assert_eq!(view.energy_by_explicit[0].group, "Explicito");

        assert_eq!(view.explicit_share[0].label, "Nao Explicito");
        assert_relative_eq!(view.explicit_share[0].proportion, 0.6);
    }

    #[test]
    fn test_overview_empty_selection() {
        let dataset = dataset();
        let mut filter = TrackFilter::for_genres(["jazz"]);
        filter.popularity_range = (50, 100);
        assert_eq!(overview(&dataset, &filter), Err(ViewError::EmptySelection));

        assert_eq!(
            overview(&dataset, &TrackFilter::default()),
            Err(ViewError::Filter(FilterError::NoGenresSelected))
        );
    }

    #[test]
    fn test_feature_view() {
        let dataset = dataset();
        let settings = ViewSettings {
            scatter_sample_size: 3,
            ..ViewSettings::default()
        };
        let filter = TrackFilter::for_genres(["rock", "pop", "jazz"]);
        let view = features(&dataset, &filter, &settings, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(view.tracks, 6);
        assert_eq!(view.scatter.len(), 3);
        assert_relative_eq!(view.mean_valence, 0.5);
        assert_eq!(view.radar.len(), 3);
        assert_eq!(view.radar[0].features.len(), RADAR_FEATURES.len());
        assert_eq!(view.correlations.columns.len(), 8);
        // energy and acousticness are exact complements here
        assert_relative_eq!(
            view.correlations
                .get(NumericColumn::Energy, NumericColumn::Acousticness)
                .unwrap(),
            -1.0,
            epsilon = 1e-9
        );
        // valence is constant
        assert_eq!(
            view.correlations.get(NumericColumn::Valence, NumericColumn::Energy),
            None
        );

        let dance = &view.insights[0];
        assert_eq!(dance.feature, NumericColumn::Danceability);
        assert_eq!(dance.genre, "pop");
        let energy = &view.insights[1];
        assert_eq!(energy.genre, "rock");
        assert_relative_eq!(energy.value, 0.85, epsilon = 1e-9);
        let acoustic = &view.insights[3];
        assert_eq!(acoustic.genre, "jazz");
    }

    #[test]
    fn test_dataset_summary_lists_extra_columns() {
        let mut columns: Vec<String> = vec!["Unnamed: 0".to_string()];
        columns.extend(crate::dataset::REQUIRED_COLUMNS.iter().map(|c| c.to_string()));
        columns.push("tempo".to_string());
        let tracks = vec![track("1", "A", "rock", 30, false, 0.8)];
        let dataset = Dataset::new(columns, vec!["Unnamed: 0".to_string(), "tempo".to_string()], tracks);

        let summary = dataset_summary(&dataset, 1).unwrap();
        assert_eq!(summary.attributes, 21);
        assert_eq!(summary.extra_columns, vec!["Unnamed: 0", "tempo"]);
        assert_eq!(summary.columns[0], "Unnamed: 0");
        assert_eq!(summary.columns[17], "tempo");
        assert_eq!(summary.columns[20], "classe_popularidade");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["extra_columns"][1], "tempo");
    }
}
