use super::filters::{FilterError, TrackFilters};
use super::frame;
use super::stats::{self, Histogram, ValueShare};
use super::views::{
    FeatureValue, GroupBox, ViewError, ViewSettings, boxes_by_genre, feature_means,
    genre_profiles,
};
use crate::dataset::Dataset;
use crate::models::{NumericColumn, Track};
use clap::ValueEnum;
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Allowed values for the number of ranked genres
pub const RANKING_TOP_RANGE: RangeInclusive<usize> = 5..=20;

/// Genres shown in the volume breakdown
pub const VOLUME_TOP_GENRES: usize = 20;

/// Genres preselected for a comparison when none are given
pub const DEFAULT_COMPARED_GENRES: usize = 3;

pub const TOP_TRACKS: usize = 10;

pub const COMPARISON_FEATURES: [NumericColumn; 5] = [
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::Acousticness,
    NumericColumn::Instrumentalness,
];

/// Means shown per genre in the comparison table, in `ComparisonRow` field order
const COMPARISON_TABLE_COLUMNS: [NumericColumn; 5] = [
    NumericColumn::Popularity,
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::DurationMin,
];

/// Every audio feature plus loudness, for the single-genre profile
pub const PROFILE_FEATURES: [NumericColumn; 8] = [
    NumericColumn::Danceability,
    NumericColumn::Energy,
    NumericColumn::Valence,
    NumericColumn::Acousticness,
    NumericColumn::Instrumentalness,
    NumericColumn::Speechiness,
    NumericColumn::Liveness,
    NumericColumn::Loudness,
];

/// Metric genres can be ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Popularity,
    Danceability,
    Energy,
    Valence,
    DurationMin,
}

impl RankingMetric {
    pub fn column(self) -> NumericColumn {
        match self {
            RankingMetric::Popularity => NumericColumn::Popularity,
            RankingMetric::Danceability => NumericColumn::Danceability,
            RankingMetric::Energy => NumericColumn::Energy,
            RankingMetric::Valence => NumericColumn::Valence,
            RankingMetric::DurationMin => NumericColumn::DurationMin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreScore {
    pub genre: String,
    pub value: f64,
}

/// Genres ranked by the mean of a metric, plus track volume per genre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingView {
    pub metric: RankingMetric,
    pub ranking: Vec<GenreScore>,
    pub volume: Vec<ValueShare>,
}

/// One (genre, feature, mean) row of the comparison profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePoint {
    pub genre: String,
    pub feature: NumericColumn,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub genre: String,
    pub popularity: f64,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub duration_min: f64,
    pub track_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub genres: Vec<String>,
    pub profile: Vec<ProfilePoint>,
    pub popularity_by_genre: Vec<GroupBox>,
    pub table: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point3d {
    pub track_name: String,
    pub artists: String,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub popularity: i32,
    pub duration_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTrack {
    pub rank: usize, // 1-based
    pub track_name: String,
    pub artists: String,
    pub popularity: i32,
    pub duration_min: f64,
}

/// Deep dive into a single genre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreDetailView {
    pub genre: String,
    pub tracks: usize,
    pub mean_popularity: f64,
    pub mean_duration_min: f64,
    pub artists: usize,
    pub explicit_percent: f64,
    pub popularity_histogram: Histogram,
    pub sample_3d: Vec<Point3d>,
    pub top_tracks: Vec<TopTrack>,
    pub profile: Vec<FeatureValue>,
}

/// Rank genres over the whole table by the mean of `metric`
pub fn rankings(dataset: &Dataset, metric: RankingMetric, top: usize) -> Result<RankingView, ViewError> {
    if !RANKING_TOP_RANGE.contains(&top) {
        return Err(ViewError::InvalidTopN {
            requested: top,
            min: *RANKING_TOP_RANGE.start(),
            max: *RANKING_TOP_RANGE.end(),
        });
    }
    if dataset.is_empty() {
        return Err(ViewError::EmptySelection);
    }
    let all: Vec<&Track> = dataset.tracks().iter().collect();

    let column = metric.column();
    let ranking = frame::genre_means_ranked(&all, &[column], column, Some(top))?
        .into_iter()
        .map(|group| GenreScore {
            genre: group.genre,
            value: group.means[0],
        })
        .collect();

    Ok(RankingView {
        metric,
        ranking,
        volume: frame::top_genres(&all, VOLUME_TOP_GENRES)?,
    })
}

/// Side-by-side comparison of 1 to 5 genres
pub fn comparison(dataset: &Dataset, genres: &[String]) -> Result<ComparisonView, ViewError> {
    let selection = TrackFilters::comparison(dataset, genres)?;
    if selection.is_empty() {
        return Err(ViewError::EmptySelection);
    }

    let profiles = genre_profiles(&selection, &COMPARISON_FEATURES)?;
    // Long format, feature-major
    let profile = COMPARISON_FEATURES
        .iter()
        .enumerate()
        .flat_map(|(i, &feature)| {
            profiles.iter().filter_map(move |p| {
                Some(ProfilePoint {
                    genre: p.genre.clone(),
                    feature,
                    value: p.features.get(i)?.value,
                })
            })
        })
        .collect();

    let table = frame::genre_means_ranked(
        &selection,
        &COMPARISON_TABLE_COLUMNS,
        NumericColumn::Popularity,
        None,
    )?
    .into_iter()
    .map(|group| ComparisonRow {
        genre: group.genre,
        popularity: group.means[0],
        danceability: group.means[1],
        energy: group.means[2],
        valence: group.means[3],
        duration_min: group.means[4],
        track_count: group.count,
    })
    .collect();

    Ok(ComparisonView {
        genres: genres.to_vec(),
        profile,
        popularity_by_genre: boxes_by_genre(&selection, NumericColumn::Popularity),
        table,
    })
}

pub fn genre_detail<R: Rng + ?Sized>(
    dataset: &Dataset,
    genre: &str,
    settings: &ViewSettings,
    rng: &mut R,
) -> Result<GenreDetailView, ViewError> {
    if genre.is_empty() {
        return Err(FilterError::NoGenresSelected.into());
    }
    let selection = TrackFilters::genre(dataset, genre);
    let mean_of = |column| stats::column_mean(&selection, column).ok_or(ViewError::EmptySelection);

    let mean_popularity = mean_of(NumericColumn::Popularity)?;
    let popularity_histogram = Histogram::from_values(
        &stats::column_values(&selection, NumericColumn::Popularity),
        settings.histogram_bins,
    )
    .ok_or(ViewError::EmptySelection)?;

    let explicit_count = selection.iter().filter(|t| t.explicit).count();

    let sample_3d = stats::sample_tracks(&selection, settings.scatter_3d_sample_size, rng)
        .into_iter()
        .map(|t| Point3d {
            track_name: t.track_name.clone(),
            artists: t.artists.clone(),
            danceability: t.danceability,
            energy: t.energy,
            valence: t.valence,
            popularity: t.popularity,
            duration_min: t.duration_min,
        })
        .collect();

    let top_tracks = frame::top_by_popularity(&selection, TOP_TRACKS)?
        .into_iter()
        .enumerate()
        .map(|(i, t)| TopTrack {
            rank: i + 1,
            track_name: t.track_name.clone(),
            artists: t.artists.clone(),
            popularity: t.popularity,
            duration_min: t.duration_min,
        })
        .collect();

    Ok(GenreDetailView {
        genre: genre.to_string(),
        tracks: selection.len(),
        mean_popularity,
        mean_duration_min: mean_of(NumericColumn::DurationMin)?,
        artists: frame::unique_count(selection.iter().map(|t| t.artists.as_str()))?,
        explicit_percent: explicit_count as f64 / selection.len() as f64 * 100.0,
        popularity_histogram,
        sample_3d,
        top_tracks,
        profile: feature_means(&selection, &PROFILE_FEATURES),
    })
}
