use crate::models::Track;
use std::collections::BTreeSet;

/// Columns every dataset file must provide
pub const REQUIRED_COLUMNS: [&str; 16] = [
    "track_id",
    "track_name",
    "artists",
    "album_name",
    "popularity",
    "duration_ms",
    "explicit",
    "danceability",
    "energy",
    "valence",
    "acousticness",
    "instrumentalness",
    "speechiness",
    "liveness",
    "loudness",
    "track_genre",
];

/// Columns computed by the preparation pipeline, appended after the source columns
pub const DERIVED_COLUMNS: [&str; 3] = ["duration_min", "explicit_str", "classe_popularidade"];

/// The prepared, read-only tracks table.
///
/// Every track has a unique `track_id` and no missing values. Consumers borrow
/// tracks from it and never mutate it in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    source_columns: Vec<String>,
    extra_columns: Vec<String>,
    tracks: Vec<Track>,
}

impl Dataset {
    pub fn new(source_columns: Vec<String>, extra_columns: Vec<String>, tracks: Vec<Track>) -> Self {
        Self {
            source_columns,
            extra_columns,
            tracks,
        }
    }

    /// Build a dataset with only the required columns, for tracks created in code
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            source_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            extra_columns: Vec::new(),
            tracks,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Source columns that are not part of the track model, in file order
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    /// All column names: the file's header followed by the derived columns
    pub fn column_names(&self) -> Vec<&str> {
        self.source_columns
            .iter()
            .map(String::as_str)
            .chain(DERIVED_COLUMNS)
            .collect()
    }

    pub fn column_count(&self) -> usize {
        if self.source_columns.is_empty() {
            return 0;
        }
        self.source_columns.len() + DERIVED_COLUMNS.len()
    }

    /// First `n` tracks in file order
    pub fn head(&self, n: usize) -> &[Track] {
        &self.tracks[..n.min(self.tracks.len())]
    }

    /// Distinct genres, sorted alphabetically
    pub fn genres(&self) -> Vec<&str> {
        self.tracks
            .iter()
            .map(|t| t.track_genre.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
