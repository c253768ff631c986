use crate::dataset::Dataset;
use crate::models::{ExplicitLabel, PopularityClass, Track};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Maximum number of genres in a side-by-side comparison
pub const MAX_COMPARED_GENRES: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("select at least one genre")]
    NoGenresSelected,
    #[error("select at most {max} genres to compare (got {selected})")]
    TooManyGenres { selected: usize, max: usize },
    #[error("invalid popularity range {min}..={max}")]
    InvalidRange { min: i32, max: i32 },
    #[error("invalid popularity class range {low}..={high}")]
    InvalidClassRange {
        low: PopularityClass,
        high: PopularityClass,
    },
}

/// Explicit content selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExplicitFilter {
    #[default]
    All,
    Only,
    Exclude,
}

impl ExplicitFilter {
    fn accepts(self, label: ExplicitLabel) -> bool {
        match self {
            ExplicitFilter::All => true,
            ExplicitFilter::Only => label == ExplicitLabel::Explicito,
            ExplicitFilter::Exclude => label == ExplicitLabel::NaoExplicito,
        }
    }
}

/// Read-only selection criteria over the prepared table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackFilter {
    pub genres: Vec<String>,
    pub explicit: ExplicitFilter,
    pub popularity_range: (i32, i32), // inclusive on both ends
    pub class_range: Option<(PopularityClass, PopularityClass)>,
}

impl Default for TrackFilter {
    fn default() -> Self {
        Self {
            genres: Vec::new(),
            explicit: ExplicitFilter::All,
            popularity_range: (0, 100),
            class_range: None,
        }
    }
}

impl TrackFilter {
    pub fn for_genres<I, S>(genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genres: genres.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Apply the filter, borrowing matching tracks in table order
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Result<Vec<&'a Track>, FilterError> {
        self.validate()?;
        let genres: HashSet<&str> = self.genres.iter().map(String::as_str).collect();
        let popularity = self.popularity_range.0..=self.popularity_range.1;
        let classes = self.class_range.map(|(low, high)| low..=high);

        Ok(dataset
            .tracks()
            .iter()
            .filter(|track| {
                TrackFilters::matches_genres(track, &genres)
                    && TrackFilters::matches_explicit(track, self.explicit)
                    && TrackFilters::matches_popularity(track, &popularity)
                    && classes
                        .as_ref()
                        .is_none_or(|range| TrackFilters::matches_class(track, range))
            })
            .collect())
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.genres.is_empty() {
            return Err(FilterError::NoGenresSelected);
        }
        let (min, max) = self.popularity_range;
        if min > max {
            return Err(FilterError::InvalidRange { min, max });
        }
        if let Some((low, high)) = self.class_range {
            if low.rank() > high.rank() {
                return Err(FilterError::InvalidClassRange { low, high });
            }
        }
        Ok(())
    }
}

/// Track predicates shared by the filter and the views
pub struct TrackFilters;

impl TrackFilters {
    pub fn matches_genres(track: &Track, genres: &HashSet<&str>) -> bool {
        genres.contains(track.track_genre.as_str())
    }

    pub fn matches_explicit(track: &Track, filter: ExplicitFilter) -> bool {
        filter.accepts(track.explicit_str)
    }

    pub fn matches_popularity(track: &Track, range: &RangeInclusive<i32>) -> bool {
        range.contains(&track.popularity)
    }

    /// Class ranges compare by rank, so `Baixa..=Alta` excludes `Hit Global`
    pub fn matches_class(track: &Track, range: &RangeInclusive<PopularityClass>) -> bool {
        range.contains(&track.classe_popularidade)
    }

    /// All tracks of a single genre
    pub fn genre<'a>(dataset: &'a Dataset, genre: &str) -> Vec<&'a Track> {
        dataset
            .tracks()
            .iter()
            .filter(|t| t.track_genre == genre)
            .collect()
    }

    /// Tracks belonging to a comparison set of 1 to `MAX_COMPARED_GENRES` genres
    pub fn comparison<'a>(
        dataset: &'a Dataset,
        genres: &[String],
    ) -> Result<Vec<&'a Track>, FilterError> {
        let mut distinct: Vec<&str> = Vec::with_capacity(genres.len());
        for genre in genres {
            if !distinct.contains(&genre.as_str()) {
                distinct.push(genre.as_str());
            }
        }
        if distinct.len() > MAX_COMPARED_GENRES {
            return Err(FilterError::TooManyGenres {
                selected: distinct.len(),
                max: MAX_COMPARED_GENRES,
            });
        }
        TrackFilter::for_genres(distinct).apply(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AudioFeatures;

    fn track(id: &str, genre: &str, popularity: i32, explicit: bool) -> Track {
        Track::new(
            id.to_string(),
            format!("Song {id}"),
            "Artist".to_string(),
            "Album".to_string(),
            popularity,
            200_000,
            explicit,
            AudioFeatures::default(),
            genre.to_string(),
            Vec::new(),
        )
    }

    fn dataset() -> Dataset {
        Dataset::from_tracks(vec![
            track("1", "rock", 10, false),
            track("2", "rock", 55, true),
            track("3", "pop", 85, false),
            track("4", "jazz", 20, true),
            track("5", "pop", 79, true),
        ])
    }

    fn ids(tracks: &[&Track]) -> Vec<String> {
        tracks.iter().map(|t| t.track_id.clone()).collect()
    }

    #[test]
    fn test_genre_membership() {
        let dataset = dataset();
        let selected = TrackFilter::for_genres(["rock", "pop"]).apply(&dataset).unwrap();
        assert_eq!(ids(&selected), vec!["1", "2", "3", "5"]);
    }

    #[test]
    fn test_empty_genre_selection_is_rejected() {
        let dataset = dataset();
        let err = TrackFilter::default().apply(&dataset).unwrap_err();
        assert_eq!(err, FilterError::NoGenresSelected);
    }

    #[test]
    fn test_explicit_filter() {
        let dataset = dataset();
        let mut filter = TrackFilter::for_genres(["rock", "pop", "jazz"]);

        filter.explicit = ExplicitFilter::Only;
        assert_eq!(ids(&filter.apply(&dataset).unwrap()), vec!["2", "4", "5"]);

        filter.explicit = ExplicitFilter::Exclude;
        assert_eq!(ids(&filter.apply(&dataset).unwrap()), vec!["1", "3"]);
    }

    #[test]
    fn test_popularity_range_is_inclusive() {
        let dataset = dataset();
        let mut filter = TrackFilter::for_genres(["rock", "pop", "jazz"]);
        filter.popularity_range = (20, 79);
        assert_eq!(ids(&filter.apply(&dataset).unwrap()), vec!["2", "4", "5"]);

        filter.popularity_range = (80, 20);
        assert_eq!(
            filter.apply(&dataset).unwrap_err(),
            FilterError::InvalidRange { min: 80, max: 20 }
        );
    }

    #[test]
    fn test_class_range_uses_rank_order() {
        let dataset = dataset();
        let mut filter = TrackFilter::for_genres(["rock", "pop", "jazz"]);
        filter.class_range = Some((PopularityClass::Media, PopularityClass::Alta));
        assert_eq!(ids(&filter.apply(&dataset).unwrap()), vec!["2", "4", "5"]);

        filter.class_range = Some((PopularityClass::Alta, PopularityClass::Alta));
        assert_eq!(ids(&filter.apply(&dataset).unwrap()), vec!["2", "5"]);
    }

    #[test]
    fn test_inverted_class_range_is_rejected() {
        let dataset = dataset();
        let mut filter = TrackFilter::for_genres(["rock", "pop", "jazz"]);
        filter.class_range = Some((PopularityClass::HitGlobal, PopularityClass::Media));
        assert_eq!(
            filter.apply(&dataset).unwrap_err(),
            FilterError::InvalidClassRange {
                low: PopularityClass::HitGlobal,
                high: PopularityClass::Media,
            }
        );
    }

    #[test]
    fn test_filter_leaves_dataset_untouched() {
        let dataset = dataset();
        let before = dataset.clone();
        let _ = TrackFilter::for_genres(["pop"]).apply(&dataset).unwrap();
        assert_eq!(dataset, before);
    }

    #[test]
    fn test_comparison_limits_genre_count() {
        let dataset = dataset();
        let genres: Vec<String> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|g| g.to_string())
            .collect();
        assert_eq!(
            TrackFilters::comparison(&dataset, &genres).unwrap_err(),
            FilterError::TooManyGenres { selected: 6, max: 5 }
        );

        let pop = vec!["pop".to_string()];
        assert_eq!(ids(&TrackFilters::comparison(&dataset, &pop).unwrap()), vec!["3", "5"]);
        assert_eq!(ids(&TrackFilters::genre(&dataset, "jazz")), vec!["4"]);
    }

    #[test]
    fn test_comparison_counts_distinct_genres() {
        let dataset = dataset();
        let repeated = vec!["pop".to_string(); 6];
        assert_eq!(
            ids(&TrackFilters::comparison(&dataset, &repeated).unwrap()),
            vec!["3", "5"]
        );

        let mut six: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|g| g.to_string()).collect();
        six.extend(["a".to_string(), "f".to_string()]);
        assert_eq!(
            TrackFilters::comparison(&dataset, &six).unwrap_err(),
            FilterError::TooManyGenres { selected: 6, max: 5 }
        );
    }
}
