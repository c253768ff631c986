use serde::Serialize;
use std::fmt;

/// One cleaned row of the tracks dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub track_id: String,
    pub track_name: String,
    pub artists: String, // Opaque, may hold several names separated by ';'
    pub album_name: String,
    pub popularity: i32,
    pub duration_ms: i64,
    pub duration_min: f64, // duration_ms / 60000
    pub explicit: bool,
    pub explicit_str: ExplicitLabel,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub liveness: f64,
    pub loudness: f64, // dB, usually negative
    pub track_genre: String,
    pub classe_popularidade: PopularityClass,
    /// Values of any additional CSV columns, aligned with `Dataset::extra_columns`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
}

impl Track {
    /// Build a track from its raw fields, computing every derived column
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        track_id: String,
        track_name: String,
        artists: String,
        album_name: String,
        popularity: i32,
        duration_ms: i64,
        explicit: bool,
        features: AudioFeatures,
        track_genre: String,
        extras: Vec<String>,
    ) -> Self {
        Track {
            track_id,
            track_name,
            artists,
            album_name,
            popularity,
            duration_ms,
            duration_min: duration_ms as f64 / 60000.0,
            explicit,
            explicit_str: ExplicitLabel::from_explicit(explicit),
            danceability: features.danceability,
            energy: features.energy,
            valence: features.valence,
            acousticness: features.acousticness,
            instrumentalness: features.instrumentalness,
            speechiness: features.speechiness,
            liveness: features.liveness,
            loudness: features.loudness,
            track_genre,
            classe_popularidade: PopularityClass::from_popularity(popularity),
            extras,
        }
    }
}

/// Continuous audio descriptors of a track
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AudioFeatures {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub liveness: f64,
    pub loudness: f64,
}

/// Ordered popularity bucket. Variant order is the ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PopularityClass {
    #[serde(rename = "Baixa")]
    Baixa,
    #[serde(rename = "Media")]
    Media,
    #[serde(rename = "Alta")]
    Alta,
    #[serde(rename = "Hit Global")]
    HitGlobal,
}

impl PopularityClass {
    pub const ALL: [PopularityClass; 4] = [
        PopularityClass::Baixa,
        PopularityClass::Media,
        PopularityClass::Alta,
        PopularityClass::HitGlobal,
    ];

    /// Bin a popularity score using half-open intervals [0,20), [20,50), [50,80), [80,..]
    pub fn from_popularity(popularity: i32) -> Self {
        if popularity < 20 {
            PopularityClass::Baixa
        } else if popularity < 50 {
            PopularityClass::Media
        } else if popularity < 80 {
            PopularityClass::Alta
        } else {
            PopularityClass::HitGlobal
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            PopularityClass::Baixa => "Baixa",
            PopularityClass::Media => "Media",
            PopularityClass::Alta => "Alta",
            PopularityClass::HitGlobal => "Hit Global",
        }
    }

    /// Parse a label, case-insensitively; also accepts `hit-global` / `hit_global`
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|class| class.label().to_lowercase() == normalized)
    }
}

impl fmt::Display for PopularityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label derived from the explicit flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExplicitLabel {
    #[serde(rename = "Explicito")]
    Explicito,
    #[serde(rename = "Nao Explicito")]
    NaoExplicito,
}

impl ExplicitLabel {
    pub fn from_explicit(explicit: bool) -> Self {
        if explicit {
            ExplicitLabel::Explicito
        } else {
            ExplicitLabel::NaoExplicito
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExplicitLabel::Explicito => "Explicito",
            ExplicitLabel::NaoExplicito => "Nao Explicito",
        }
    }
}

impl fmt::Display for ExplicitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric columns that aggregates can be computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    Popularity,
    DurationMin,
    Danceability,
    Energy,
    Valence,
    Acousticness,
    Instrumentalness,
    Speechiness,
    Liveness,
    Loudness,
}

impl NumericColumn {
    pub fn value(self, track: &Track) -> f64 {
        match self {
            NumericColumn::Popularity => track.popularity as f64,
            NumericColumn::DurationMin => track.duration_min,
            NumericColumn::Danceability => track.danceability,
            NumericColumn::Energy => track.energy,
            NumericColumn::Valence => track.valence,
            NumericColumn::Acousticness => track.acousticness,
            NumericColumn::Instrumentalness => track.instrumentalness,
            NumericColumn::Speechiness => track.speechiness,
            NumericColumn::Liveness => track.liveness,
            NumericColumn::Loudness => track.loudness,
        }
    }

    /// Column name as it appears in the dataset
    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Popularity => "popularity",
            NumericColumn::DurationMin => "duration_min",
            NumericColumn::Danceability => "danceability",
            NumericColumn::Energy => "energy",
            NumericColumn::Valence => "valence",
            NumericColumn::Acousticness => "acousticness",
            NumericColumn::Instrumentalness => "instrumentalness",
            NumericColumn::Speechiness => "speechiness",
            NumericColumn::Liveness => "liveness",
            NumericColumn::Loudness => "loudness",
        }
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
