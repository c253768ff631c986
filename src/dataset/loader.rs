use super::table::{Dataset, REQUIRED_COLUMNS};
use crate::models::{AudioFeatures, Track};
use log::{info, warn};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cell values read as missing, in addition to the empty string
const NA_MARKERS: [&str; 18] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "#N/A N/A", "#NA", "<NA>", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN",
];

/// Audio feature columns, in `AudioFeatures` field order
const FEATURE_COLUMNS: [&str; 8] = [
    "danceability",
    "energy",
    "valence",
    "acousticness",
    "instrumentalness",
    "speechiness",
    "liveness",
    "loudness",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset source '{path}' is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset: {0}")]
    Table(#[from] PolarsError),
    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Row counts observed while preparing a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub rows_read: usize,
    pub duplicates_removed: usize,
    pub incomplete_removed: usize,
    pub rows_kept: usize,
}

/// Load and prepare the tracks table from a CSV file.
///
/// Never fails: a missing or unparsable source yields an empty dataset, and
/// callers are expected to check `Dataset::is_empty` before going further.
pub fn load_tracks<P: AsRef<Path>>(path: P) -> Dataset {
    match try_load_tracks(path.as_ref()) {
        Ok((dataset, _)) => dataset,
        Err(e) => {
            warn!("{e}; continuing with an empty dataset");
            Dataset::default()
        }
    }
}

/// Same as `load_tracks`, but surfaces why the source could not be used
pub fn try_load_tracks(path: &Path) -> Result<(Dataset, LoadReport), LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let (dataset, report) = prepare_tracks(data)?;
    info!(
        "Loaded {} tracks from '{}' ({} rows read, {} duplicates, {} incomplete)",
        report.rows_kept,
        path.display(),
        report.rows_read,
        report.duplicates_removed,
        report.incomplete_removed
    );
    Ok((dataset, report))
}

/// Run the preparation pipeline over CSV data with a header row.
///
/// Steps run in a fixed order: load, dedup by `track_id` (first seen wins),
/// drop rows with any missing cell, then derive `duration_min`,
/// `explicit_str` and `classe_popularidade`. Dedup happens before the
/// missing-value drop, so an incomplete first occurrence removes the id
/// entirely even when a complete duplicate appears later.
pub fn prepare_tracks(data: Vec<u8>) -> Result<(Dataset, LoadReport), LoadError> {
    let raw = read_raw(data)?;

    let headers: Vec<String> = raw
        .get_column_names_str()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }
    let extra_columns: Vec<String> = headers
        .iter()
        .filter(|h| !REQUIRED_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();

    let rows_read = raw.height();
    // Cells that fail coercion are already null when dedup runs
    let unique = raw
        .lazy()
        .with_columns(coercions())
        .unique_stable(Some(vec!["track_id".into()]), UniqueKeepStrategy::First)
        .collect()?;
    let rows_unique = unique.height();

    let complete = unique.lazy().drop_nulls(None).collect()?;
    let tracks = to_tracks(&complete, &extra_columns)?;

    let report = LoadReport {
        rows_read,
        duplicates_removed: rows_read - rows_unique,
        incomplete_removed: rows_unique - tracks.len(),
        rows_kept: tracks.len(),
    };

    Ok((Dataset::new(headers, extra_columns, tracks), report))
}

/// Read every column as text; NA markers, empty cells and cells missing from short rows become null
fn read_raw(data: Vec<u8>) -> PolarsResult<DataFrame> {
    let null_values = NA_MARKERS.iter().map(|marker| (*marker).into()).collect();
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_missing_is_null(true)
                .with_null_values(Some(NullValues::AllColumns(null_values))),
        )
        .into_reader_with_file_handle(Cursor::new(data))
        .finish()
}

/// Typed views of the required columns; malformed cells turn into nulls
fn coercions() -> Vec<Expr> {
    let mut exprs = vec![
        whole_number("popularity")
            .cast(DataType::Int32)
            .alias("popularity"),
        whole_number("duration_ms"),
        boolean("explicit"),
    ];
    exprs.extend(
        FEATURE_COLUMNS
            .iter()
            .map(|name| col(*name).cast(DataType::Float64)),
    );
    exprs
}

/// Integers may be written as whole floats ("45.0")
fn whole_number(name: &str) -> Expr {
    let value = col(name).cast(DataType::Float64);
    let truncated = value.clone().cast(DataType::Int64);
    when(truncated.clone().cast(DataType::Float64).eq(value))
        .then(truncated)
        .otherwise(lit(NULL))
        .alias(name)
}

fn boolean(name: &str) -> Expr {
    let text = col(name).str().to_lowercase();
    when(text.clone().eq(lit("true")))
        .then(lit(true))
        .when(text.eq(lit("false")))
        .then(lit(false))
        .otherwise(lit(NULL))
        .alias(name)
}

fn strings<'a>(frame: &'a DataFrame, name: &str) -> PolarsResult<&'a StringChunked> {
    frame.column(name)?.as_materialized_series().str()
}

fn floats<'a>(frame: &'a DataFrame, name: &str) -> PolarsResult<&'a Float64Chunked> {
    frame.column(name)?.as_materialized_series().f64()
}

/// Convert the cleaned frame into tracks, deriving the computed columns
fn to_tracks(frame: &DataFrame, extra_columns: &[String]) -> PolarsResult<Vec<Track>> {
    let ids = strings(frame, "track_id")?;
    let names = strings(frame, "track_name")?;
    let artists = strings(frame, "artists")?;
    let albums = strings(frame, "album_name")?;
    let genres = strings(frame, "track_genre")?;
    let popularity = frame.column("popularity")?.as_materialized_series().i32()?;
    let duration = frame.column("duration_ms")?.as_materialized_series().i64()?;
    let explicit = frame.column("explicit")?.as_materialized_series().bool()?;
    let features = FEATURE_COLUMNS
        .iter()
        .map(|name| floats(frame, name))
        .collect::<PolarsResult<Vec<_>>>()?;
    let extras = extra_columns
        .iter()
        .map(|name| strings(frame, name))
        .collect::<PolarsResult<Vec<_>>>()?;

    Ok((0..frame.height())
        .filter_map(|i| {
            let feature = |slot: usize| features[slot].get(i);
            Some(Track::new(
                ids.get(i)?.to_string(),
                names.get(i)?.to_string(),
                artists.get(i)?.to_string(),
                albums.get(i)?.to_string(),
                popularity.get(i)?,
                duration.get(i)?,
                explicit.get(i)?,
                AudioFeatures {
                    danceability: feature(0)?,
                    energy: feature(1)?,
                    valence: feature(2)?,
                    acousticness: feature(3)?,
                    instrumentalness: feature(4)?,
                    speechiness: feature(5)?,
                    liveness: feature(6)?,
                    loudness: feature(7)?,
                },
                genres.get(i)?.to_string(),
                extras
                    .iter()
                    .map(|column| column.get(i).map(str::to_string))
                    .collect::<Option<Vec<_>>>()?,
            ))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExplicitLabel, PopularityClass};
    use approx::assert_relative_eq;
    use std::io::Write;

    const HEADER: &str = "track_id,artists,album_name,track_name,popularity,duration_ms,explicit,danceability,energy,loudness,speechiness,acousticness,instrumentalness,liveness,valence,track_genre";

    fn row(id: &str, popularity: &str, duration_ms: &str, explicit: &str, loudness: &str) -> String {
        format!(
            "{id},Artist {id},Album {id},Song {id},{popularity},{duration_ms},{explicit},0.5,0.6,{loudness},0.05,0.1,0.0,0.2,0.7,pop"
        )
    }

    fn csv(lines: &[String]) -> Vec<u8> {
        let mut csv = String::from(HEADER);
        for line in lines {
            csv.push('\n');
            csv.push_str(line);
        }
        csv.push('\n');
        csv.into_bytes()
    }

    fn prepare(lines: &[String]) -> (Dataset, LoadReport) {
        prepare_tracks(csv(lines)).unwrap()
    }

    #[test]
    fn test_prepares_complete_rows() {
        let (dataset, report) = prepare(&[
            row("a", "10", "180000", "False", "-5.2"),
            row("b", "85", "240000", "True", "-3.1"),
        ]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(report.rows_read, 2);
        assert_eq!(report.rows_kept, 2);

        let first = &dataset.tracks()[0];
        assert_eq!(first.track_id, "a");
        assert_eq!(first.track_name, "Song a");
        assert_relative_eq!(first.duration_min, 3.0);
        assert_eq!(first.explicit_str, ExplicitLabel::NaoExplicito);
        assert_eq!(first.classe_popularidade, PopularityClass::Baixa);
        assert_relative_eq!(first.loudness, -5.2);

        let second = &dataset.tracks()[1];
        assert!(second.explicit);
        assert_eq!(second.explicit_str, ExplicitLabel::Explicito);
        assert_eq!(second.classe_popularidade, PopularityClass::HitGlobal);
    }

    #[test]
    fn test_keeps_first_duplicate() {
        let (dataset, report) = prepare(&[
            row("a", "10", "180000", "False", "-5.0"),
            row("a", "90", "200000", "True", "-1.0"),
            row("b", "30", "200000", "False", "-2.0"),
        ]);

        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.tracks()[0].popularity, 10);
        assert_eq!(dataset.tracks()[1].track_id, "b");
    }

    #[test]
    fn test_incomplete_first_duplicate_removes_id() {
        // Dedup runs first, so the complete later row never gets a chance
        let (dataset, report) = prepare(&[
            row("abc", "40", "180000", "False", ""),
            row("abc", "40", "180000", "False", "-4.0"),
        ]);

        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.incomplete_removed, 1);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_complete_first_duplicate_survives() {
        let (dataset, _) = prepare(&[
            row("abc", "40", "180000", "False", "-4.0"),
            row("abc", "40", "180000", "False", ""),
        ]);

        assert_eq!(dataset.len(), 1);
        assert_relative_eq!(dataset.tracks()[0].loudness, -4.0);
    }

    #[test]
    fn test_malformed_cells_drop_the_row() {
        let (dataset, report) = prepare(&[
            row("a", "popular", "180000", "False", "-4.0"),
            row("b", "40", "three minutes", "False", "-4.0"),
            row("c", "40", "180000", "maybe", "-4.0"),
            row("d", "40", "180000", "False", "loud"),
            row("e", "40", "180000", "False", "NaN"),
            row("f", "40", "180000", "FALSE", "-4.0"),
        ]);

        assert_eq!(report.incomplete_removed, 5);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.tracks()[0].track_id, "f");
        assert!(!dataset.tracks()[0].explicit);
    }

    #[test]
    fn test_short_rows_are_incomplete() {
        let (dataset, report) = prepare(&[
            "short,row,only".to_string(),
            row("ok", "40", "180000", "False", "-4.0"),
        ]);

        assert_eq!(report.incomplete_removed, 1);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.tracks()[0].track_id, "ok");
    }

    #[test]
    fn test_rows_wider_than_header_reject_the_file() {
        let data = csv(&[
            row("ok", "40", "180000", "False", "-4.0"),
            format!("{},extra", row("long", "40", "180000", "False", "-4.0")),
        ]);
        assert!(matches!(prepare_tracks(data), Err(LoadError::Table(_))));
    }

    #[test]
    fn test_missing_values_in_extra_columns_drop_the_row() {
        let csv = format!(
            "Unnamed: 0,{HEADER},tempo\n0,{},120.0\n1,{},\n",
            row("a", "40", "180000", "False", "-4.0"),
            row("b", "40", "180000", "False", "-4.0"),
        );
        let (dataset, _) = prepare_tracks(csv.into_bytes()).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.extra_columns(), ["Unnamed: 0", "tempo"]);
        assert_eq!(dataset.tracks()[0].extras, vec!["0", "120.0"]);
        assert_eq!(dataset.column_count(), 18 + 3);
    }

    #[test]
    fn test_integer_columns_accept_whole_floats() {
        let (dataset, _) = prepare(&[
            row("a", "45.0", "180000.0", "True", "-4.0"),
            row("b", "45.5", "180000", "True", "-4.0"),
        ]);

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.tracks()[0].popularity, 45);
        assert_eq!(dataset.tracks()[0].duration_ms, 180000);
    }

    #[test]
    fn test_na_markers_are_missing() {
        let (dataset, report) = prepare(&[
            row("a", "40", "180000", "False", "NA"),
            row("b", "40", "180000", "False", "null"),
            row("c", "40", "180000", "False", "None"),
            row("d", "40", "180000", "False", "<NA>"),
            row("Nanami", "40", "180000", "False", "-4.0"),
        ]);

        assert_eq!(report.incomplete_removed, 4);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.tracks()[0].track_id, "Nanami");
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let csv = "track_id,popularity\na,10\n";
        let err = prepare_tracks(csv.as_bytes().to_vec()).unwrap_err();
        match err {
            LoadError::MissingColumns(columns) => {
                assert!(columns.contains(&"track_genre".to_string()));
                assert!(!columns.contains(&"track_id".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_yields_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = load_tracks(dir.path().join("does-not-exist.csv"));
        assert!(dataset.is_empty());
        assert_eq!(dataset.column_count(), 0);

        let err = try_load_tracks(&dir.path().join("does-not-exist.csv")).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_repeated_loads_are_identical() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "{}", row("a", "12", "123456", "False", "-7.25")).unwrap();
        writeln!(file, "{}", row("b", "99", "654321", "True", "-1.5")).unwrap();
        file.flush().unwrap();

        let first = load_tracks(file.path());
        let second = load_tracks(file.path());
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }
}
