use super::stats::ValueShare;
use crate::models::{NumericColumn, Track};
use polars::prelude::*;

const GENRE: &str = "track_genre";
const LABEL: &str = "label";
const COUNT: &str = "count";
const ROW: &str = "row";

/// Per-genre means of a set of columns, in the order the columns were requested
#[derive(Debug, Clone, PartialEq)]
pub struct GenreMeans {
    pub genre: String,
    pub count: usize,
    pub means: Vec<f64>,
}

/// Columnar copy of a selection: the genre plus the requested numeric columns
pub fn track_frame(tracks: &[&Track], columns: &[NumericColumn]) -> PolarsResult<DataFrame> {
    let genres: Vec<&str> = tracks.iter().map(|t| t.track_genre.as_str()).collect();
    let mut frame = vec![Column::new(GENRE.into(), genres)];
    for column in columns {
        let values: Vec<f64> = tracks.iter().map(|t| column.value(t)).collect();
        frame.push(Column::new(column.name().into(), values));
    }
    DataFrame::new(frame)
}

/// Number of distinct values
pub fn unique_count<'a, I: IntoIterator<Item = &'a str>>(values: I) -> PolarsResult<usize> {
    let values: Vec<&str> = values.into_iter().collect();
    Series::new("values".into(), values).n_unique()
}

/// Normalized value counts, most frequent first, ties by label
pub fn value_counts<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> PolarsResult<Vec<ValueShare>> {
    count_labels(labels.into_iter().collect(), None)
}

/// The `n` genres with the most tracks
pub fn top_genres(tracks: &[&Track], n: usize) -> PolarsResult<Vec<ValueShare>> {
    let genres = tracks.iter().map(|t| t.track_genre.as_str()).collect();
    count_labels(genres, Some(n))
}

fn count_labels(labels: Vec<&str>, limit: Option<usize>) -> PolarsResult<Vec<ValueShare>> {
    let total = labels.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut counts = DataFrame::new(vec![Column::new(LABEL.into(), labels)])?
        .lazy()
        .group_by([col(LABEL)])
        .agg([len().cast(DataType::UInt64).alias(COUNT)])
        .sort_by_exprs(
            [col(COUNT), col(LABEL)],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        );
    if let Some(n) = limit {
        counts = counts.limit(idx_limit(n));
    }
    let counts = counts.collect()?;

    let labels = counts.column(LABEL)?.as_materialized_series().str()?;
    let values = counts.column(COUNT)?.as_materialized_series().u64()?;
    Ok(labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, count)| {
            let count = count? as usize;
            Some(ValueShare {
                label: label?.to_string(),
                count,
                proportion: count as f64 / total as f64,
            })
        })
        .collect())
}

/// Mean of each column per genre, genres in ascending order
pub fn genre_means(tracks: &[&Track], columns: &[NumericColumn]) -> PolarsResult<Vec<GenreMeans>> {
    aggregate_by_genre(
        tracks,
        columns,
        [col(GENRE)],
        SortMultipleOptions::default(),
        None,
    )
}

/// Genres ordered by the mean of `by`, highest first, ties in genre order.
///
/// `by` must be one of `columns`.
pub fn genre_means_ranked(
    tracks: &[&Track],
    columns: &[NumericColumn],
    by: NumericColumn,
    limit: Option<usize>,
) -> PolarsResult<Vec<GenreMeans>> {
    aggregate_by_genre(
        tracks,
        columns,
        [col(by.name()), col(GENRE)],
        SortMultipleOptions::default().with_order_descending_multi([true, false]),
        limit,
    )
}

fn aggregate_by_genre<const N: usize>(
    tracks: &[&Track],
    columns: &[NumericColumn],
    order: [Expr; N],
    options: SortMultipleOptions,
    limit: Option<usize>,
) -> PolarsResult<Vec<GenreMeans>> {
    if tracks.is_empty() {
        return Ok(Vec::new());
    }

    let mut aggregations: Vec<Expr> = columns.iter().map(|c| col(c.name()).mean()).collect();
    aggregations.push(len().cast(DataType::UInt64).alias(COUNT));

    let mut grouped = track_frame(tracks, columns)?
        .lazy()
        .group_by([col(GENRE)])
        .agg(aggregations)
        .sort_by_exprs(order, options);
    if let Some(n) = limit {
        grouped = grouped.limit(idx_limit(n));
    }
    let grouped = grouped.collect()?;

    let genres = grouped.column(GENRE)?.as_materialized_series().str()?;
    let counts = grouped.column(COUNT)?.as_materialized_series().u64()?;
    let mut means = Vec::with_capacity(columns.len());
    for column in columns {
        means.push(grouped.column(column.name())?.as_materialized_series().f64()?);
    }

    Ok((0..grouped.height())
        .filter_map(|i| {
            Some(GenreMeans {
                genre: genres.get(i)?.to_string(),
                count: counts.get(i)? as usize,
                means: means.iter().map(|m| m.get(i)).collect::<Option<Vec<f64>>>()?,
            })
        })
        .collect())
}

/// The `n` most popular tracks; equal popularity keeps table order
pub fn top_by_popularity<'a>(tracks: &[&'a Track], n: usize) -> PolarsResult<Vec<&'a Track>> {
    if tracks.is_empty() {
        return Ok(Vec::new());
    }

    let top = track_frame(tracks, &[NumericColumn::Popularity])?
        .lazy()
        .with_row_index(ROW, None)
        .sort_by_exprs(
            [col(NumericColumn::Popularity.name())],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(idx_limit(n))
        .select([col(ROW).cast(DataType::UInt64)])
        .collect()?;

    let rows = top.column(ROW)?.as_materialized_series().u64()?;
    Ok(rows
        .into_iter()
        .flatten()
        .filter_map(|row| tracks.get(row as usize).copied())
        .collect())
}

fn idx_limit(n: usize) -> IdxSize {
    IdxSize::try_from(n).unwrap_or(IdxSize::MAX)
}
