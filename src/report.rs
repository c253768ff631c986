use crate::analysis::stats::{BoxSummary, CorrelationMatrix, ValueShare};
use crate::analysis::{
    ComparisonRow, ComparisonView, DatasetSummary, FeatureValue, FeatureView, GenreDetailView,
    GroupBox, OverviewView, RankingView, SelectionMetrics, TopTrack,
};
use crate::models::NumericColumn;
use anyhow::Result;
use serde::Serialize;

/// Print any view as pretty JSON
pub fn print_json<T: Serialize>(view: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

fn heading(title: &str) {
    println!("\n{title}");
    println!("{}", "=".repeat(title.chars().count()));
}

fn print_boxes(groups: &[GroupBox]) {
    let width = groups.iter().map(|g| g.group.len()).max().unwrap_or(0);
    for group in groups {
        println!("   {:<width$}  {}", group.group, format_box(&group.summary));
    }
}

fn format_box(summary: &BoxSummary) -> String {
    let outliers = if summary.outliers.is_empty() {
        String::new()
    } else {
        format!(" | {} outliers", summary.outliers.len())
    };
    format!(
        "n={} min={:.2} q1={:.2} median={:.2} q3={:.2} max={:.2}{}",
        summary.count, summary.min, summary.q1, summary.median, summary.q3, summary.max, outliers
    )
}

fn format_metrics(metrics: &SelectionMetrics) -> String {
    format!(
        "Tracks: {} | Unique artists: {} | Genres: {} | Mean duration: {:.2} min",
        metrics.tracks, metrics.artists, metrics.genres, metrics.mean_duration_min
    )
}

fn format_share(share: &ValueShare) -> String {
    format!("{}: {:.1}% ({})", share.label, share.proportion * 100.0, share.count)
}

/// Loudness is shown in dB with one decimal, the 0..1 features with three
fn format_feature(feature: &FeatureValue) -> String {
    if feature.feature == NumericColumn::Loudness {
        format!("{}: {:.1} dB", feature.feature, feature.value)
    } else {
        format!("{}: {:.3}", feature.feature, feature.value)
    }
}

fn format_comparison_row(row: &ComparisonRow) -> String {
    format!(
        "{:<24} {:>10.2} {:>12.2} {:>8.2} {:>8.2} {:>12.2} {:>7}",
        row.genre,
        row.popularity,
        row.danceability,
        row.energy,
        row.valence,
        row.duration_min,
        row.track_count
    )
}

fn format_genre_headline(view: &GenreDetailView) -> String {
    format!(
        "Tracks: {} | Mean popularity: {:.1} | Mean duration: {:.2} min | Unique artists: {} | Explicit: {:.1}%",
        view.tracks, view.mean_popularity, view.mean_duration_min, view.artists, view.explicit_percent
    )
}

fn format_top_track(track: &TopTrack) -> String {
    format!(
        "{:>2}. \"{}\" by {} - popularity {} ({:.2} min)",
        track.rank, track.track_name, track.artists, track.popularity, track.duration_min
    )
}

fn print_correlations(matrix: &CorrelationMatrix) {
    let width = matrix.columns.iter().map(|c| c.name().len()).max().unwrap_or(0);
    let header: Vec<String> = matrix
        .columns
        .iter()
        .map(|c| format!("{:>7}", &c.name()[..c.name().len().min(7)]))
        .collect();
    println!("   {:<width$}  {}", "", header.join(" "));
    for (column, row) in matrix.columns.iter().zip(&matrix.values) {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                Some(v) => format!("{v:>7.2}"),
                None => format!("{:>7}", "-"),
            })
            .collect();
        println!("   {:<width$}  {}", column.name(), cells.join(" "));
    }
}

pub fn print_summary(summary: &DatasetSummary) {
    heading("Spotify Tracks: Dataset Summary");
    println!("   Tracks: {} | Artists: {}", summary.tracks, summary.artists);
    println!("   Genres: {} | Attributes: {}", summary.genres, summary.attributes);
    if !summary.extra_columns.is_empty() {
        println!("   Extra columns: {}", summary.extra_columns.join(", "));
    }

    if summary.preview.is_empty() {
        return;
    }
    println!("\nFirst {} tracks:", summary.preview.len());
    for track in &summary.preview {
        println!(
            "   \"{}\" by {} [{}] popularity {} ({})",
            track.track_name,
            track.artists,
            track.album_name,
            track.popularity,
            track.classe_popularidade
        );
    }
    println!("Showing the first {} of {} records.", summary.preview.len(), summary.tracks);
}

pub fn print_genres(genres: &[&str]) {
    heading(&format!("{} genres", genres.len()));
    for genre in genres {
        println!("   {genre}");
    }
}

pub fn print_overview(view: &OverviewView) {
    heading("Overview");
    println!("   {}", format_metrics(&view.metrics));

    heading(&format!("Popularity by genre ({} tracks)", view.metrics.tracks));
    print_boxes(&view.popularity_by_genre);

    heading("Energy: explicit vs non-explicit");
    print_boxes(&view.energy_by_explicit);

    heading("Explicit content share");
    for share in &view.explicit_share {
        println!("   {}", format_share(share));
    }
}

pub fn print_features(view: &FeatureView) {
    heading("Musical characteristics");
    println!(
        "   Tracks: {} | Danceability: {:.2} | Energy: {:.2} | Valence: {:.2}",
        view.tracks, view.mean_danceability, view.mean_energy, view.mean_valence
    );

    heading(&format!("Danceability vs energy ({} sampled tracks)", view.scatter.len()));
    for point in view.scatter.iter().take(10) {
        println!(
            "   {:.3} / {:.3}  {} - {} [{}] popularity {}",
            point.danceability,
            point.energy,
            point.track_name,
            point.artists,
            point.track_genre,
            point.popularity
        );
    }
    if view.scatter.len() > 10 {
        println!("   ... {} more points (use --json for all)", view.scatter.len() - 10);
    }

    heading("Mean profile by genre");
    for profile in &view.radar {
        let values: Vec<String> = profile
            .features
            .iter()
            .map(|f| format!("{}={:.3}", f.feature, f.value))
            .collect();
        println!("   {}: {}", profile.genre, values.join(" "));
    }

    heading("Feature correlations");
    print_correlations(&view.correlations);

    heading("Valence by genre");
    print_boxes(&view.valence_by_genre);

    heading("Insights");
    for insight in &view.insights {
        println!(
            "   Highest {}: {} ({:.2})",
            insight.feature, insight.genre, insight.value
        );
    }
}

pub fn print_rankings(view: &RankingView, top: usize) {
    heading(&format!("Top {top} genres by {}", view.metric.column()));
    for (i, score) in view.ranking.iter().enumerate() {
        println!("   {:>2}. {:<24} {:.2}", i + 1, score.genre, score.value);
    }

    heading(&format!("Tracks per genre (top {})", view.volume.len()));
    for share in &view.volume {
        println!("   {:<24} {:>6} ({:.1}%)", share.label, share.count, share.proportion * 100.0);
    }
}

pub fn print_comparison(view: &ComparisonView) {
    heading(&format!("Comparing {}", view.genres.join(", ")));

    println!("\nMean profile:");
    for point in &view.profile {
        println!("   {:<18} {:<24} {:.3}", point.feature.name(), point.genre, point.value);
    }

    heading("Popularity distribution");
    print_boxes(&view.popularity_by_genre);

    heading("Comparison table");
    println!(
        "   {:<24} {:>10} {:>12} {:>8} {:>8} {:>12} {:>7}",
        "genre", "popularity", "danceability", "energy", "valence", "duration_min", "tracks"
    );
    for row in &view.table {
        println!("   {}", format_comparison_row(row));
    }
}

pub fn print_genre_detail(view: &GenreDetailView) {
    heading(&format!("Genre: {}", view.genre));
    println!("   {}", format_genre_headline(view));

    heading("Popularity distribution");
    let peak = view
        .popularity_histogram
        .bins
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for bin in &view.popularity_histogram.bins {
        let bar = "#".repeat(bin.count * 40 / peak);
        println!("   {:>6.1} - {:>6.1} {:>5} {}", bin.start, bin.end, bin.count, bar);
    }
    println!("   Mean: {:.1}", view.popularity_histogram.mean);

    println!("\n3D feature space: {} sampled tracks (use --json for points)", view.sample_3d.len());

    heading("Most popular tracks");
    for track in &view.top_tracks {
        println!("   {}", format_top_track(track));
    }

    heading("Mean profile");
    for feature in &view.profile {
        println!("   {}", format_feature(feature));
    }
}
