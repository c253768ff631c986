use crate::analysis::ViewSettings;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATASET_PATH: &str = "./dataset/dataset.csv";

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub views: ViewSettings,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from a variable lookup, falling back to defaults
pub fn config_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ViewSettings::default();
    let dataset_path = lookup("TRACKS_DATASET_PATH")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH));

    let views = ViewSettings {
        scatter_sample_size: parse_var(&lookup, "TRACKS_SCATTER_SAMPLE", defaults.scatter_sample_size)?,
        scatter_3d_sample_size: parse_var(
            &lookup,
            "TRACKS_SCATTER_3D_SAMPLE",
            defaults.scatter_3d_sample_size,
        )?,
        histogram_bins: parse_var(&lookup, "TRACKS_HISTOGRAM_BINS", defaults.histogram_bins)?,
        default_top_genres: parse_var(
            &lookup,
            "TRACKS_DEFAULT_TOP_GENRES",
            defaults.default_top_genres,
        )?,
        preview_rows: defaults.preview_rows,
    };

    if views.histogram_bins == 0 {
        anyhow::bail!("TRACKS_HISTOGRAM_BINS must be at least 1");
    }

    Ok(Config {
        dataset_path,
        views,
    })
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        _ => Ok(default),
    }
}
