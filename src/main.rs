use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

mod analysis;
mod config;
mod dataset;
mod models;
mod report;


use crate::analysis::{
    DEFAULT_COMPARED_GENRES, ExplicitFilter, RankingMetric, TrackFilter, ViewError, ViewSettings,
};
use crate::config::load_config;
use crate::dataset::{Dataset, DatasetCache};
use crate::models::PopularityClass;

#[derive(Parser)]
#[command(name = "track-insights")]
#[command(about = "Exploratory analysis of a Spotify tracks dataset")]
#[command(version)]
struct Args {
    /// Path to the tracks CSV file (overrides TRACKS_DATASET_PATH)
    #[arg(short = 'd', long = "dataset", global = true)]
    dataset: Option<PathBuf>,

    /// Print views as JSON instead of text
    #[arg(long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Headline numbers and the first rows of the dataset
    Summary {
        /// Number of rows to preview
        #[arg(long = "preview")]
        preview: Option<usize>,
    },
    /// List the genres present in the dataset
    Genres,
    /// Popularity and explicit content overview of a selection
    Overview {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Audio feature analysis of a selection
    Features {
        #[command(flatten)]
        filter: FilterArgs,

        /// Seed for the scatter sample, random when omitted
        #[arg(long = "seed")]
        seed: Option<u64>,
    },
    /// Rank genres by the mean of a metric
    Rankings {
        /// Number of genres to rank (5 to 20)
        #[arg(short = 'n', long = "top", default_value_t = 10)]
        top: usize,

        #[arg(short = 'm', long = "metric", value_enum, default_value_t = RankingMetric::Popularity)]
        metric: RankingMetric,
    },
    /// Compare up to five genres side by side
    Compare {
        /// Genres to compare; defaults to the three largest
        #[arg(short = 'g', long = "genre")]
        genres: Vec<String>,
    },
    /// Detailed analysis of a single genre
    Genre {
        name: String,

        /// Seed for the 3D sample, random when omitted
        #[arg(long = "seed")]
        seed: Option<u64>,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Genres to include (repeatable); defaults to the largest genres
    #[arg(short = 'g', long = "genre")]
    genres: Vec<String>,

    /// Explicit content filter
    #[arg(short = 'e', long = "explicit", value_enum, default_value_t = ExplicitFilter::All)]
    explicit: ExplicitFilter,

    #[arg(long = "min-popularity", default_value_t = 0)]
    min_popularity: i32,

    #[arg(long = "max-popularity", default_value_t = 100)]
    max_popularity: i32,

    /// Lowest popularity class (Baixa, Media, Alta, "Hit Global")
    #[arg(long = "min-class", value_parser = parse_class)]
    min_class: Option<PopularityClass>,

    /// Highest popularity class
    #[arg(long = "max-class", value_parser = parse_class)]
    max_class: Option<PopularityClass>,
}

impl FilterArgs {
    fn to_filter(&self, dataset: &Dataset, settings: &ViewSettings) -> Result<TrackFilter, ViewError> {
        let genres = if self.genres.is_empty() {
            analysis::default_genres(dataset, settings.default_top_genres)?
        } else {
            self.genres.clone()
        };

        let class_range = match (self.min_class, self.max_class) {
            (None, None) => None,
            (low, high) => Some((
                low.unwrap_or(PopularityClass::Baixa),
                high.unwrap_or(PopularityClass::HitGlobal),
            )),
        };

        Ok(TrackFilter {
            genres,
            explicit: self.explicit,
            popularity_range: (self.min_popularity, self.max_popularity),
            class_range,
        })
    }
}

fn parse_class(value: &str) -> Result<PopularityClass, String> {
    PopularityClass::from_label(value)
        .ok_or_else(|| format!("unknown popularity class '{value}' (expected Baixa, Media, Alta or Hit Global)"))
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // Load configuration from .env, then let the command line win
    let mut config = load_config()?;
    if let Some(path) = args.dataset {
        config.dataset_path = path;
    }

    let mut cache = DatasetCache::new();
    let dataset = cache.get_or_load(&config.dataset_path);

    if dataset.is_empty() {
        eprintln!(
            "Waiting for the tracks dataset at '{}'. Place the CSV there or pass --dataset.",
            config.dataset_path.display()
        );
        return Ok(());
    }
    if let Some(loaded_at) = cache.loaded_at(&config.dataset_path) {
        debug!("Dataset prepared at {}", loaded_at.format("%Y-%m-%d %H:%M:%S"));
    }

    match run(&args.command, &dataset, &config.views, args.json) {
        Ok(()) => Ok(()),
        // Empty selections and bad filter choices are warnings, not failures
        Err(e) => match e.downcast_ref::<ViewError>() {
            Some(view_error) => {
                eprintln!("Warning: {view_error}");
                Ok(())
            }
            None => Err(e),
        },
    }
}

fn run(command: &Command, dataset: &Dataset, settings: &ViewSettings, json: bool) -> Result<()> {
    match command {
        Command::Summary { preview } => {
            let view = analysis::dataset_summary(dataset, preview.unwrap_or(settings.preview_rows))?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_summary(&view);
            }
        }
        Command::Genres => {
            let genres = dataset.genres();
            if json {
                report::print_json(&genres)?;
            } else {
                report::print_genres(&genres);
            }
        }
        Command::Overview { filter } => {
            let view = analysis::overview(dataset, &filter.to_filter(dataset, settings)?)?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_overview(&view);
            }
        }
        Command::Features { filter, seed } => {
            let view = analysis::features(
                dataset,
                &filter.to_filter(dataset, settings)?,
                settings,
                &mut rng_for(*seed),
            )?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_features(&view);
            }
        }
        Command::Rankings { top, metric } => {
            let view = analysis::rankings(dataset, *metric, *top)?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_rankings(&view, *top);
            }
        }
        Command::Compare { genres } => {
            let genres = if genres.is_empty() {
                analysis::default_genres(dataset, DEFAULT_COMPARED_GENRES)?
            } else {
                genres.clone()
            };
            let view = analysis::comparison(dataset, &genres)?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_comparison(&view);
            }
        }
        Command::Genre { name, seed } => {
            let view = analysis::genre_detail(dataset, name, settings, &mut rng_for(*seed))?;
            if json {
                report::print_json(&view)?;
            } else {
                report::print_genre_detail(&view);
            }
        }
    }

    Ok(())
}
