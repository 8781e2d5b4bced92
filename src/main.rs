use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use student_dashboard::config::load_config;
use student_dashboard::data::cache::TableCache;
use student_dashboard::data::filter::{Predicate, Selection};
use student_dashboard::state::DashboardState;
use student_dashboard::views::{self, FactorSelection};

#[derive(Parser)]
#[command(name = "student-dashboard")]
#[command(about = "Student performance dashboard data, one page at a time", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Data file (.csv, .json or .parquet); overrides the config
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    page: Page,
}

#[derive(Subcommand)]
enum Page {
    /// Column kinds and data-quality counts
    Columns,
    /// Overall performance: KPIs, score distribution, scores by school type
    Overview {
        #[arg(long)]
        pass_threshold: Option<f64>,
    },
    /// Factors vs. exam score: scatter, box plot, correlation heatmap
    Factors {
        #[arg(long)]
        factor: Option<String>,
        #[arg(long)]
        hue: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Filtered student list and one student against everyone
    DeepDive {
        #[arg(long)]
        score_min: Option<f64>,
        #[arg(long)]
        score_max: Option<f64>,
        /// Exact match as COLUMN=VALUE (VALUE "All" disables it); repeatable
        #[arg(long = "filter", value_parser = parse_match)]
        filters: Vec<Predicate>,
        #[arg(long)]
        student: Option<i64>,
    },
}

fn parse_match(s: &str) -> Result<Predicate, String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{s}'"))?;
    let selection = match value {
        "All" => Selection::All,
        v => Selection::Value(v.to_string()),
    };
    Ok(Predicate::Match {
        column: column.to_string(),
        selection,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(data) = cli.data {
        cfg.data_path = data;
    }

    let mut state = DashboardState::new(Arc::new(TableCache::new()), cfg.data_path.clone());
    state
        .refresh()
        .with_context(|| format!("loading {}", cfg.data_path.display()))?;
    let table = state.table()?.clone();

    let json = match cli.page {
        Page::Columns => serde_json::to_string_pretty(&views::schema(&table, &cfg))?,
        Page::Overview { pass_threshold } => {
            if let Some(threshold) = pass_threshold {
                cfg.pass_threshold = threshold;
            }
            serde_json::to_string_pretty(&views::overview(&table, &cfg))?
        }
        Page::Factors {
            factor,
            hue,
            category,
        } => {
            let selection = FactorSelection {
                numeric_factor: factor,
                hue,
                categorical_factor: category,
            };
            serde_json::to_string_pretty(&views::factors(&table, &cfg, &selection))?
        }
        Page::DeepDive {
            score_min,
            score_max,
            filters,
            student,
        } => {
            if score_min.is_some() || score_max.is_some() {
                state
                    .add_filter(Predicate::Range {
                        column: cfg.score_column.clone(),
                        min: score_min.unwrap_or(f64::NEG_INFINITY),
                        max: score_max.unwrap_or(f64::INFINITY),
                    })
                    .context("score range filter")?;
            }
            for filter in filters {
                let column = filter.column().to_string();
                state
                    .add_filter(filter)
                    .with_context(|| format!("filter on '{column}'"))?;
            }
            if let Some(id) = student {
                state.select_student(id)?;
            }
            serde_json::to_string_pretty(&state.deep_dive(&cfg)?)?
        }
    };

    println!("{json}");
    Ok(())
}
