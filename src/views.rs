//! Per-page data for the dashboard.
//!
//! Every page is one function from the canonical table and its selections to
//! a plain, serializable struct the renderer draws. Anything a page cannot
//! show becomes a notice instead of an error.

use serde::{Deserialize, Serialize};

use crate::config::DashboardConfig;
use crate::data::classify::{
    categorical_columns, hue_candidates, is_valid_for, numeric_columns, ordinal_columns, Purpose,
};
use crate::data::filter::{filter_rows, Predicate};
use crate::data::model::{ColumnKind, StudentTable, TablePreview};
use crate::data::ordinal::{
    COMPARISON_METRICS, CORRELATION_COLUMNS, KNOWN_CATEGORICAL, KNOWN_NUMERIC_FACTORS,
};
use crate::data::query::{
    compare_to_population, correlation_matrix, group_distributions, group_means, histogram,
    scatter_points, summary_stats, threshold_count, CorrelationMatrix, GroupDistribution,
    GroupMean, HistogramBin, MetricComparison, ScatterPoint, SummaryStats, ThresholdCount,
};
use crate::error::DataResult;

/// Columns listed in the filtered student table.
const LIST_COLUMNS: &[&str] = &[
    "Hours_Studied",
    "Attendance",
    "Previous_Scores",
    "Motivation_Level",
];

/// Keep the value, or record the error as a notice.
fn or_notice<T>(result: DataResult<T>, notices: &mut Vec<String>) -> Option<T> {
    result.map_err(|e| notices.push(e.to_string())).ok()
}

// ---------------------------------------------------------------------------
// Column overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
    pub distinct: usize,
    pub missing: usize,
    pub groupable: bool,
    pub out_of_band: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaPage {
    pub students: usize,
    pub numeric: Vec<String>,
    pub ordinal: Vec<String>,
    pub categorical: Vec<String>,
    pub columns: Vec<ColumnInfo>,
}

/// Column kinds and data-quality counts of the loaded table.
pub fn schema(table: &StudentTable, cfg: &DashboardConfig) -> SchemaPage {
    let to_owned = |names: Vec<&str>| -> Vec<String> {
        names.into_iter().map(str::to_string).collect()
    };
    SchemaPage {
        students: table.len(),
        numeric: to_owned(numeric_columns(table)),
        ordinal: to_owned(ordinal_columns(table).into_iter().map(|(n, _)| n).collect()),
        categorical: to_owned(categorical_columns(table)),
        columns: table
            .columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                kind: c.kind(),
                distinct: c.levels().len(),
                missing: c.values().iter().filter(|v| v.is_missing()).count(),
                groupable: is_valid_for(
                    table,
                    c.name(),
                    Purpose::Grouping {
                        max_groups: cfg.max_groups,
                    },
                ),
                out_of_band: c.out_of_band_labels(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Overall performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewPage {
    pub total_students: usize,
    pub score: Option<SummaryStats>,
    pub pass_threshold: f64,
    pub passing: Option<ThresholdCount>,
    pub distribution: Vec<HistogramBin>,
    pub by_school_type: Vec<GroupMean>,
    pub notices: Vec<String>,
}

/// KPIs, score distribution and mean score per school type.
pub fn overview(table: &StudentTable, cfg: &DashboardConfig) -> OverviewPage {
    let mut notices = Vec::new();
    let score = &cfg.score_column;

    let summary = or_notice(summary_stats(table, score), &mut notices);
    // Same error as the summary when the score column is unusable.
    let passing = threshold_count(table, score, cfg.pass_threshold).ok();
    let distribution = histogram(table, score, cfg.histogram_bins).unwrap_or_default();

    let by_school_type = if table.column("School_Type").is_some() {
        or_notice(group_means(table, "School_Type", score), &mut notices).unwrap_or_default()
    } else {
        notices.push("Column 'School_Type' not found in the data.".to_string());
        Vec::new()
    };

    OverviewPage {
        total_students: table.len(),
        score: summary,
        pass_threshold: cfg.pass_threshold,
        passing,
        distribution,
        by_school_type,
        notices,
    }
}

// ---------------------------------------------------------------------------
// Factor exploration
// ---------------------------------------------------------------------------

/// What the viewer picked on the factors page; `None` means "default".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FactorSelection {
    pub numeric_factor: Option<String>,
    pub hue: Option<String>,
    pub categorical_factor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorsPage {
    pub numeric_factors: Vec<String>,
    pub numeric_factor: Option<String>,
    pub hue_options: Vec<String>,
    pub hue: Option<String>,
    pub scatter: Vec<ScatterPoint>,
    pub categorical_factors: Vec<String>,
    pub categorical_factor: Option<String>,
    pub box_plot: Vec<GroupDistribution>,
    pub correlation: Option<CorrelationMatrix>,
    pub notices: Vec<String>,
}

/// Resolve a selection against the valid options, defaulting to the first.
fn pick(
    requested: Option<&str>,
    options: &[String],
    what: &str,
    notices: &mut Vec<String>,
) -> Option<String> {
    match requested {
        Some(name) if options.iter().any(|o| o == name) => Some(name.to_string()),
        Some(name) => {
            notices.push(format!("'{name}' is not a valid {what}; showing the default."));
            options.first().cloned()
        }
        None => options.first().cloned(),
    }
}

/// Scatter against the score, box plots per factor and the correlation heatmap.
pub fn factors(table: &StudentTable, cfg: &DashboardConfig, selection: &FactorSelection) -> FactorsPage {
    let mut notices = Vec::new();
    let score = cfg.score_column.as_str();

    let numeric_factors: Vec<String> = KNOWN_NUMERIC_FACTORS
        .iter()
        .filter(|f| is_valid_for(table, f, Purpose::Scatter))
        .map(|f| f.to_string())
        .collect();
    if numeric_factors.is_empty() {
        notices.push("No valid numerical factors found for scatter plot.".to_string());
    }
    let numeric_factor = pick(
        selection.numeric_factor.as_deref(),
        &numeric_factors,
        "numerical factor",
        &mut notices,
    );

    let hue_options: Vec<String> = numeric_factor
        .as_deref()
        .map(|f| hue_candidates(table, f, cfg.max_groups))
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect();
    let hue = match selection.hue.as_deref() {
        Some(h) if hue_options.iter().any(|o| o == h) => Some(h.to_string()),
        Some(h) => {
            notices.push(format!("'{h}' cannot colour the scatter plot."));
            None
        }
        None => None,
    };

    let scatter = numeric_factor
        .as_deref()
        .and_then(|x| or_notice(scatter_points(table, x, score, hue.as_deref()), &mut notices))
        .unwrap_or_default();

    let categorical_factors: Vec<String> = ordinal_columns(table)
        .into_iter()
        .map(|(name, _)| name)
        .chain(
            KNOWN_CATEGORICAL
                .iter()
                .copied()
                .filter(|name| table.column(name).is_some()),
        )
        .map(str::to_string)
        .collect();
    if categorical_factors.is_empty() {
        notices.push("No valid categorical factors found for box plot.".to_string());
    }
    let categorical_factor = pick(
        selection.categorical_factor.as_deref(),
        &categorical_factors,
        "categorical factor",
        &mut notices,
    );
    let box_plot = categorical_factor
        .as_deref()
        .and_then(|c| or_notice(group_distributions(table, c, score), &mut notices))
        .unwrap_or_default();

    let correlation = match correlation_matrix(table, CORRELATION_COLUMNS) {
        Ok(matrix) => Some(matrix),
        Err(_) => {
            notices.push(
                "Not enough numerical columns found/valid for a correlation heatmap.".to_string(),
            );
            None
        }
    };

    FactorsPage {
        numeric_factors,
        numeric_factor,
        hue_options,
        hue,
        scatter,
        categorical_factors,
        categorical_factor,
        box_plot,
        correlation,
        notices,
    }
}

// ---------------------------------------------------------------------------
// Student deep dive
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeepDiveSelection {
    pub filters: Vec<Predicate>,
    pub student_id: Option<i64>,
}

/// Whole-number slider bounds for the score range filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepDivePage {
    pub score_bounds: ScoreBounds,
    pub filter_options: Vec<FilterOption>,
    pub matched: usize,
    pub students: TablePreview,
    pub student_id: Option<i64>,
    /// Against the whole table, never the filtered list.
    pub comparison: Vec<MetricComparison>,
    pub notices: Vec<String>,
}

/// Filtered student list plus one student against the population.
///
/// `table` must be the full canonical table: the filters are applied here,
/// and population means are always taken over every student.
pub fn deep_dive(
    table: &StudentTable,
    cfg: &DashboardConfig,
    selection: &DeepDiveSelection,
) -> DeepDivePage {
    let mut notices = Vec::new();
    let score = cfg.score_column.as_str();

    let score_bounds = match summary_stats(table, score) {
        Ok(SummaryStats {
            min: Some(min),
            max: Some(max),
            ..
        }) => ScoreBounds {
            min: min.floor(),
            max: max.ceil(),
        },
        _ => {
            notices.push(format!(
                "{score} column is not numeric. Using default range 0-100."
            ));
            ScoreBounds { min: 0.0, max: 100.0 }
        }
    };

    let filter_options = ordinal_columns(table)
        .into_iter()
        .map(|(name, _)| name)
        .chain(
            KNOWN_CATEGORICAL
                .iter()
                .copied()
                .filter(|name| table.column(name).is_some()),
        )
        .filter_map(|name| table.column(name))
        .map(|col| FilterOption {
            column: col.name().to_string(),
            values: col.levels().iter().filter_map(|v| v.label()).collect(),
        })
        .collect();

    let filtered = or_notice(filter_rows(table, &selection.filters), &mut notices);
    let filtered = filtered.unwrap_or_else(|| table.clone());
    if filtered.is_empty() {
        notices.push("No students match the current filter criteria.".to_string());
    }

    let list_columns: Vec<&str> = LIST_COLUMNS.iter().copied().chain([score]).collect();
    let students = filtered.project(&list_columns, cfg.preview_rows);

    let student_id = match selection.student_id {
        Some(id) if table.position_of(id).is_some() => Some(id),
        Some(id) => {
            notices.push(format!("No student with id {id}."));
            None
        }
        None => filtered.ids().first().or(table.ids().first()).copied(),
    };

    let metrics: Vec<&str> = COMPARISON_METRICS
        .iter()
        .copied()
        .filter(|m| table.column(m).is_some_and(|c| c.is_numeric()))
        .collect();
    let comparison = match student_id {
        Some(_) if metrics.is_empty() => {
            notices.push(
                "Not enough valid numeric metrics for comparison for the selected student."
                    .to_string(),
            );
            Vec::new()
        }
        Some(id) => or_notice(compare_to_population(table, id, &metrics), &mut notices)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    DeepDivePage {
        score_bounds,
        filter_options,
        matched: filtered.len(),
        students,
        student_id,
        comparison,
        notices,
    }
}
