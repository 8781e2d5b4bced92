use log::debug;
use serde::Serialize;

use super::classify::{is_valid_for, Purpose};
use super::model::{CellValue, Column, StudentTable};
use super::stats;
use crate::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Descriptive statistics over the non-missing values of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCount {
    pub count: usize,
    /// Share of all rows, 0.0 for an empty table.
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub label: String,
    pub count: usize,
    /// `None` when every metric value in the group is missing.
    pub mean: Option<f64>,
}

/// Five-number summary of one group, as drawn by a box plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub label: String,
    pub count: usize,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

/// Square, symmetric Pearson matrix over `columns`.
///
/// Diagonal cells are always `Some(1.0)`; off-diagonal cells are `None` when
/// the pair has fewer than two complete rows or no variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: String,
    pub individual: Option<f64>,
    pub population_mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub student_id: i64,
    pub x: f64,
    pub y: f64,
    pub hue: Option<String>,
}

// ---------------------------------------------------------------------------
// Aggregates over one metric
// ---------------------------------------------------------------------------

pub fn summary_stats(table: &StudentTable, metric: &str) -> DataResult<SummaryStats> {
    let values = table.require_numeric(metric)?.present_numbers();
    let sorted = stats::sorted(&values);
    Ok(SummaryStats {
        count: values.len(),
        mean: stats::mean(&values),
        median: stats::quantile_sorted(&sorted, 0.5),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
    })
}

/// Rows whose `metric` is at least `threshold`, and their share of all rows.
pub fn threshold_count(
    table: &StudentTable,
    metric: &str,
    threshold: f64,
) -> DataResult<ThresholdCount> {
    let column = table.require_numeric(metric)?;
    let count = column
        .numbers()
        .filter(|v| v.is_some_and(|v| v >= threshold))
        .count();
    let fraction = if table.is_empty() {
        0.0
    } else {
        count as f64 / table.len() as f64
    };
    Ok(ThresholdCount { count, fraction })
}

/// Equal-width bins spanning the metric's range; the last bin is closed.
///
/// A constant metric yields one bin of width 1 centred on the value.
pub fn histogram(table: &StudentTable, metric: &str, bins: usize) -> DataResult<Vec<HistogramBin>> {
    let values = table.require_numeric(metric)?.present_numbers();
    if bins == 0 || values.is_empty() {
        return Ok(Vec::new());
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi, bins) = if max > min {
        (min, max, bins)
    } else {
        (min - 0.5, min + 0.5, 1)
    };
    // Work on halves so the span stays finite for any finite range.
    let half_span = hi / 2.0 - lo / 2.0;
    let n = bins as f64;
    let edge = |i: usize| (lo / 2.0 + half_span * (i as f64 / n)) * 2.0;

    let mut counts = vec![0usize; bins];
    for v in values {
        let pos = (v / 2.0 - lo / 2.0) / half_span;
        let idx = ((pos * n) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: edge(i),
            upper: if i + 1 == bins { hi } else { edge(i + 1) },
            count,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Grouped aggregates
// ---------------------------------------------------------------------------

/// Metric values per level of `group`, in the group column's level order.
fn grouped_values<'a>(
    table: &'a StudentTable,
    group: &str,
    metric: &str,
) -> DataResult<Vec<(&'a CellValue, Vec<Option<f64>>)>> {
    let group_col = table.require(group)?;
    let metric_col = table.require_numeric(metric)?;

    let mut groups: Vec<(&CellValue, Vec<Option<f64>>)> =
        group_col.levels().iter().map(|l| (l, Vec::new())).collect();
    for (label, value) in group_col.values().iter().zip(metric_col.numbers()) {
        if let Some((_, bucket)) = groups.iter_mut().find(|(l, _)| *l == label) {
            bucket.push(value);
        }
    }
    Ok(groups)
}

/// Mean of `metric` for every label of `group` present in the data.
///
/// Ordinal groups come in declared rank order; all others in first-seen
/// order. Rows with a missing label are left out.
pub fn group_means(table: &StudentTable, group: &str, metric: &str) -> DataResult<Vec<GroupMean>> {
    Ok(grouped_values(table, group, metric)?
        .into_iter()
        .map(|(label, values)| {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            GroupMean {
                label: label.to_string(),
                count: values.len(),
                mean: stats::mean(&present),
            }
        })
        .collect())
}

/// Box-plot summary of `metric` for every label of `group`, ordered like
/// [`group_means`].
pub fn group_distributions(
    table: &StudentTable,
    group: &str,
    metric: &str,
) -> DataResult<Vec<GroupDistribution>> {
    Ok(grouped_values(table, group, metric)?
        .into_iter()
        .map(|(label, values)| {
            let present: Vec<f64> = values.into_iter().flatten().collect();
            let sorted = stats::sorted(&present);
            GroupDistribution {
                label: label.to_string(),
                count: sorted.len(),
                min: sorted.first().copied(),
                q1: stats::quantile_sorted(&sorted, 0.25),
                median: stats::quantile_sorted(&sorted, 0.5),
                q3: stats::quantile_sorted(&sorted, 0.75),
                max: sorted.last().copied(),
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Relationships between metrics
// ---------------------------------------------------------------------------

/// Pairwise complete-case Pearson correlation over the usable columns.
///
/// Unknown, non-numeric and all-missing columns are skipped, as are repeats.
/// Fails with `InsufficientColumns` when fewer than two remain.
pub fn correlation_matrix(table: &StudentTable, columns: &[&str]) -> DataResult<CorrelationMatrix> {
    let mut usable: Vec<&Column> = Vec::new();
    for &name in columns {
        if usable.iter().any(|c| c.name() == name) {
            continue;
        }
        match table.column(name) {
            Some(col) if is_valid_for(table, name, Purpose::Correlation) => usable.push(col),
            _ => debug!("Skipping '{name}' in correlation matrix"),
        }
    }
    if usable.len() < 2 {
        return Err(DataError::InsufficientColumns(usable.len()));
    }

    let series: Vec<Vec<Option<f64>>> = usable.iter().map(|c| c.numbers().collect()).collect();
    let n = usable.len();
    let mut values = vec![vec![Some(1.0); n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .collect();
            let r = stats::pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: usable.iter().map(|c| c.name().to_string()).collect(),
        values,
    })
}

/// Points for an `x` vs `y` scatter plot, optionally labelled by `hue`.
/// Rows missing either coordinate are dropped.
pub fn scatter_points(
    table: &StudentTable,
    x: &str,
    y: &str,
    hue: Option<&str>,
) -> DataResult<Vec<ScatterPoint>> {
    let xs = table.require_numeric(x)?;
    let ys = table.require_numeric(y)?;
    let hue = hue.map(|h| table.require(h)).transpose()?;

    Ok(table
        .ids()
        .iter()
        .enumerate()
        .filter_map(|(row, &student_id)| {
            Some(ScatterPoint {
                student_id,
                x: xs.values()[row].as_f64()?,
                y: ys.values()[row].as_f64()?,
                hue: hue.and_then(|h| h.values()[row].label()),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Individual vs population
// ---------------------------------------------------------------------------

/// One student's value next to the mean of the whole `table` for each metric.
///
/// The mean is taken over every row of the table passed in, so callers
/// comparing against "everyone" must pass the full canonical table, not a
/// filtered view.
pub fn compare_to_population(
    table: &StudentTable,
    student_id: i64,
    metrics: &[&str],
) -> DataResult<Vec<MetricComparison>> {
    if table.position_of(student_id).is_none() {
        return Err(DataError::RowNotFound(student_id));
    }

    metrics
        .iter()
        .map(|&metric| {
            let column = table.require_numeric(metric)?;
            Ok(MetricComparison {
                metric: metric.to_string(),
                individual: table.value(metric, student_id)?.as_f64(),
                population_mean: stats::mean(&column.present_numbers()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::loader::from_rows;

    fn corr(m: &CorrelationMatrix, a: &str, b: &str) -> Option<f64> {
        let i = m.columns.iter().position(|c| c == a)?;
        let j = m.columns.iter().position(|c| c == b)?;
        m.values[i][j]
    }

    fn int(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn scores(values: &[i64]) -> StudentTable {
        from_rows(
            vec!["Exam_Score".into()],
            values.iter().map(|&v| vec![int(v)]).collect(),
        )
        .unwrap()
    }

    fn empty() -> StudentTable {
        from_rows(vec!["Exam_Score".into()], Vec::new()).unwrap()
    }

    fn factors() -> StudentTable {
        from_rows(
            vec![
                "Motivation_Level".into(),
                "School_Type".into(),
                "Hours_Studied".into(),
                "Exam_Score".into(),
            ],
            vec![
                vec![text("High"), text("Public"), int(30), int(90)],
                vec![text("Low"), text("Private"), int(10), int(60)],
                vec![text("Medium"), text("Public"), int(20), int(70)],
                vec![text("Low"), text("Private"), int(12), int(62)],
                vec![CellValue::Missing, text("Public"), CellValue::Missing, int(75)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn summary_of_scores() {
        let stats = summary_stats(&scores(&[50, 70, 80, 90, 95]), "Exam_Score").unwrap();
        assert_eq!(
            stats,
            SummaryStats {
                count: 5,
                mean: Some(77.0),
                median: Some(80.0),
                min: Some(50.0),
                max: Some(95.0),
            }
        );
    }

    #[test]
    fn summary_of_empty_table_has_no_values() {
        let stats = summary_stats(&empty(), "Exam_Score").unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.max, None);
    }

    #[test]
    fn summary_validates_column() {
        let table = factors();
        assert_eq!(
            summary_stats(&table, "Sleep_Hours").unwrap_err(),
            DataError::ColumnNotFound("Sleep_Hours".into())
        );
        assert_eq!(
            summary_stats(&table, "School_Type").unwrap_err(),
            DataError::NotNumeric("School_Type".into())
        );
    }

    #[test]
    fn threshold_counts_at_or_above() {
        let result = threshold_count(&scores(&[50, 70, 80, 90, 95]), "Exam_Score", 70.0).unwrap();
        assert_eq!(result, ThresholdCount { count: 4, fraction: 0.8 });
    }

    #[test]
    fn threshold_on_empty_table_is_zero() {
        let result = threshold_count(&empty(), "Exam_Score", 70.0).unwrap();
        assert_eq!(result, ThresholdCount { count: 0, fraction: 0.0 });
    }

    #[test]
    fn ordinal_groups_follow_declared_rank() {
        let table = from_rows(
            vec!["Motivation_Level".into(), "Exam_Score".into()],
            vec![
                vec![text("High"), int(90)],
                vec![text("Low"), int(60)],
                vec![text("Medium"), int(70)],
                vec![text("Low"), int(64)],
            ],
        )
        .unwrap();
        let means = group_means(&table, "Motivation_Level", "Exam_Score").unwrap();
        let labels: Vec<&str> = means.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Low", "Medium", "High"]);
        assert_eq!(means[0].mean, Some(62.0));
        assert_eq!(means[0].count, 2);
    }

    #[test]
    fn categorical_groups_follow_first_seen_order() {
        let means = group_means(&factors(), "School_Type", "Hours_Studied").unwrap();
        assert_eq!(
            means,
            vec![
                GroupMean { label: "Public".into(), count: 3, mean: Some(25.0) },
                GroupMean { label: "Private".into(), count: 2, mean: Some(11.0) },
            ]
        );
    }

    #[test]
    fn missing_group_labels_are_left_out() {
        let means = group_means(&factors(), "Motivation_Level", "Exam_Score").unwrap();
        assert_eq!(means.iter().map(|g| g.count).sum::<usize>(), 4);
    }

    #[test]
    fn distributions_share_group_order() {
        let dist = group_distributions(&factors(), "Motivation_Level", "Exam_Score").unwrap();
        assert_eq!(dist.len(), 3);
        assert_eq!(dist[0].label, "Low");
        assert_eq!(dist[0].min, Some(60.0));
        assert_eq!(dist[0].median, Some(61.0));
        assert_eq!(dist[0].max, Some(62.0));
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let table = factors();
        let m = correlation_matrix(&table, &["Hours_Studied", "Exam_Score"]).unwrap();
        assert_eq!(m.columns, vec!["Hours_Studied", "Exam_Score"]);
        for i in 0..2 {
            assert_eq!(m.values[i][i], Some(1.0));
            for j in 0..2 {
                assert_eq!(m.values[i][j], m.values[j][i]);
                let r = m.values[i][j].unwrap();
                assert!((-1.0..=1.0).contains(&r));
            }
        }
        assert!(corr(&m, "Hours_Studied", "Exam_Score").unwrap() > 0.9);
    }

    #[test]
    fn correlation_uses_pairwise_complete_rows() {
        let table = from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                vec![int(1), int(2), int(5)],
                vec![int(2), int(4), CellValue::Missing],
                vec![int(3), int(6), int(1)],
                vec![CellValue::Missing, int(8), int(3)],
            ],
        )
        .unwrap();
        let m = correlation_matrix(&table, &["A", "B", "C"]).unwrap();
        // A/B only sees the three rows where A is present, all on one line.
        assert!((corr(&m, "A", "B").unwrap() - 1.0).abs() < 1e-12);
        assert!(corr(&m, "B", "C").is_some());
    }

    #[test]
    fn correlation_needs_two_usable_columns() {
        let table = factors();
        assert_eq!(
            correlation_matrix(&table, &["Exam_Score", "School_Type", "Nope", "Exam_Score"])
                .unwrap_err(),
            DataError::InsufficientColumns(1)
        );
    }

    #[test]
    fn comparison_uses_whole_table_mean() {
        let table = scores(&[60, 70, 80]);
        let cmp = compare_to_population(&table, 1, &["Exam_Score"]).unwrap();
        assert_eq!(
            cmp,
            vec![MetricComparison {
                metric: "Exam_Score".into(),
                individual: Some(70.0),
                population_mean: Some(70.0),
            }]
        );
    }

    #[test]
    fn comparison_reports_unknown_student() {
        assert_eq!(
            compare_to_population(&scores(&[60]), 9, &["Exam_Score"]).unwrap_err(),
            DataError::RowNotFound(9)
        );
    }

    #[test]
    fn histogram_covers_range_with_closed_last_bin() {
        let bins = histogram(&scores(&[50, 70, 80, 90, 95, 100]), "Exam_Score", 5).unwrap();
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].lower, 50.0);
        assert_eq!(bins[4].upper, 100.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 6);
        assert_eq!(bins[4].count, 3);
    }

    #[test]
    fn histogram_spans_the_full_finite_range() {
        let table = from_rows(
            vec!["Exam_Score".into()],
            vec![
                vec![CellValue::Float(-f64::MAX)],
                vec![CellValue::Float(0.0)],
                vec![CellValue::Float(f64::MAX)],
            ],
        )
        .unwrap();
        for n in [1, 2, 3] {
            let bins = histogram(&table, "Exam_Score", n).unwrap();
            assert_eq!(bins.len(), n);
            assert_eq!(bins[0].lower, -f64::MAX);
            assert_eq!(bins[n - 1].upper, f64::MAX);
            assert!(bins.iter().all(|b| b.lower.is_finite() && b.upper.is_finite()));
            assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
        }
    }

    #[test]
    fn large_values_keep_correlation_and_means_finite() {
        let table = from_rows(
            vec!["A".into(), "B".into()],
            vec![
                vec![CellValue::Float(1e200), CellValue::Float(1e200)],
                vec![CellValue::Float(2e200), CellValue::Float(3e200)],
                vec![CellValue::Float(3e200), CellValue::Float(2e200)],
            ],
        )
        .unwrap();
        let m = correlation_matrix(&table, &["A", "B"]).unwrap();
        let r = corr(&m, "A", "B").unwrap();
        assert!((-1.0..=1.0).contains(&r), "r = {r}");

        let huge = from_rows(
            vec!["Exam_Score".into()],
            vec![vec![CellValue::Float(1e308)], vec![CellValue::Float(1e308)]],
        )
        .unwrap();
        assert_eq!(summary_stats(&huge, "Exam_Score").unwrap().mean, Some(1e308));
    }

    #[test]
    fn histogram_of_constant_metric_is_one_bin() {
        let bins = histogram(&scores(&[70, 70]), "Exam_Score", 20).unwrap();
        assert_eq!(bins, vec![HistogramBin { lower: 69.5, upper: 70.5, count: 2 }]);
    }

    #[test]
    fn scatter_drops_incomplete_rows() {
        let points =
            scatter_points(&factors(), "Hours_Studied", "Exam_Score", Some("Motivation_Level"))
                .unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].hue.as_deref(), Some("High"));
        assert!(points.iter().all(|p| p.student_id != 4));
    }
}
