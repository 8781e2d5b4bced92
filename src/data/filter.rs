use serde::{Deserialize, Serialize};

use super::model::{Column, StudentTable};
use crate::error::DataResult;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Value choice for an exact-match filter; `All` is "no constraint".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    All,
    Value(String),
}

/// One row condition. A predicate list is a conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Inclusive numeric range; missing values never match.
    Range { column: String, min: f64, max: f64 },
    /// Cell's text rendering equals the selected label.
    Match { column: String, selection: Selection },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Range { column, .. } | Predicate::Match { column, .. } => column,
        }
    }
}

/// A predicate resolved against the table's columns.
enum Bound<'a> {
    Range { column: &'a Column, min: f64, max: f64 },
    Match { column: &'a Column, label: &'a str },
}

impl Bound<'_> {
    fn accepts(&self, row: usize) -> bool {
        match self {
            Bound::Range { column, min, max } => column.values()[row]
                .as_f64()
                .is_some_and(|v| *min <= v && v <= *max),
            Bound::Match { column, label } => {
                column.values()[row].label().as_deref() == Some(*label)
            }
        }
    }
}

/// Check every predicate's column against the table.
fn resolve<'a>(table: &'a StudentTable, predicates: &'a [Predicate]) -> DataResult<Vec<Bound<'a>>> {
    let mut bounds = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        match predicate {
            Predicate::Range { column, min, max } => bounds.push(Bound::Range {
                column: table.require_numeric(column)?,
                min: *min,
                max: *max,
            }),
            Predicate::Match { column, selection } => {
                let column = table.require(column)?;
                if let Selection::Value(label) = selection {
                    bounds.push(Bound::Match { column, label });
                }
            }
        }
    }
    Ok(bounds)
}

/// Check that every predicate refers to a usable column.
pub fn validate(table: &StudentTable, predicates: &[Predicate]) -> DataResult<()> {
    resolve(table, predicates).map(|_| ())
}

/// Return row positions that pass all predicates, in table order.
pub fn filtered_indices(table: &StudentTable, predicates: &[Predicate]) -> DataResult<Vec<usize>> {
    let bounds = resolve(table, predicates)?;
    Ok((0..table.len())
        .filter(|&row| bounds.iter().all(|b| b.accepts(row)))
        .collect())
}

/// New table holding only rows that pass all predicates.
///
/// No predicates → an identical table; no matches → an empty table.
pub fn filter_rows(table: &StudentTable, predicates: &[Predicate]) -> DataResult<StudentTable> {
    if predicates.is_empty() {
        return Ok(table.clone());
    }
    let rows = filtered_indices(table, predicates)?;
    Ok(table.take(&rows))
}
