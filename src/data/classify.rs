use super::model::{ColumnKind, StudentTable};

/// Default cap on distinct labels for a column to be offered as a grouping.
pub const DEFAULT_MAX_GROUPS: usize = 10;

/// What a column is about to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Scatter,
    Correlation,
    /// Box-plot category or scatter hue; needs fewer than `max_groups` labels.
    Grouping { max_groups: usize },
}

impl Purpose {
    pub fn grouping() -> Self {
        Purpose::Grouping {
            max_groups: DEFAULT_MAX_GROUPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Column queries (all in table column order)
// ---------------------------------------------------------------------------

pub fn numeric_columns(table: &StudentTable) -> Vec<&str> {
    table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric)
        .map(|c| c.name())
        .collect()
}

/// Ordinal columns with their declared label order.
pub fn ordinal_columns(table: &StudentTable) -> Vec<(&str, &'static [&'static str])> {
    table
        .columns()
        .iter()
        .filter_map(|c| match c.kind() {
            ColumnKind::Ordinal(order) => Some((c.name(), order)),
            _ => None,
        })
        .collect()
}

pub fn categorical_columns(table: &StudentTable) -> Vec<&str> {
    table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Categorical)
        .map(|c| c.name())
        .collect()
}

/// Whether `column` exists and can be used for `purpose`.
pub fn is_valid_for(table: &StudentTable, column: &str, purpose: Purpose) -> bool {
    let Some(col) = table.column(column) else {
        return false;
    };
    match purpose {
        Purpose::Scatter | Purpose::Correlation => {
            col.is_numeric() && col.values().iter().any(|v| !v.is_missing())
        }
        Purpose::Grouping { max_groups } => {
            !col.is_numeric() && col.levels().len() < max_groups
        }
    }
}

/// Columns that can colour a scatter plot whose x-axis is `exclude`.
pub fn hue_candidates<'a>(table: &'a StudentTable, exclude: &str, max_groups: usize) -> Vec<&'a str> {
    table
        .column_names()
        .filter(|&name| name != exclude)
        .filter(|name| is_valid_for(table, name, Purpose::Grouping { max_groups }))
        .collect()
}
