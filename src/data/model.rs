use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::ordinal::rank_of;
use crate::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring common dataframe dtypes.
/// Used in `BTreeSet`s while discovering levels, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Missing,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Missing => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell; `None` for text, bools and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text rendering used for label matching; `None` when missing.
    pub fn label(&self) -> Option<String> {
        (!self.is_missing()).then(|| self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Column – one named, classified column
// ---------------------------------------------------------------------------

/// Semantic kind of a column, attached at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "order", rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    /// Ranked labels; the slice is the declared order, lowest first.
    Ordinal(&'static [&'static str]),
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<CellValue>,
    /// Distinct non-missing values in display order.
    levels: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<CellValue>) -> Self {
        let levels = ordered_levels(kind, &values);
        Column {
            name: name.into(),
            kind,
            values,
            levels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Distinct non-missing values: declared rank order for ordinal columns
    /// (out-of-band labels after), first-seen order for everything else.
    pub fn levels(&self) -> &[CellValue] {
        &self.levels
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Numeric cells, `None` where missing or non-numeric.
    pub fn numbers(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values.iter().map(CellValue::as_f64)
    }

    /// Non-missing numeric values only.
    pub fn present_numbers(&self) -> Vec<f64> {
        self.numbers().flatten().collect()
    }

    /// Labels of an ordinal column that are not part of its declared order.
    pub fn out_of_band_labels(&self) -> Vec<String> {
        match self.kind {
            ColumnKind::Ordinal(order) => self
                .levels
                .iter()
                .filter_map(CellValue::label)
                .filter(|l| rank_of(order, l).is_none())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        let values = indices.iter().map(|&i| self.values[i].clone()).collect();
        Column::new(self.name.clone(), self.kind, values)
    }
}

/// Declared labels in rank order followed by out-of-band labels first-seen,
/// or plain first-seen order for non-ordinal columns.
fn ordered_levels(kind: ColumnKind, values: &[CellValue]) -> Vec<CellValue> {
    let mut seen = BTreeSet::new();
    let first_seen: Vec<CellValue> = values
        .iter()
        .filter(|v| !v.is_missing())
        .filter(|v| seen.insert((*v).clone()))
        .cloned()
        .collect();

    match kind {
        ColumnKind::Ordinal(order) => {
            let mut ranked: Vec<(usize, usize, CellValue)> = first_seen
                .into_iter()
                .enumerate()
                .map(|(pos, v)| {
                    let rank = v
                        .label()
                        .and_then(|l| rank_of(order, &l))
                        .unwrap_or(order.len());
                    (rank, pos, v)
                })
                .collect();
            ranked.sort_by_key(|(rank, pos, _)| (*rank, *pos));
            ranked.into_iter().map(|(_, _, v)| v).collect()
        }
        _ => first_seen,
    }
}

// ---------------------------------------------------------------------------
// StudentTable – the canonical in-memory table
// ---------------------------------------------------------------------------

/// Column-oriented table with one stable `Student_ID` per row.
///
/// Never mutated after construction; filters build a new table that keeps
/// the original identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentTable {
    ids: Vec<i64>,
    columns: Vec<Column>,
    id_index: HashMap<i64, usize>,
}

/// A window over the table for list displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub student_id: i64,
    pub values: Vec<CellValue>,
}

impl StudentTable {
    /// Assemble a table from already validated parts.
    ///
    /// `ids` must be unique and every column must have `ids.len()` values.
    pub(crate) fn new(ids: Vec<i64>, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == ids.len()));
        let id_index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        StudentTable {
            ids,
            columns,
            id_index,
        }
    }

    /// Number of students (rows).
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with `ColumnNotFound`.
    pub fn require(&self, name: &str) -> DataResult<&Column> {
        self.column(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Look up a numeric column, failing with `ColumnNotFound` or `NotNumeric`.
    pub fn require_numeric(&self, name: &str) -> DataResult<&Column> {
        let col = self.require(name)?;
        if !col.is_numeric() {
            return Err(DataError::NotNumeric(name.to_string()));
        }
        Ok(col)
    }

    /// Row position of a student, `None` when the id is unknown.
    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    pub fn value(&self, column: &str, id: i64) -> DataResult<&CellValue> {
        let row = self.position_of(id).ok_or(DataError::RowNotFound(id))?;
        Ok(&self.require(column)?.values[row])
    }

    /// New table holding the given rows, in the given order.
    pub fn take(&self, indices: &[usize]) -> StudentTable {
        let ids = indices.iter().map(|&i| self.ids[i]).collect();
        let columns = self.columns.iter().map(|c| c.take(indices)).collect();
        StudentTable::new(ids, columns)
    }

    /// `Student_ID` plus the requested columns that exist, first `limit` rows.
    pub fn project(&self, columns: &[&str], limit: usize) -> TablePreview {
        let picked: Vec<&Column> = columns.iter().filter_map(|n| self.column(n)).collect();
        let rows = self
            .ids
            .iter()
            .enumerate()
            .take(limit)
            .map(|(row, &student_id)| PreviewRow {
                student_id,
                values: picked.iter().map(|c| c.values[row].clone()).collect(),
            })
            .collect();
        TablePreview {
            columns: picked.iter().map(|c| c.name.clone()).collect(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ordinal::declared_order;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn ordinal_levels_follow_declared_rank() {
        let order = declared_order("Motivation_Level").unwrap();
        let col = Column::new(
            "Motivation_Level",
            ColumnKind::Ordinal(order),
            vec![text("High"), text("Low"), CellValue::Missing, text("Medium"), text("Low")],
        );
        assert_eq!(col.levels(), &[text("Low"), text("Medium"), text("High")]);
        assert!(col.out_of_band_labels().is_empty());
    }

    #[test]
    fn out_of_band_labels_sort_last_in_first_seen_order() {
        let order = declared_order("Family_Income").unwrap();
        let col = Column::new(
            "Family_Income",
            ColumnKind::Ordinal(order),
            vec![text("Very High"), text("High"), text("Unknown"), text("Low")],
        );
        assert_eq!(
            col.levels(),
            &[text("Low"), text("High"), text("Very High"), text("Unknown")]
        );
        assert_eq!(col.out_of_band_labels(), vec!["Very High", "Unknown"]);
    }

    #[test]
    fn categorical_levels_keep_first_seen_order() {
        let col = Column::new(
            "School_Type",
            ColumnKind::Categorical,
            vec![text("Public"), text("Private"), text("Public")],
        );
        assert_eq!(col.levels(), &[text("Public"), text("Private")]);
    }

    #[test]
    fn take_keeps_original_ids() {
        let table = StudentTable::new(
            vec![10, 11, 12],
            vec![Column::new(
                "Exam_Score",
                ColumnKind::Numeric,
                vec![CellValue::Integer(60), CellValue::Integer(70), CellValue::Integer(80)],
            )],
        );
        let sub = table.take(&[2, 0]);
        assert_eq!(sub.ids(), &[12, 10]);
        assert_eq!(sub.position_of(10), Some(1));
        assert_eq!(sub.position_of(11), None);
        assert_eq!(sub.value("Exam_Score", 12), Ok(&CellValue::Integer(80)));
    }

    #[test]
    fn project_skips_absent_columns() {
        let table = StudentTable::new(
            vec![0, 1],
            vec![Column::new(
                "Attendance",
                ColumnKind::Numeric,
                vec![CellValue::Float(90.5), CellValue::Missing],
            )],
        );
        let preview = table.project(&["Attendance", "Gender"], 1);
        assert_eq!(preview.columns, vec!["Attendance"]);
        assert_eq!(preview.rows.len(), 1);
        assert_eq!(preview.rows[0].values, vec![CellValue::Float(90.5)]);
    }

    #[test]
    fn require_numeric_reports_kind_mismatch() {
        let table = StudentTable::new(
            vec![0],
            vec![Column::new("Gender", ColumnKind::Categorical, vec![text("Male")])],
        );
        assert_eq!(
            table.require_numeric("Gender"),
            Err(DataError::NotNumeric("Gender".into()))
        );
        assert_eq!(
            table.require_numeric("Exam_Score").unwrap_err(),
            DataError::ColumnNotFound("Exam_Score".into())
        );
    }
}
