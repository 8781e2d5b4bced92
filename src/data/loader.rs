use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, ColumnKind, StudentTable};
use super::ordinal::declared_order;
use crate::error::{DataError, DataResult};

/// Name of the identifier column, read from the source or assigned.
pub const ID_COLUMN: &str = "Student_ID";

/// Cell texts read as missing, besides the empty string.
const MISSING_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL"];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    Parquet,
}

impl DataFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> DataResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "parquet" | "pq" => Ok(DataFormat::Parquet),
            other => Err(DataError::DataUnavailable(format!(
                "unsupported file extension: .{other}"
            ))),
        }
    }
}

/// Where the tabular data comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A file on disk; format chosen by extension.
    Path(PathBuf),
    /// An in-memory byte stream (e.g. an upload).
    Bytes { format: DataFormat, bytes: Vec<u8> },
    /// Rows already split into cells.
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
}

/// Header plus row-major cells, before any classification.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and normalize a table from any source.
pub fn load(source: &DataSource) -> DataResult<StudentTable> {
    match source {
        DataSource::Path(path) => load_file(path),
        DataSource::Bytes { format, bytes } => {
            let raw = match format {
                DataFormat::Csv => parse_csv(bytes.as_slice())?,
                DataFormat::Json => parse_json(bytes.as_slice())?,
                DataFormat::Parquet => parse_parquet(bytes::Bytes::from(bytes.clone()))?,
            };
            assemble(raw)
        }
        DataSource::Rows { headers, rows } => from_rows(headers.clone(), rows.clone()),
    }
}

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma separated
/// * `.json`    – `[{ "Hours_Studied": 23, "Motivation_Level": "Low", ... }, ...]`
/// * `.parquet` – flat scalar columns (strings, ints, floats, bools)
pub fn load_file(path: &Path) -> DataResult<StudentTable> {
    let format = DataFormat::from_path(path)?;
    let file = std::fs::File::open(path).map_err(|e| {
        DataError::DataUnavailable(format!("cannot open {}: {e}", path.display()))
    })?;

    let raw = match format {
        DataFormat::Csv => parse_csv(file)?,
        DataFormat::Json => parse_json(file)?,
        DataFormat::Parquet => parse_parquet(file)?,
    };
    let table = assemble(raw)?;
    info!(
        "Loaded {} students, {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Build a table from in-memory rows.
pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> DataResult<StudentTable> {
    assemble(RawTable { headers, rows })
}

// ---------------------------------------------------------------------------
// Normalization: shape check, identifiers, column kinds
// ---------------------------------------------------------------------------

fn assemble(raw: RawTable) -> DataResult<StudentTable> {
    let RawTable { headers, rows } = raw;

    let mut seen = HashSet::new();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(DataError::MalformedData(format!("duplicate column '{dup}'")));
    }

    // Transpose into columns, rejecting ragged rows.
    let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(rows.len()); headers.len()];
    for (row_no, row) in rows.into_iter().enumerate() {
        if row.len() != headers.len() {
            return Err(DataError::MalformedData(format!(
                "row {row_no} has {} fields, header has {}",
                row.len(),
                headers.len()
            )));
        }
        for (col, cell) in columns.iter_mut().zip(row) {
            col.push(cell);
        }
    }
    let n_rows = columns.first().map_or(0, Vec::len);

    let id_idx = headers.iter().position(|h| h == ID_COLUMN);
    let ids = match id_idx {
        Some(idx) => validate_ids(&columns[idx])?,
        None => {
            debug!("No {ID_COLUMN} column, assigning row positions");
            (0..n_rows as i64).collect()
        }
    };

    let table_columns = headers
        .into_iter()
        .zip(columns)
        .enumerate()
        .filter(|(i, _)| Some(*i) != id_idx)
        .map(|(_, (name, values))| classify_column(name, values))
        .collect();

    Ok(StudentTable::new(ids, table_columns))
}

fn validate_ids(cells: &[CellValue]) -> DataResult<Vec<i64>> {
    let mut seen = HashSet::with_capacity(cells.len());
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let id = match cell {
                CellValue::Integer(i) => *i,
                CellValue::Float(f)
                    if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) =>
                {
                    *f as i64
                }
                other => {
                    return Err(DataError::MalformedData(format!(
                        "row {row}: {ID_COLUMN} '{other}' is not a 64-bit integer"
                    )))
                }
            };
            if !seen.insert(id) {
                return Err(DataError::DuplicateIdentifier(id));
            }
            Ok(id)
        })
        .collect()
}

fn classify_column(name: String, values: Vec<CellValue>) -> Column {
    if let Some(order) = declared_order(&name) {
        let labels: Vec<CellValue> = values
            .into_iter()
            .map(|v| match v {
                CellValue::Missing | CellValue::Text(_) => v,
                other => CellValue::Text(other.to_string()),
            })
            .collect();
        let column = Column::new(name, ColumnKind::Ordinal(order), labels);
        let stray = column.out_of_band_labels();
        if !stray.is_empty() {
            warn!(
                "Column '{}' has labels outside its declared order {order:?}: {stray:?}",
                column.name()
            );
        }
        return column;
    }

    let numeric = values
        .iter()
        .all(|v| v.is_missing() || v.as_f64().is_some());
    let kind = if numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    };
    Column::new(name, kind, values)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn parse_csv<R: Read>(reader: R) -> DataResult<RawTable> {
    // Flexible so ragged rows reach the shape check with a row number.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable { headers, rows })
}

fn csv_error(err: csv::Error) -> DataError {
    if err.is_io_error() {
        DataError::DataUnavailable(err.to_string())
    } else {
        DataError::MalformedData(err.to_string())
    }
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() || MISSING_TOKENS.contains(&s) {
        return CellValue::Missing;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return float_cell(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

fn float_cell(f: f64) -> CellValue {
    if f.is_finite() {
        CellValue::Float(f)
    } else {
        CellValue::Missing
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Hours_Studied": 23, "Motivation_Level": "Low", "Exam_Score": 67 },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys in first-seen order; absent keys are missing.
fn parse_json<R: Read>(reader: R) -> DataResult<RawTable> {
    let root: JsonValue = serde_json::from_reader(reader)
        .map_err(|e| DataError::MalformedData(format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| DataError::MalformedData("expected top-level JSON array".into()))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataError::MalformedData(format!("row {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            headers
                .iter()
                .map(|h| match rec.get(h) {
                    None => Ok(CellValue::Missing),
                    Some(val) => json_to_cell(val).ok_or_else(|| {
                        DataError::MalformedData(format!("row {i}, '{h}': nested value"))
                    }),
                })
                .collect::<DataResult<Vec<_>>>()
        })
        .collect::<DataResult<Vec<_>>>()?;

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> Option<CellValue> {
    let cell = match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else {
                n.as_f64().map_or(CellValue::Missing, float_cell)
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Missing,
        JsonValue::Array(_) | JsonValue::Object(_) => return None,
    };
    Some(cell)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Read a Parquet file of flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn parse_parquet<T: ChunkReader + 'static>(input: T) -> DataResult<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(input)
        .map_err(|e| DataError::MalformedData(format!("reading parquet metadata: {e}")))?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| DataError::MalformedData(format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| DataError::MalformedData(format!("reading parquet record batch: {e}")))?;
        let columns = batch.columns();

        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .zip(&headers)
                .map(|(col, name)| extract_cell(col, row, name))
                .collect::<DataResult<Vec<_>>>()?;
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize, name: &str) -> DataResult<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Missing);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        other => {
            return Err(DataError::MalformedData(format!(
                "column '{name}' has unsupported type {other:?}"
            )))
        }
    };
    Ok(cell)
}
