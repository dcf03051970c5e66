//! Dataset loader and snapshot writer for CSV and Parquet files
//!
//! Files are read through polars and converted into a [`Dataset`]. Numeric
//! columns become numeric attributes (NaN and infinities read as missing),
//! everything else becomes nominal with its labels in order of first appearance. Snapshots are written next to a
//! `<file>.schema.json` sidecar so they load back with the exact same schema.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::pipeline::dataset::{Attribute, Dataset, Record, Schema, Value};

/// Target column names tried in order before falling back to the last column
pub const TARGET_CANDIDATES: &[&str] = &[
    "num",
    "target",
    "heart_disease",
    "diagnosis",
    "disease",
    "condition",
    "class",
];

/// Marker read as a missing value in CSV input (empty cells are missing too)
pub const MISSING_MARKER: &str = "?";

/// Loader knobs
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Rows used for CSV schema inference (0 = scan the whole file)
    pub infer_schema_length: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: 10000,
        }
    }
}

/// Snapshot file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Csv,
    Parquet,
}

impl SnapshotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SnapshotFormat::Csv => "csv",
            SnapshotFormat::Parquet => "parquet",
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Path of the schema sidecar written next to a snapshot
pub fn schema_sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".schema.json");
    PathBuf::from(name)
}

/// Read a CSV or Parquet file into a DataFrame
pub fn load_dataframe(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let schema_length = if options.infer_schema_length == 0 {
        None
    } else {
        Some(options.infer_schema_length)
    };

    let lf = match extension_of(path).as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .with_null_values(Some(NullValues::AllColumnsSingle(MISSING_MARKER.into())))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        other => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            other
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Load a dataset, designating and discretizing the target.
///
/// If a schema sidecar exists it is authoritative; otherwise the schema is
/// inferred from the column types.
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let df = load_dataframe(path, options)?;
    let relation = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string();

    let sidecar = schema_sidecar_path(path);
    if sidecar.exists() {
        let file = File::open(&sidecar)
            .with_context(|| format!("Failed to open schema file: {}", sidecar.display()))?;
        let schema: Schema = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse schema file: {}", sidecar.display()))?;
        return dataframe_with_schema(&df, schema);
    }

    let dataset = dataframe_to_dataset(&df, &relation)?;
    let names: Vec<&str> = dataset
        .schema()
        .attributes()
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    let target = detect_target(&names)
        .ok_or_else(|| anyhow::anyhow!("Dataset has no columns: {}", path.display()))?;
    Ok(with_nominal_target(&dataset, target)?)
}

/// Index of the first target synonym present, else the last column.
pub fn detect_target(names: &[&str]) -> Option<usize> {
    TARGET_CANDIDATES
        .iter()
        .find_map(|candidate| names.iter().position(|n| n == candidate))
        .or_else(|| names.len().checked_sub(1))
}

/// Designate `target`, turning a numeric target into a nominal one with one
/// label per distinct observed value (ascending).
pub fn with_nominal_target(dataset: &Dataset, target: usize) -> crate::error::Result<Dataset> {
    let schema = dataset.schema().with_target(Some(target))?;
    let attribute = &schema.attributes()[target];
    if attribute.is_nominal() {
        return Dataset::new(schema, dataset.records().to_vec());
    }

    let mut distinct = dataset.numeric_values(target);
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();

    let domain = distinct.iter().map(|v| format_label(*v)).collect();
    let nominal = Attribute::nominal(attribute.name.clone(), domain);
    let schema = schema.with_replaced(target, nominal);

    let records = dataset
        .records()
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if let Value::Numeric(v) = record.value(target) {
                let code = distinct
                    .binary_search_by(|d| d.total_cmp(&v))
                    .map(Value::Nominal)
                    .unwrap_or(Value::Missing);
                record.set(target, code);
            }
            record
        })
        .collect();
    Dataset::new(schema, records)
}

/// Integral values print without a fractional part ("1" rather than "1.0")
fn format_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Infer a schema from column dtypes and convert every row. No target is set.
pub fn dataframe_to_dataset(df: &DataFrame, relation: &str) -> Result<Dataset> {
    let n_rows = df.height();
    let mut attributes = Vec::with_capacity(df.width());
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let name = col.name().to_string();
        if col.dtype().is_primitive_numeric() {
            attributes.push(Attribute::numeric(name));
            columns.push(numeric_cells(col)?);
        } else {
            let labels = string_cells(col)?;
            let mut domain: Vec<String> = Vec::new();
            let cells = labels
                .into_iter()
                .map(|label| match label {
                    Some(label) => {
                        let code = match domain.iter().position(|d| *d == label) {
                            Some(code) => code,
                            None => {
                                domain.push(label);
                                domain.len() - 1
                            }
                        };
                        Value::Nominal(code)
                    }
                    None => Value::Missing,
                })
                .collect();
            attributes.push(Attribute::nominal(name, domain));
            columns.push(cells);
        }
    }

    let schema = Schema::new(relation, attributes, None)?;
    Ok(Dataset::new(schema, transpose(columns, n_rows))?)
}

/// Convert a DataFrame using a known schema (column order and labels must match).
pub fn dataframe_with_schema(df: &DataFrame, schema: Schema) -> Result<Dataset> {
    let n_rows = df.height();
    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(schema.len());

    for attribute in schema.attributes() {
        let col = df
            .column(&attribute.name)
            .with_context(|| format!("Column '{}' missing from snapshot", attribute.name))?;
        if attribute.is_numeric() {
            columns.push(numeric_cells(col)?);
        } else {
            let cells = string_cells(col)?
                .into_iter()
                .map(|label| match label {
                    Some(label) => attribute.code_of(&label).map(Value::Nominal).ok_or_else(|| {
                        anyhow::anyhow!(
                            "Label '{}' is not in the domain of '{}'",
                            label,
                            attribute.name
                        )
                    }),
                    None => Ok(Value::Missing),
                })
                .collect::<Result<Vec<Value>>>()?;
            columns.push(cells);
        }
    }

    Ok(Dataset::new(schema, transpose(columns, n_rows))?)
}

fn numeric_cells(col: &Column) -> Result<Vec<Value>> {
    let float_col = col.cast(&DataType::Float64)?;
    Ok(float_col
        .f64()?
        .iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => Value::Numeric(x),
            _ => Value::Missing,
        })
        .collect())
}

fn string_cells(col: &Column) -> Result<Vec<Option<String>>> {
    let string_col = col.cast(&DataType::String)?;
    Ok(string_col
        .str()?
        .into_iter()
        .map(|s| s.map(str::trim).filter(|s| !s.is_empty()).map(String::from))
        .collect())
}

fn transpose(columns: Vec<Vec<Value>>, n_rows: usize) -> Vec<Record> {
    (0..n_rows)
        .map(|row| Record::new(columns.iter().map(|c| c[row]).collect()))
        .collect()
}

/// Convert a dataset into a DataFrame, nominal cells written as their labels.
pub fn dataset_to_dataframe(dataset: &Dataset) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(dataset.num_attributes());
    for (index, attribute) in dataset.schema().attributes().iter().enumerate() {
        let cells = dataset.column(index);
        let column = if attribute.is_numeric() {
            let values: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
            Column::new(attribute.name.as_str().into(), values)
        } else {
            let values: Vec<Option<&str>> = cells
                .iter()
                .map(|v| v.as_code().and_then(|c| attribute.label(c)))
                .collect();
            Column::new(attribute.name.as_str().into(), values)
        };
        columns.push(column);
    }
    DataFrame::new(columns).context("Failed to build DataFrame from dataset")
}

/// Save a dataset snapshot (CSV or Parquet by extension) plus its schema sidecar.
pub fn save_snapshot(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut df = dataset_to_dataframe(dataset)?;
    match extension_of(path).as_str() {
        "csv" => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(&mut df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(&mut df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        other => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            other
        ),
    }

    let sidecar = schema_sidecar_path(path);
    let file = File::create(&sidecar)
        .with_context(|| format!("Failed to create schema file: {}", sidecar.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), dataset.schema())
        .with_context(|| format!("Failed to write schema file: {}", sidecar.display()))?;

    Ok(())
}
