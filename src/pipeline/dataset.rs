//! Core data model: schemas, records and datasets
//!
//! A [`Dataset`] is an ordered list of [`Record`]s sharing one immutable
//! [`Schema`]. Stages never mutate a schema in place: adding or removing a
//! column builds a new `Schema` and a new `Dataset`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Numeric,
    Nominal,
}

/// A single column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    /// Finite label set, only populated for nominal attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
            domain: Vec::new(),
        }
    }

    pub fn nominal(name: impl Into<String>, domain: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal,
            domain,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == AttributeKind::Numeric
    }

    pub fn is_nominal(&self) -> bool {
        self.kind == AttributeKind::Nominal
    }

    /// Number of labels in the domain (0 for numeric attributes)
    pub fn num_values(&self) -> usize {
        self.domain.len()
    }

    pub fn label(&self, code: usize) -> Option<&str> {
        self.domain.get(code).map(String::as_str)
    }

    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.domain.iter().position(|l| l == label)
    }
}

/// Ordered attribute definitions plus the designated target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaFile")]
pub struct Schema {
    relation: String,
    attributes: Vec<Attribute>,
    target: Option<usize>,
}

/// Unvalidated schema as read from a sidecar file
#[derive(Deserialize)]
struct SchemaFile {
    relation: String,
    attributes: Vec<Attribute>,
    target: Option<usize>,
}

impl TryFrom<SchemaFile> for Schema {
    type Error = PipelineError;

    fn try_from(file: SchemaFile) -> Result<Self> {
        Schema::new(file.relation, file.attributes, file.target)
    }
}

impl Schema {
    /// Create a schema, validating that the target index (if any) is in range.
    pub fn new(
        relation: impl Into<String>,
        attributes: Vec<Attribute>,
        target: Option<usize>,
    ) -> Result<Self> {
        if let Some(t) = target {
            if t >= attributes.len() {
                return Err(PipelineError::InvalidSchema(format!(
                    "target index {} out of range for {} attributes",
                    t,
                    attributes.len()
                )));
            }
        }
        Ok(Self {
            relation: relation.into(),
            attributes,
            target,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Exact-name lookup
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    /// The target attribute, if one is designated
    pub fn target_attribute(&self) -> Option<&Attribute> {
        self.target.and_then(|t| self.attributes.get(t))
    }

    /// Copy of this schema with a different target designation
    pub fn with_target(&self, target: Option<usize>) -> Result<Schema> {
        Schema::new(self.relation.clone(), self.attributes.clone(), target)
    }

    /// Copy of this schema with `attribute` appended as the last column
    pub fn with_attribute(&self, attribute: Attribute) -> Schema {
        let mut attributes = self.attributes.clone();
        attributes.push(attribute);
        Schema {
            relation: self.relation.clone(),
            attributes,
            target: self.target,
        }
    }

    /// Copy of this schema with the attribute at `index` replaced
    pub fn with_replaced(&self, index: usize, attribute: Attribute) -> Schema {
        let mut attributes = self.attributes.clone();
        attributes[index] = attribute;
        Schema {
            relation: self.relation.clone(),
            attributes,
            target: self.target,
        }
    }

    /// Schema restricted to `keep` (in the given order); the target follows its column.
    pub fn project(&self, keep: &[usize]) -> Schema {
        let attributes = keep.iter().map(|&i| self.attributes[i].clone()).collect();
        let target = self
            .target
            .and_then(|t| keep.iter().position(|&i| i == t));
        Schema {
            relation: self.relation.clone(),
            attributes,
            target,
        }
    }

    /// Validate that the target is set and nominal, returning its index.
    pub fn nominal_target(&self) -> Result<usize> {
        let target = self
            .target
            .ok_or_else(|| PipelineError::InvalidSchema("target attribute is not set".into()))?;
        let attribute = self.attributes.get(target).ok_or_else(|| {
            PipelineError::InvalidSchema(format!(
                "target index {} out of range for {} attributes",
                target,
                self.attributes.len()
            ))
        })?;
        if !attribute.is_nominal() {
            return Err(PipelineError::InvalidSchema(format!(
                "target attribute '{}' is not nominal",
                attribute.name
            )));
        }
        Ok(target)
    }
}

/// A single cell value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Missing,
    Numeric(f64),
    /// Index into the attribute's domain
    Nominal(usize),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view; nominal codes are returned as their index.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Missing => None,
            Value::Numeric(v) => Some(v),
            Value::Nominal(code) => Some(code as f64),
        }
    }

    pub fn as_code(&self) -> Option<usize> {
        match *self {
            Value::Nominal(code) => Some(code),
            _ => None,
        }
    }
}

/// One row of a dataset, indexed by attribute position
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Value {
        self.values[index]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Record restricted to `keep`, in the given order
    pub fn project(&self, keep: &[usize]) -> Record {
        Record::new(keep.iter().map(|&i| self.values[i]).collect())
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::new(values)
    }
}

/// Summary statistics for one attribute, computed on demand
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: Option<f64>,
    pub missing_count: usize,
    /// Occurrences per domain label (nominal attributes only)
    pub nominal_counts: Vec<usize>,
}

/// Records sharing one schema
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset, checking every record against the schema.
    pub fn new(schema: Schema, records: Vec<Record>) -> Result<Self> {
        Self::with_schema(Arc::new(schema), records)
    }

    /// Build a dataset over a shared schema, checking every record against it.
    pub fn with_schema(schema: Arc<Schema>, records: Vec<Record>) -> Result<Self> {
        for (row, record) in records.iter().enumerate() {
            if record.len() != schema.len() {
                return Err(PipelineError::InvalidSchema(format!(
                    "record {} has {} values, schema has {} attributes",
                    row,
                    record.len(),
                    schema.len()
                )));
            }
            for (value, attribute) in record.values().iter().zip(schema.attributes()) {
                let fits = match (value, attribute.kind) {
                    (Value::Missing, _) => true,
                    (Value::Numeric(v), AttributeKind::Numeric) => v.is_finite(),
                    (Value::Nominal(code), AttributeKind::Nominal) => {
                        *code < attribute.num_values()
                    }
                    _ => false,
                };
                if !fits {
                    return Err(PipelineError::InvalidSchema(format!(
                        "record {} holds {:?} for attribute '{}'",
                        row, value, attribute.name
                    )));
                }
            }
        }
        Ok(Self { schema, records })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_attributes(&self) -> usize {
        self.schema.len()
    }

    pub fn relation(&self) -> &str {
        self.schema.relation()
    }

    /// Same schema, different rows. Rows are derived from this dataset's own
    /// records, so they already satisfy the schema.
    pub(crate) fn derive(&self, records: Vec<Record>) -> Dataset {
        Dataset {
            schema: Arc::clone(&self.schema),
            records,
        }
    }

    /// Rows at `indices`, in the given order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        self.derive(indices.iter().map(|&i| self.records[i].clone()).collect())
    }

    /// Rows for which `keep` returns true, order preserved
    pub fn filter<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Record) -> bool,
    {
        self.derive(self.records.iter().filter(|r| keep(r)).cloned().collect())
    }

    /// Validate the dataset for tuning/evaluation: non-empty with a nominal target.
    pub fn require_target(&self) -> Result<usize> {
        let target = self.schema.nominal_target()?;
        if self.records.is_empty() {
            return Err(PipelineError::InvalidSchema("dataset is empty".into()));
        }
        Ok(target)
    }

    /// Class code of a record, if the target is set and present
    pub fn class_of(&self, record: &Record) -> Option<usize> {
        self.schema
            .target()
            .and_then(|t| record.value(t).as_code())
    }

    /// Number of classes in the target domain
    pub fn num_classes(&self) -> usize {
        self.schema
            .target_attribute()
            .map(Attribute::num_values)
            .unwrap_or(0)
    }

    /// Per-class record counts (missing class values are not counted)
    pub fn class_counts(&self) -> Result<Vec<usize>> {
        let target = self.schema.nominal_target()?;
        Ok(self.attribute_stats(target).nominal_counts)
    }

    /// All values of one column, in row order
    pub fn column(&self, index: usize) -> Vec<Value> {
        self.records.iter().map(|r| r.value(index)).collect()
    }

    /// Non-missing values of a numeric column, in row order
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| match r.value(index) {
                Value::Numeric(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Total number of missing cells
    pub fn missing_count(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.values().iter().filter(|v| v.is_missing()).count())
            .sum()
    }

    /// Compute summary statistics for the attribute at `index`.
    pub fn attribute_stats(&self, index: usize) -> AttributeStats {
        let attribute = &self.schema.attributes()[index];
        let mut stats = AttributeStats {
            nominal_counts: vec![0; attribute.num_values()],
            ..Default::default()
        };

        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut n = 0usize;
        for record in &self.records {
            match record.value(index) {
                Value::Missing => stats.missing_count += 1,
                Value::Numeric(v) => {
                    stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
                    stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
                    sum += v;
                    sum_sq += v * v;
                    n += 1;
                }
                Value::Nominal(code) => {
                    if let Some(count) = stats.nominal_counts.get_mut(code) {
                        *count += 1;
                    }
                }
            }
        }

        if n > 0 {
            let mean = sum / n as f64;
            stats.mean = Some(mean);
            stats.std_dev = Some(if n > 1 {
                ((sum_sq - n as f64 * mean * mean) / (n - 1) as f64).max(0.0).sqrt()
            } else {
                0.0
            });
        }
        stats
    }
}
