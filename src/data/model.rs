use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

impl Value {
    /// Guess the type of a raw text cell: empty → Null, then integer, float,
    /// boolean, and finally plain text.
    pub fn guess(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Parse a raw text cell as the given structural type. Empty cells are Null.
    pub fn parse_as(s: &str, ty: StructuralType) -> Option<Value> {
        if s.is_empty() {
            return Some(Value::Null);
        }
        match ty {
            StructuralType::String => Some(Value::String(s.to_string())),
            StructuralType::Integer => s.trim().parse().ok().map(Value::Integer),
            StructuralType::Float => s.trim().parse().ok().map(Value::Float),
            StructuralType::Bool => match s.trim() {
                "true" | "True" | "1" => Some(Value::Bool(true)),
                "false" | "False" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Annotation – out-of-band per-column metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralType {
    String,
    Integer,
    Float,
    Bool,
}

impl StructuralType {
    /// Narrowest type that holds every non-null value, `String` when mixed.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> StructuralType {
        let mut ty: Option<StructuralType> = None;
        for v in values {
            let this = match v {
                Value::Null => continue,
                Value::Integer(_) => StructuralType::Integer,
                Value::Float(_) => StructuralType::Float,
                Value::Bool(_) => StructuralType::Bool,
                Value::String(_) => return StructuralType::String,
            };
            ty = Some(match (ty, this) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(StructuralType::Integer), StructuralType::Float)
                | (Some(StructuralType::Float), StructuralType::Integer) => StructuralType::Float,
                _ => return StructuralType::String,
            });
        }
        ty.unwrap_or(StructuralType::String)
    }
}

/// Semantic tag attached to a column. Accepts either the short name or a
/// full type URI, whose last path segment is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SemanticTag {
    FileName,
    Timeseries,
    Text,
    Attribute,
    PrimaryKey,
    SeriesId,
    Other(String),
}

impl From<String> for SemanticTag {
    fn from(s: String) -> Self {
        let name = s.rsplit('/').next().unwrap_or(&s);
        match name {
            "FileName" => SemanticTag::FileName,
            "Timeseries" => SemanticTag::Timeseries,
            "Text" => SemanticTag::Text,
            "Attribute" => SemanticTag::Attribute,
            "PrimaryKey" => SemanticTag::PrimaryKey,
            "SeriesId" => SemanticTag::SeriesId,
            _ => SemanticTag::Other(s),
        }
    }
}

impl From<&str> for SemanticTag {
    fn from(s: &str) -> Self {
        SemanticTag::from(s.to_string())
    }
}

impl From<SemanticTag> for String {
    fn from(tag: SemanticTag) -> Self {
        match tag {
            SemanticTag::FileName => "FileName".into(),
            SemanticTag::Timeseries => "Timeseries".into(),
            SemanticTag::Text => "Text".into(),
            SemanticTag::Attribute => "Attribute".into(),
            SemanticTag::PrimaryKey => "PrimaryKey".into(),
            SemanticTag::SeriesId => "SeriesId".into(),
            SemanticTag::Other(s) => s,
        }
    }
}

/// Link from a column to a column of another resource in the same dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub resource_id: String,
    pub column_index: usize,
}

pub const CSV_MEDIA_TYPE: &str = "text/csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub structural_type: StructuralType,
    #[serde(default, rename = "tags")]
    pub semantic_tags: Vec<SemanticTag>,
    #[serde(default)]
    pub media_types: Vec<String>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKey>,
    #[serde(default)]
    pub base_uris: Vec<String>,
}

impl Annotation {
    pub fn new(structural_type: StructuralType) -> Self {
        Annotation {
            structural_type,
            semantic_tags: Vec::new(),
            media_types: Vec::new(),
            foreign_key: None,
            base_uris: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<SemanticTag>) -> Self {
        self.semantic_tags.push(tag.into());
        self
    }

    pub fn with_media_type(mut self, media_type: &str) -> Self {
        self.media_types.push(media_type.to_string());
        self
    }

    pub fn with_base_uri(mut self, uri: &str) -> Self {
        self.base_uris.push(uri.to_string());
        self
    }

    pub fn with_foreign_key(mut self, resource_id: &str, column_index: usize) -> Self {
        self.foreign_key = Some(ForeignKey {
            resource_id: resource_id.to_string(),
            column_index,
        });
        self
    }

    pub fn has_tag(&self, tag: &SemanticTag) -> bool {
        self.semantic_tags.contains(tag)
    }

    pub fn has_media_type(&self, media_type: &str) -> bool {
        self.media_types.iter().any(|m| m == media_type)
    }
}

// ---------------------------------------------------------------------------
// Table – ordered, position-aligned columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub annotation: Annotation,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].values.len() == w[1].values.len()),
            "columns must have equal length"
        );
        Table { columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Check that every column holds one value per row. Tables built by hand
    /// through the public `columns` field can violate this.
    pub fn validate(&self) -> Result<()> {
        let expected = self.num_rows();
        match self.columns.iter().find(|c| c.values.len() != expected) {
            Some(col) => Err(Error::RaggedTable {
                column: col.name.clone(),
                expected,
                found: col.values.len(),
            }),
            None => Ok(()),
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn annotation(&self, index: usize) -> Option<&Annotation> {
        self.columns.get(index).map(|c| &c.annotation)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// `(name, value)` pairs of row `index`, in column order.
    pub fn record(&self, index: usize) -> Vec<(&str, &Value)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), &c.values[index]))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TableBuilder – row buffer materialized once
// ---------------------------------------------------------------------------

/// Accumulates rows against a fixed schema and transposes them into a
/// [`Table`] in one pass.
#[derive(Debug)]
pub struct TableBuilder {
    schema: Vec<(String, Annotation)>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    pub fn new(schema: Vec<(String, Annotation)>) -> Self {
        TableBuilder {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_capacity(schema: Vec<(String, Annotation)>, rows: usize) -> Self {
        TableBuilder {
            schema,
            rows: Vec::with_capacity(rows),
        }
    }

    /// Append one row; it must have exactly one cell per schema column.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.schema.len());
        self.rows.push(row);
    }

    pub fn finish(self) -> Table {
        let n_rows = self.rows.len();
        let mut columns: Vec<Column> = self
            .schema
            .into_iter()
            .map(|(name, annotation)| Column {
                name,
                annotation,
                values: Vec::with_capacity(n_rows),
            })
            .collect();
        for row in self.rows {
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
        }
        Table { columns }
    }
}

// ---------------------------------------------------------------------------
// Dataset – several tables addressed by resource id
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub resources: BTreeMap<String, Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, table: Table) {
        self.resources.insert(id.into(), table);
    }

    pub fn get(&self, id: &str) -> Option<&Table> {
        self.resources.get(id)
    }

    /// Annotation of the column a foreign key points at, if it exists.
    pub fn referenced(&self, key: &ForeignKey) -> Option<&Annotation> {
        self.get(&key.resource_id)?.annotation(key.column_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_types_cells() {
        assert_eq!(Value::guess(""), Value::Null);
        assert_eq!(Value::guess("42"), Value::Integer(42));
        assert_eq!(Value::guess("0.5"), Value::Float(0.5));
        assert_eq!(Value::guess("true"), Value::Bool(true));
        assert_eq!(Value::guess("a.csv"), Value::String("a.csv".into()));
    }

    #[test]
    fn infer_widens_integers_to_float() {
        let vals = [Value::Integer(1), Value::Null, Value::Float(2.5)];
        assert_eq!(StructuralType::infer(&vals), StructuralType::Float);
        let vals = [Value::Integer(1), Value::String("x".into())];
        assert_eq!(StructuralType::infer(&vals), StructuralType::String);
        assert_eq!(StructuralType::infer(&[Value::Null]), StructuralType::String);
    }

    #[test]
    fn tags_parse_from_uris() {
        let tag: SemanticTag =
            "https://metadata.datadrivendiscovery.org/types/FileName".into();
        assert_eq!(tag, SemanticTag::FileName);
        let other: SemanticTag = "http://schema.org/Integer".into();
        assert_eq!(
            other,
            SemanticTag::Other("http://schema.org/Integer".into())
        );
    }

    #[test]
    fn builder_transposes_rows() {
        let schema = vec![
            ("a".to_string(), Annotation::new(StructuralType::Integer)),
            ("b".to_string(), Annotation::new(StructuralType::String)),
        ];
        let mut builder = TableBuilder::new(schema);
        builder.push_row(vec![Value::Integer(1), Value::String("x".into())]);
        builder.push_row(vec![Value::Integer(2), Value::String("y".into())]);
        let table = builder.finish();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row(1), vec![&Value::Integer(2), &Value::String("y".into())]);
    }

    #[test]
    fn ragged_columns_fail_validation() {
        let mut table = Table::new(vec![
            Column {
                name: "a".into(),
                annotation: Annotation::new(StructuralType::Integer),
                values: vec![Value::Integer(1), Value::Integer(2)],
            },
            Column {
                name: "b".into(),
                annotation: Annotation::new(StructuralType::String),
                values: vec![Value::Null, Value::Null],
            },
        ]);
        assert!(table.validate().is_ok());

        table.columns[1].values.pop();
        let err = table.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedTable { ref column, expected: 2, found: 1 } if column == "b"
        ));
        assert!(!err.is_config());
    }

    #[test]
    fn float_display_round_trips() {
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Null.to_string(), "");
    }
}
