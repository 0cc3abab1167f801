use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use url::Url;

use super::model::{Annotation, Column, Dataset, SemanticTag, StructuralType, Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Series files
// ---------------------------------------------------------------------------

/// A loaded series file: header names and guessed-type rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SeriesFrame {
    /// All cells of column `index`, in row order.
    pub fn column(&self, index: usize) -> Result<Vec<&Value>> {
        if index >= self.headers.len() {
            return Err(Error::MalformedSeries {
                path: self.path.clone(),
                reason: format!(
                    "column {index} requested but the file has {} columns",
                    self.headers.len()
                ),
            });
        }
        Ok(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Column `index` as numbers; any non-numeric cell is an error.
    pub fn numeric_column(&self, index: usize) -> Result<Vec<Value>> {
        self.column(index)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Value::Integer(_) | Value::Float(_) => Ok(v.clone()),
                other => Err(Error::MalformedSeries {
                    path: self.path.clone(),
                    reason: format!(
                        "row {row}, {}: '{other}' is not a number",
                        self.headers[index]
                    ),
                }),
            })
            .collect()
    }
}

/// Read a headed, comma-delimited series file.
pub fn load_series(path: &Path) -> Result<SeriesFrame> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::csv(path, e))?;
        rows.push(record.iter().map(|cell| Value::guess(cell.trim())).collect());
    }

    debug!("loaded {} rows from {}", rows.len(), path.display());
    Ok(SeriesFrame {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

// ---------------------------------------------------------------------------
// Dataset descriptor
// ---------------------------------------------------------------------------

/// Descriptor layout:
///
/// ```json
/// {
///   "resources": [
///     { "id": "0", "path": "timeseries", "kind": "collection",
///       "columns": [ { "name": "filename", "type": "string",
///                      "tags": ["FileName", "Timeseries"],
///                      "media_types": ["text/csv"] } ] },
///     { "id": "1", "path": "tables/learningData.csv",
///       "columns": [ { "name": "d3mIndex", "type": "integer" },
///                    { "name": "series_file", "type": "string",
///                      "tags": ["FileName", "Timeseries"],
///                      "media_types": ["text/csv"],
///                      "foreign_key": { "resource_id": "0", "column_index": 0 } } ] }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Descriptor {
    resources: Vec<ResourceDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDoc {
    id: String,
    path: PathBuf,
    #[serde(default)]
    kind: ResourceKind,
    columns: Vec<ColumnDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResourceKind {
    #[default]
    Table,
    Collection,
}

#[derive(Debug, Deserialize)]
struct ColumnDoc {
    name: String,
    #[serde(flatten)]
    annotation: Annotation,
}

/// Load every resource a descriptor lists. Relative paths are taken from the
/// descriptor's directory.
pub fn load_dataset(descriptor: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(descriptor).map_err(|e| Error::io(descriptor, e))?;
    let doc: Descriptor = serde_json::from_str(&text).map_err(|source| Error::Json {
        path: descriptor.to_path_buf(),
        source,
    })?;
    let root = descriptor.parent().unwrap_or(Path::new("."));

    let mut dataset = Dataset::new();
    for res in doc.resources {
        let path = root.join(&res.path);
        let table = match res.kind {
            ResourceKind::Table => load_table(&path, res.columns)?,
            ResourceKind::Collection => load_collection(&path, res.columns)?,
        };
        debug!(
            "resource {}: {} rows x {} columns",
            res.id,
            table.num_rows(),
            table.num_columns()
        );
        dataset.insert(res.id, table);
    }
    Ok(dataset)
}

/// Read a headed CSV, parsing each cell per its declared structural type.
/// Declared columns are matched to the file's header by name.
fn load_table(path: &Path, columns: Vec<ColumnDoc>) -> Result<Table> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let positions = columns
        .iter()
        .map(|c| {
            headers
                .iter()
                .position(|h| *h == c.name)
                .ok_or_else(|| Error::MalformedTable {
                    path: path.to_path_buf(),
                    reason: format!("declared column '{}' missing from header", c.name),
                })
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut out: Vec<Column> = columns
        .into_iter()
        .map(|c| Column {
            name: c.name,
            annotation: c.annotation,
            values: Vec::new(),
        })
        .collect();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::csv(path, e))?;
        for (col, &pos) in out.iter_mut().zip(&positions) {
            let raw = record.get(pos).unwrap_or("");
            let value = Value::parse_as(raw, col.annotation.structural_type).ok_or_else(|| {
                Error::MalformedTable {
                    path: path.to_path_buf(),
                    reason: format!(
                        "row {row_no}, {}: '{raw}' is not {:?}",
                        col.name, col.annotation.structural_type
                    ),
                }
            })?;
            col.values.push(value);
        }
    }

    Ok(Table::new(out))
}

/// A directory of files becomes a single column of file names, sorted.
fn load_collection(dir: &Path, mut columns: Vec<ColumnDoc>) -> Result<Table> {
    if columns.len() != 1 {
        return Err(Error::MalformedTable {
            path: dir.to_path_buf(),
            reason: format!("collection declares {} columns, expected 1", columns.len()),
        });
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        if entry.file_type().map_err(|e| Error::io(dir, e))?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut doc = columns.remove(0);
    if doc.annotation.base_uris.is_empty() {
        let abs = std::fs::canonicalize(dir).map_err(|e| Error::io(dir, e))?;
        let url = Url::from_directory_path(&abs).map_err(|()| Error::UnsupportedBaseUri {
            uri: abs.display().to_string(),
        })?;
        doc.annotation.base_uris.push(url.into());
    }
    if !doc.annotation.has_tag(&SemanticTag::FileName) {
        doc.annotation.semantic_tags.push(SemanticTag::FileName);
    }
    doc.annotation.structural_type = StructuralType::String;

    Ok(Table::new(vec![Column {
        name: doc.name,
        annotation: doc.annotation,
        values: names.into_iter().map(Value::String).collect(),
    }]))
}
