use std::collections::{BTreeSet, HashMap};

use log::info;

use super::loader::{load_series, SeriesFrame};
use super::model::{Annotation, Dataset, SemanticTag, StructuralType, Table, TableBuilder, Value};
use super::paths::series_paths;
use super::resolve::plan_long;
use crate::config::LongConfig;
use crate::error::{Error, Result};

/// Name of the synthesized column holding each row's source position.
pub const SERIES_ID_COLUMN: &str = "series_id";

// ---------------------------------------------------------------------------
// Per-row expansion
// ---------------------------------------------------------------------------

/// Output rows produced by one main row, with their field names.
///
/// Every row is the main row's fields, the series id, then one series row's
/// fields, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Pair one main row with every row of its series file.
pub fn expand_row(series_id: usize, main: &[(&str, &Value)], frame: &SeriesFrame) -> Expansion {
    let mut fields: Vec<String> = main.iter().map(|(name, _)| name.to_string()).collect();
    fields.push(SERIES_ID_COLUMN.to_string());
    fields.extend(frame.headers.iter().cloned());

    let mut head: Vec<Value> = main.iter().map(|(_, v)| (*v).clone()).collect();
    head.push(Value::Integer(series_id as i64));

    let rows = frame
        .rows
        .iter()
        .map(|series_row| {
            let mut row = Vec::with_capacity(fields.len());
            row.extend(head.iter().cloned());
            row.extend(series_row.iter().cloned());
            row
        })
        .collect();

    Expansion { fields, rows }
}

// ---------------------------------------------------------------------------
// Schema union
// ---------------------------------------------------------------------------

/// Ordered field list where a repeated name keeps its first position and
/// takes the later annotation.
#[derive(Debug, Default)]
struct SchemaUnion {
    fields: Vec<(String, Annotation)>,
    index: HashMap<String, usize>,
}

impl SchemaUnion {
    fn put(&mut self, name: &str, annotation: Annotation) {
        match self.index.get(name) {
            Some(&i) => self.fields[i].1 = annotation,
            None => {
                self.index.insert(name.to_string(), self.fields.len());
                self.fields.push((name.to_string(), annotation));
            }
        }
    }

    fn position(&self, name: &str) -> usize {
        self.index[name]
    }
}

/// Main columns, the series id, then series columns in first-seen order.
///
/// Series fields get a placeholder type here; [`materialize`] types them from
/// the cells they end up holding.
fn union_schema(main: &Table, expansions: &[Expansion]) -> SchemaUnion {
    let mut union = SchemaUnion::default();
    for col in &main.columns {
        union.put(&col.name, col.annotation.clone());
    }
    union.put(
        SERIES_ID_COLUMN,
        Annotation::new(StructuralType::Integer).with_tag(SemanticTag::SeriesId),
    );

    let width = main.num_columns() + 1;
    let placeholder = Annotation::new(StructuralType::String).with_tag(SemanticTag::Attribute);
    for e in expansions {
        for name in &e.fields[width..] {
            union.put(name, placeholder.clone());
        }
    }
    union
}

/// Lay every expansion out under the union schema. Missing fields are Null
/// and a repeated field name keeps the later value.
///
/// A column that received any series field is typed from its final cells,
/// which may mix series values with main values of the same name.
fn materialize(main: &Table, expansions: Vec<Expansion>) -> Table {
    let union = union_schema(main, &expansions);
    let total: usize = expansions.iter().map(|e| e.rows.len()).sum();
    let width = union.fields.len();
    let main_width = main.num_columns() + 1;

    let targets: Vec<Vec<usize>> = expansions
        .iter()
        .map(|e| e.fields.iter().map(|f| union.position(f)).collect())
        .collect();
    let retyped: BTreeSet<usize> = targets
        .iter()
        .flat_map(|t| t[main_width..].iter().copied())
        .collect();

    let mut builder = TableBuilder::with_capacity(union.fields, total);
    for (e, targets) in expansions.into_iter().zip(targets) {
        for row in e.rows {
            let mut out = vec![Value::Null; width];
            for (&t, v) in targets.iter().zip(row) {
                out[t] = v;
            }
            builder.push_row(out);
        }
    }

    let mut table = builder.finish();
    for i in retyped {
        let col = &mut table.columns[i];
        col.annotation.structural_type = StructuralType::infer(col.values.iter());
    }
    table
}

// ---------------------------------------------------------------------------
// Long reshape
// ---------------------------------------------------------------------------

/// Union every referenced series with its main row.
///
/// The output has one row per (main row, series row) pair, in main row order
/// and then series file order.
pub fn reshape_long(dataset: &Dataset, config: &LongConfig) -> Result<Table> {
    let plan = plan_long(dataset, config)?;
    let main = dataset
        .get(&plan.main_resource)
        .ok_or_else(|| Error::UnknownResource(plan.main_resource.clone()))?;
    main.validate()?;
    let paths = series_paths(main, plan.column, &plan.base_directory)?;

    let mut expansions = Vec::with_capacity(paths.len());
    for (idx, path) in paths.iter().enumerate() {
        let frame = load_series(path)?;
        expansions.push(expand_row(idx, &main.record(idx), &frame));
    }

    let out = materialize(main, expansions);
    info!(
        "long reshape: {} main rows from resource {} -> {} rows x {} columns",
        main.num_rows(),
        plan.main_resource,
        out.num_rows(),
        out.num_columns()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn main_table() -> Table {
        Table::new(vec![
            Column {
                name: "d3mIndex".into(),
                annotation: Annotation::new(StructuralType::Integer),
                values: vec![Value::Integer(10), Value::Integer(11)],
            },
            Column {
                name: "value".into(),
                annotation: Annotation::new(StructuralType::String),
                values: vec![Value::String("a".into()), Value::String("b".into())],
            },
        ])
    }

    fn frame(headers: &[&str], rows: Vec<Vec<Value>>) -> SeriesFrame {
        SeriesFrame {
            path: "s.csv".into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn expansion_concatenates_fields() {
        let main = main_table();
        let f = frame(
            &["time", "reading"],
            vec![
                vec![Value::Integer(1), Value::Float(0.5)],
                vec![Value::Integer(2), Value::Float(0.7)],
            ],
        );
        let e = expand_row(1, &main.record(1), &f);
        assert_eq!(e.fields, vec!["d3mIndex", "value", "series_id", "time", "reading"]);
        assert_eq!(e.rows.len(), 2);
        assert_eq!(
            e.rows[1],
            vec![
                Value::Integer(11),
                Value::String("b".into()),
                Value::Integer(1),
                Value::Integer(2),
                Value::Float(0.7),
            ]
        );
    }

    #[test]
    fn later_field_wins_on_collision() {
        let main = main_table();
        let f = frame(&["time", "value"], vec![vec![Value::Integer(1), Value::Float(0.5)]]);
        let expansions = vec![expand_row(0, &main.record(0), &f)];
        let out = materialize(&main, expansions);

        assert_eq!(out.column_names(), vec!["d3mIndex", "value", "series_id", "time"]);
        assert_eq!(out.columns[1].values, vec![Value::Float(0.5)]);
        assert_eq!(out.columns[1].annotation.structural_type, StructuralType::Float);
    }

    #[test]
    fn differing_headers_are_unioned() {
        let main = main_table();
        let a = frame(&["time", "x"], vec![vec![Value::Integer(1), Value::Integer(5)]]);
        let b = frame(&["time", "y"], vec![vec![Value::Integer(1), Value::Float(0.1)]]);
        let expansions = vec![
            expand_row(0, &main.record(0), &a),
            expand_row(1, &main.record(1), &b),
        ];
        let out = materialize(&main, expansions);

        assert_eq!(
            out.column_names(),
            vec!["d3mIndex", "value", "series_id", "time", "x", "y"]
        );
        assert_eq!(out.columns[4].values, vec![Value::Integer(5), Value::Null]);
        assert_eq!(out.columns[5].values, vec![Value::Null, Value::Float(0.1)]);
        assert_eq!(out.columns[4].annotation.structural_type, StructuralType::Integer);
        assert!(out.columns[2].annotation.has_tag(&SemanticTag::SeriesId));
    }

    #[test]
    fn collided_column_is_typed_from_all_its_cells() {
        let main = Table::new(vec![Column {
            name: "label".into(),
            annotation: Annotation::new(StructuralType::String),
            values: vec![Value::String("x".into()), Value::String("y".into())],
        }]);
        // only the first series overwrites `label`, and with numbers
        let a = frame(&["time", "label"], vec![vec![Value::Integer(1), Value::Integer(7)]]);
        let b = frame(&["time", "reading"], vec![vec![Value::Integer(1), Value::Float(0.5)]]);
        let expansions = vec![
            expand_row(0, &main.record(0), &a),
            expand_row(1, &main.record(1), &b),
        ];
        let out = materialize(&main, expansions);

        assert_eq!(out.columns[0].values, vec![Value::Integer(7), Value::String("y".into())]);
        assert_eq!(out.columns[0].annotation.structural_type, StructuralType::String);
        assert_eq!(out.column_names(), vec!["label", "series_id", "time", "reading"]);
        assert_eq!(out.columns[3].annotation.structural_type, StructuralType::Float);

        let batch = crate::data::export::to_record_batch(&out).unwrap();
        assert_eq!(batch.column(0).null_count(), 0);
        assert_eq!(batch.column(3).null_count(), 1);
    }

    #[test]
    fn empty_series_contributes_no_rows() {
        let main = main_table();
        let empty = frame(&["time", "value"], Vec::new());
        let one = frame(&["time", "value"], vec![vec![Value::Integer(1), Value::Float(2.0)]]);
        let expansions = vec![
            expand_row(0, &main.record(0), &empty),
            expand_row(1, &main.record(1), &one),
        ];
        let out = materialize(&main, expansions);
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.columns[2].values, vec![Value::Integer(1)]);
    }
}
