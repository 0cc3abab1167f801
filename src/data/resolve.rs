//! Locating the column that holds series file references.
//!
//! Resolution only looks at annotations, never at cell data, so the same
//! functions back both the reshapes and the cheap `can_accept_*` checks.

use std::path::PathBuf;

use super::model::{Annotation, Dataset, SemanticTag, StructuralType, Table, CSV_MEDIA_TYPE};
use super::paths::base_directory;
use crate::config::{LongConfig, WideConfig};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A string column of csv file names tagged as a time series.
pub fn is_series_file_column(annotation: &Annotation) -> bool {
    annotation.structural_type == StructuralType::String
        && annotation.has_tag(&SemanticTag::FileName)
        && annotation.has_tag(&SemanticTag::Timeseries)
        && annotation.has_media_type(CSV_MEDIA_TYPE)
}

/// A string column of csv file names; the target side of a foreign key.
pub fn is_csv_file_reference(annotation: &Annotation) -> bool {
    annotation.structural_type == StructuralType::String
        && annotation.has_tag(&SemanticTag::FileName)
        && annotation.has_media_type(CSV_MEDIA_TYPE)
}

/// A string column whose foreign key points at a csv file name column.
pub fn is_foreign_series_column(dataset: &Dataset, table: &Table, column: usize) -> bool {
    let Some(annotation) = table.annotation(column) else {
        return false;
    };
    if annotation.structural_type != StructuralType::String {
        return false;
    }
    annotation
        .foreign_key
        .as_ref()
        .and_then(|key| dataset.referenced(key))
        .is_some_and(is_csv_file_reference)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Validate `explicit`, or scan left to right for the first column whose
/// annotation satisfies `accept`.
fn resolve_with(
    num_columns: usize,
    explicit: Option<usize>,
    accept: impl Fn(usize) -> bool,
) -> Result<usize> {
    match explicit {
        Some(index) if accept(index) => Ok(index),
        Some(index) => Err(Error::NotSeriesColumn { index }),
        None => (0..num_columns).find(|&i| accept(i)).ok_or(Error::NoSeriesColumn),
    }
}

/// Reference column of a single table.
pub fn resolve_series_column(table: &Table, explicit: Option<usize>) -> Result<usize> {
    resolve_with(table.num_columns(), explicit, |i| {
        table.annotation(i).is_some_and(is_series_file_column)
    })
}

/// Reference column of `table` whose file names live in another resource of
/// `dataset`.
pub fn resolve_foreign_series_column(
    dataset: &Dataset,
    table: &Table,
    explicit: Option<usize>,
) -> Result<usize> {
    resolve_with(table.num_columns(), explicit, |i| {
        is_foreign_series_column(dataset, table, i)
    })
}

/// Main resource named by `config`.
pub fn main_table<'a>(dataset: &'a Dataset, config: &LongConfig) -> Result<(&'a str, &'a Table)> {
    let id = config.main_resource.as_deref().ok_or(Error::NoMainResource)?;
    dataset
        .resources
        .get_key_value(id)
        .map(|(k, t)| (k.as_str(), t))
        .ok_or_else(|| Error::UnknownResource(id.to_string()))
}

/// Everything the long reshape needs before touching a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPlan {
    pub main_resource: String,
    pub reference_resource: String,
    pub column: usize,
    pub base_directory: PathBuf,
}

/// Run every configuration step of the long reshape.
pub fn plan_long(dataset: &Dataset, config: &LongConfig) -> Result<LongPlan> {
    let (main_id, table) = main_table(dataset, config)?;
    let column = resolve_foreign_series_column(dataset, table, config.file_col_index)?;

    // resolution guarantees the key exists
    let key = table
        .annotation(column)
        .and_then(|a| a.foreign_key.as_ref())
        .ok_or(Error::NotSeriesColumn { index: column })?;
    if let Some(expected) = &config.reference_resource {
        if *expected != key.resource_id {
            return Err(Error::ReferenceMismatch {
                index: column,
                expected: expected.clone(),
                found: key.resource_id.clone(),
            });
        }
    }

    let base = base_directory(table, column, Some(dataset))?;
    Ok(LongPlan {
        main_resource: main_id.to_string(),
        reference_resource: key.resource_id.clone(),
        column,
        base_directory: base,
    })
}

// ---------------------------------------------------------------------------
// Acceptance checks
// ---------------------------------------------------------------------------

/// Whether [`crate::data::wide::reshape_wide`] would get past configuration.
pub fn can_accept_wide(table: &Table, dataset: Option<&Dataset>, config: &WideConfig) -> bool {
    resolve_series_column(table, config.file_col_index)
        .and_then(|column| base_directory(table, column, dataset))
        .is_ok()
}

/// Whether [`crate::data::long::reshape_long`] would get past configuration.
pub fn can_accept_long(dataset: &Dataset, config: &LongConfig) -> bool {
    plan_long(dataset, config).is_ok()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::model::{Column, Value};

    fn series_annotation() -> Annotation {
        Annotation::new(StructuralType::String)
            .with_tag(SemanticTag::FileName)
            .with_tag(SemanticTag::Timeseries)
            .with_media_type(CSV_MEDIA_TYPE)
            .with_base_uri("file:///data/timeseries/")
    }

    fn column(name: &str, annotation: Annotation) -> Column {
        Column {
            name: name.into(),
            annotation,
            values: vec![Value::Null],
        }
    }

    fn wide_table() -> Table {
        Table::new(vec![
            column("d3mIndex", Annotation::new(StructuralType::Integer)),
            column("label", Annotation::new(StructuralType::String)),
            column("series", series_annotation()),
            column("series_2", series_annotation()),
        ])
    }

    #[test]
    fn explicit_index_is_validated() {
        let table = wide_table();
        assert_eq!(resolve_series_column(&table, Some(3)).unwrap(), 3);
        let err = resolve_series_column(&table, Some(0)).unwrap_err();
        assert!(matches!(err, Error::NotSeriesColumn { index: 0 }));
        assert!(err.is_config());
        assert!(matches!(
            resolve_series_column(&table, Some(17)),
            Err(Error::NotSeriesColumn { index: 17 })
        ));
    }

    #[test]
    fn inference_picks_first_match() {
        let table = wide_table();
        for _ in 0..3 {
            assert_eq!(resolve_series_column(&table, None).unwrap(), 2);
        }
    }

    #[test]
    fn inference_without_match_fails() {
        let table = Table::new(vec![column(
            "series",
            Annotation::new(StructuralType::String).with_tag(SemanticTag::FileName),
        )]);
        let err = resolve_series_column(&table, None).unwrap_err();
        assert_eq!(err.to_string(), "no column contains csv file names");
    }

    #[test]
    fn non_string_column_is_rejected() {
        let mut ann = series_annotation();
        ann.structural_type = StructuralType::Integer;
        assert!(!is_series_file_column(&ann));
    }

    fn two_table_dataset() -> Dataset {
        let files = Table::new(vec![column(
            "filename",
            Annotation::new(StructuralType::String)
                .with_tag(SemanticTag::FileName)
                .with_media_type(CSV_MEDIA_TYPE)
                .with_base_uri("file:///data/timeseries/"),
        )]);
        let main = Table::new(vec![
            column("d3mIndex", Annotation::new(StructuralType::Integer)),
            column(
                "series_file",
                Annotation::new(StructuralType::String).with_foreign_key("0", 0),
            ),
        ]);
        let mut dataset = Dataset::new();
        dataset.insert("0", files);
        dataset.insert("1", main);
        dataset
    }

    #[test]
    fn foreign_key_column_is_inferred() {
        let dataset = two_table_dataset();
        let plan = plan_long(&dataset, &LongConfig::default()).unwrap();
        assert_eq!(plan.column, 1);
        assert_eq!(plan.reference_resource, "0");
        assert_eq!(plan.base_directory, Path::new("/data/timeseries/"));
    }

    #[test]
    fn dangling_foreign_key_does_not_match() {
        let mut dataset = two_table_dataset();
        dataset.resources.remove("0");
        assert!(matches!(
            plan_long(&dataset, &LongConfig::default()),
            Err(Error::NoSeriesColumn)
        ));
    }

    #[test]
    fn long_configuration_errors() {
        let dataset = two_table_dataset();

        let cfg = LongConfig {
            main_resource: None,
            ..LongConfig::default()
        };
        assert!(matches!(plan_long(&dataset, &cfg), Err(Error::NoMainResource)));

        let cfg = LongConfig {
            main_resource: Some("9".into()),
            ..LongConfig::default()
        };
        assert!(matches!(plan_long(&dataset, &cfg), Err(Error::UnknownResource(_))));

        let cfg = LongConfig {
            reference_resource: Some("2".into()),
            ..LongConfig::default()
        };
        assert!(matches!(
            plan_long(&dataset, &cfg),
            Err(Error::ReferenceMismatch { .. })
        ));

        let cfg = LongConfig {
            file_col_index: Some(0),
            ..LongConfig::default()
        };
        assert!(matches!(
            plan_long(&dataset, &cfg),
            Err(Error::NotSeriesColumn { index: 0 })
        ));
    }

    #[test]
    fn acceptance_mirrors_resolution() {
        let table = wide_table();
        assert!(can_accept_wide(&table, None, &WideConfig::default()));
        let bad = WideConfig {
            file_col_index: Some(1),
            ..WideConfig::default()
        };
        assert!(!can_accept_wide(&table, None, &bad));

        let dataset = two_table_dataset();
        assert!(can_accept_long(&dataset, &LongConfig::default()));
        let bad = LongConfig {
            file_col_index: Some(4),
            ..LongConfig::default()
        };
        assert!(!can_accept_long(&dataset, &bad));
    }

    #[test]
    fn acceptance_requires_base_uri() {
        let mut ann = series_annotation();
        ann.base_uris.clear();
        let table = Table::new(vec![column("series", ann)]);
        assert!(resolve_series_column(&table, None).is_ok());
        assert!(!can_accept_wide(&table, None, &WideConfig::default()));
    }
}
