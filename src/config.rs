use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Per-invocation options
// ---------------------------------------------------------------------------

/// How later series files are checked against the first file's timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AxisCheck {
    /// Fail on the first file whose timestamps differ from the first file's.
    #[default]
    Strict,
    /// Place values under the first file's headers by position, unchecked.
    Positional,
}

/// Options for the wide (pivot) reshape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WideConfig {
    /// Reference column; `None` picks the first csv file name column.
    pub file_col_index: Option<usize>,
    /// Series file column holding the timestamps.
    pub time_col_index: usize,
    /// Series file column holding the values.
    pub value_col_index: usize,
    pub axis_check: AxisCheck,
}

impl Default for WideConfig {
    fn default() -> Self {
        Self {
            file_col_index: None,
            time_col_index: 0,
            value_col_index: 1,
            axis_check: AxisCheck::Strict,
        }
    }
}

/// Options for the long (union) reshape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LongConfig {
    /// Reference column in the main resource; `None` infers it.
    pub file_col_index: Option<usize>,
    /// Resource holding one row per series.
    pub main_resource: Option<String>,
    /// Resource the reference column must point into, when pinned.
    pub reference_resource: Option<String>,
}

impl Default for LongConfig {
    fn default() -> Self {
        Self {
            file_col_index: None,
            main_resource: Some("1".to_string()),
            reference_resource: None,
        }
    }
}

/// Read a JSON options file into either config type.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: WideConfig = serde_json::from_str(r#"{ "value_col_index": 2 }"#).unwrap();
        assert_eq!(cfg.time_col_index, 0);
        assert_eq!(cfg.value_col_index, 2);
        assert_eq!(cfg.axis_check, AxisCheck::Strict);

        let cfg: LongConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.main_resource.as_deref(), Some("1"));
    }

    #[test]
    fn explicit_null_main_resource_is_kept() {
        let cfg: LongConfig = serde_json::from_str(r#"{ "main_resource": null }"#).unwrap();
        assert_eq!(cfg.main_resource, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: std::result::Result<WideConfig, _> =
            serde_json::from_str(r#"{ "time_col": 1 }"#);
        assert!(res.is_err());
    }
}
