use std::path::{Path, PathBuf};

use url::Url;

use super::model::{Dataset, Table};
use crate::error::{Error, Result};

/// Local directory that the reference column's file names are relative to.
///
/// The base uri comes from the column itself, or from its foreign-key target
/// when `dataset` is given and the column carries a key. Only one hop is
/// followed.
pub fn base_directory(
    table: &Table,
    column: usize,
    dataset: Option<&Dataset>,
) -> Result<PathBuf> {
    let annotation = table
        .annotation(column)
        .ok_or(Error::NotSeriesColumn { index: column })?;

    let source = match (&annotation.foreign_key, dataset) {
        (Some(key), Some(dataset)) => dataset
            .referenced(key)
            .ok_or(Error::MissingBaseUri { index: column })?,
        _ => annotation,
    };

    let uri = source
        .base_uris
        .first()
        .ok_or(Error::MissingBaseUri { index: column })?;
    local_path(uri)
}

/// Decode a `file:` url into a local path. Plain paths pass through; any
/// other scheme, or a `file:` url naming a remote host, is not loadable.
fn local_path(uri: &str) -> Result<PathBuf> {
    let unsupported = || Error::UnsupportedBaseUri {
        uri: uri.to_string(),
    };
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().map_err(|()| unsupported()),
        Ok(_) if uri.contains("://") => Err(unsupported()),
        // relative paths and drive letters
        _ => Ok(PathBuf::from(uri)),
    }
}

/// Path of one series file. Existence is not checked here.
pub fn series_path(base: &Path, relative: &str) -> PathBuf {
    base.join(relative)
}

/// Series file path of every row, in row order. Fails on a row without a
/// file name so that nothing is opened for a half-valid column.
pub fn series_paths(table: &Table, column: usize, base: &Path) -> Result<Vec<PathBuf>> {
    let col = table
        .column(column)
        .ok_or(Error::NotSeriesColumn { index: column })?;
    col.values
        .iter()
        .enumerate()
        .map(|(row, v)| match v.as_str() {
            Some(name) if !name.is_empty() => Ok(series_path(base, name)),
            _ => Err(Error::MissingFileName { index: column, row }),
        })
        .collect()
}
