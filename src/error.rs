use std::path::PathBuf;

use thiserror::Error;

/// A dataset could not be loaded at all.
#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: simd_json::Error,
    },

    #[error("{} is not a valid GeoJSON document: {source}", path.display())]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("{} has an invalid topology: {reason}", path.display())]
    Topology { path: PathBuf, reason: String },

    #[error("{} has no topology object named `{name}`", path.display())]
    MissingObject { path: PathBuf, name: String },

    #[error("failed to read CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing the `{column}` column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// A single tabular row was rejected; the rest of the file still loads.
#[derive(Debug, Error)]
pub enum MalformedRecordError {
    #[error("row {row}: `{field}` is not a finite number ({value:?})")]
    NonNumeric {
        row: u64,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {source}")]
    Decode {
        row: u64,
        #[source]
        source: csv::Error,
    },
}
