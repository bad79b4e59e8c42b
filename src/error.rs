//! Fatal error conditions.
//!
//! Every variant here stops the run. Recoverable situations (an optional
//! intermediate file that is absent, for instance) are logged instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the summary pipeline.
pub type SummaryResult<T> = std::result::Result<T, SummaryError>;

/// Errors raised while configuring, reading, or writing a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("The configuration file {0} was not found.")]
    ConfigNotFound(PathBuf),

    #[error("The given path {0} should be a file, not a directory.")]
    ConfigNotAFile(PathBuf),

    #[error("The configuration file must be in `.json` format. You specified: {0}.")]
    ConfigExtension(String),

    #[error(
        "The main configuration file `{path}` exists but is formatted incorrectly. \
         Please check that each line ends with a comma, there is no comma at the end \
         of the last line, and that all quotes match. ({source})"
    )]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("The config file must specify '{0}'")]
    MissingField(String),

    #[error("Unrecognized field '{0}' in json file")]
    UnknownField(String),

    #[error("Invalid configuration: {0}")]
    InvalidField(String),

    #[error("The directory {0} does not exist.")]
    ExperimentDirNotFound(PathBuf),

    #[error("The directory {0} does not contain the output of an rsmtool experiment.")]
    MissingOutputDir(PathBuf),

    #[error(
        "The directory {0} does not contain the .json configuration files for rsmtool experiments."
    )]
    MissingExperimentConfig(PathBuf),

    #[error(
        "The directory {0} contains the output of multiple experiments. \
         Experiment names cannot be specified for such directories."
    )]
    AmbiguousExperimentNames(PathBuf),

    #[error("Experiment '{experiment}' is missing the intermediate file {path}")]
    MissingIntermediateFile { experiment: String, path: PathBuf },

    #[error("Experiment '{experiment}' has intermediate files in several formats: {formats}")]
    MixedFileFormats { experiment: String, formats: String },

    #[error("File format '{0}' is not supported; use csv or tsv")]
    UnsupportedFileFormat(String),

    #[error("Experiment id '{0}' appears more than once in this summary")]
    DuplicateExperiment(String),

    #[error("'{0}' already contains a non-empty '{1}' directory. Use --force to overwrite.")]
    OutputNotEmpty(PathBuf, String),

    #[error("Refusing to write into {0}: it holds the experiment output {1}")]
    OutputOverlapsExperiment(PathBuf, PathBuf),

    #[error("Invalid report section: {0}")]
    InvalidSection(String),

    #[error("Failed to read table {path}: {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write table {path}: {source}")]
    TableWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
