//! Configuration file handling.
//!
//! This module handles loading, normalising, and validating the JSON
//! summary configuration, filling in defaults, and saving the resolved
//! copy next to the summary output.

use crate::error::{SummaryError, SummaryResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The tool name, used in the saved configuration file name.
pub const CONTEXT: &str = "rsmsummarize";

/// Maximum length of the summary identifier.
pub const MAX_ID_LENGTH: usize = 200;

const REQUIRED_FIELDS: &[&str] = &["summary_id", "experiment_dirs"];

const OPTIONAL_FIELDS: &[&str] = &[
    "description",
    "experiment_names",
    "file_format",
    "general_sections",
    "custom_sections",
    "special_sections",
    "use_thumbnails",
    "subgroups",
    "section_order",
];

/// Fields that accept either a list or a comma-separated string.
const LIST_FIELDS: &[&str] = &[
    "experiment_dirs",
    "experiment_names",
    "general_sections",
    "custom_sections",
    "special_sections",
    "subgroups",
    "section_order",
];

const BOOLEAN_FIELDS: &[&str] = &["use_thumbnails"];

/// Format of intermediate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Tsv,
    Xlsx,
}

impl FileFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Xlsx => "xlsx",
        }
    }

    /// Field delimiter for the delimited formats.
    pub fn delimiter(&self) -> SummaryResult<u8> {
        match self {
            FileFormat::Csv => Ok(b','),
            FileFormat::Tsv => Ok(b'\t'),
            FileFormat::Xlsx => Err(SummaryError::UnsupportedFileFormat("xlsx".to_string())),
        }
    }

    /// Parse an extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" => Some(FileFormat::Tsv),
            "xlsx" => Some(FileFormat::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Root summary configuration.
///
/// Serializing this struct yields the resolved configuration: every field
/// is present, with defaults filled in for the ones the user left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryConfig {
    /// Identifier used as the prefix of every output file.
    pub summary_id: String,

    /// Directories of the experiments to summarize, in report order.
    pub experiment_dirs: Vec<String>,

    /// Free-text description shown in the report header.
    #[serde(default)]
    pub description: String,

    /// Display names, one per experiment directory.
    #[serde(default)]
    pub experiment_names: Option<Vec<String>>,

    /// Format of the tables written to `output/`.
    #[serde(default)]
    pub file_format: FileFormat,

    /// Built-in report sections to include.
    #[serde(default = "default_general_sections")]
    pub general_sections: Vec<String>,

    /// Paths to HTML fragments included as extra sections.
    #[serde(default)]
    pub custom_sections: Option<Vec<String>>,

    /// Accepted for compatibility; no special sections exist.
    #[serde(default)]
    pub special_sections: Option<Vec<String>>,

    /// Accepted for compatibility; figures are not rendered.
    #[serde(default)]
    pub use_thumbnails: bool,

    /// Subgroup columns whose per-group evaluations are compared.
    #[serde(default)]
    pub subgroups: Vec<String>,

    /// Explicit ordering of all chosen sections.
    #[serde(default)]
    pub section_order: Option<Vec<String>>,

    /// Directory used to resolve relative paths.
    #[serde(skip)]
    pub configdir: PathBuf,
}

fn default_general_sections() -> Vec<String> {
    vec!["all".to_string()]
}

impl SummaryConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> SummaryResult<Self> {
        if !path.exists() {
            return Err(SummaryError::ConfigNotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(SummaryError::ConfigNotAFile(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        if extension != ".json" {
            return Err(SummaryError::ConfigExtension(extension));
        }

        let configdir = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let map = match parse_json_with_comments(path)? {
            Value::Object(map) => map,
            _ => {
                return Err(SummaryError::InvalidField(
                    "the configuration must be a JSON object".to_string(),
                ))
            }
        };

        info!("Loaded configuration from {}", path.display());
        Self::from_map(map, configdir)
    }

    /// Build a configuration from an in-memory JSON object.
    pub fn from_map(map: Map<String, Value>, configdir: PathBuf) -> SummaryResult<Self> {
        let map = process_fields(map)?;
        check_field_names(&map)?;

        let mut config: SummaryConfig = serde_json::from_value(Value::Object(map))
            .map_err(|e| SummaryError::InvalidField(e.to_string()))?;
        config.configdir = configdir;
        if config.experiment_names.as_ref().is_some_and(Vec::is_empty) {
            config.experiment_names = None;
        }
        config.validate()?;

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> SummaryResult<()> {
        if self.summary_id.chars().count() > MAX_ID_LENGTH {
            return Err(SummaryError::InvalidField(format!(
                "summary_id is too long (must be <={} characters)",
                MAX_ID_LENGTH
            )));
        }
        if self.summary_id.is_empty() {
            return Err(SummaryError::InvalidField(
                "summary_id cannot be empty".to_string(),
            ));
        }
        if self.summary_id.chars().any(char::is_whitespace) {
            return Err(SummaryError::InvalidField(
                "summary_id cannot contain any spaces".to_string(),
            ));
        }

        if self.experiment_dirs.is_empty() {
            return Err(SummaryError::InvalidField(
                "experiment_dirs must list at least one experiment directory".to_string(),
            ));
        }

        if let Some(ref names) = self.experiment_names {
            if names.len() != self.experiment_dirs.len() {
                return Err(SummaryError::InvalidField(
                    "The number of specified experiment names should be the same as the \
                     number of specified experiment directories."
                        .to_string(),
                ));
            }
        }

        if self.file_format == FileFormat::Xlsx {
            return Err(SummaryError::UnsupportedFileFormat("xlsx".to_string()));
        }

        Ok(())
    }

    /// Resolve a possibly-relative path against the configuration directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.configdir.join(path)
        }
    }

    /// User-supplied name for the experiment directory at `index`.
    pub fn experiment_name(&self, index: usize) -> Option<&str> {
        self.experiment_names
            .as_ref()
            .and_then(|names| names.get(index))
            .map(String::as_str)
    }

    /// Name of the saved configuration file.
    pub fn saved_file_name(&self) -> String {
        format!("{}_{}.json", self.summary_id, CONTEXT)
    }

    /// Save the resolved configuration to `<output_dir>/output/`.
    pub fn save(&self, output_dir: &Path) -> SummaryResult<PathBuf> {
        let output_files_dir = output_dir.join("output");
        std::fs::create_dir_all(&output_files_dir)?;

        let path = output_files_dir.join(self.saved_file_name());
        std::fs::write(&path, self.to_json()?)?;

        info!("Saved resolved configuration to {}", path.display());
        Ok(path)
    }

    /// Pretty JSON of the resolved configuration.
    pub fn to_json(&self) -> SummaryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate the content of a template configuration file.
    pub fn template() -> String {
        let config = SummaryConfig {
            summary_id: "model_comparison".to_string(),
            experiment_dirs: vec![
                "path/to/experiment1".to_string(),
                "path/to/experiment2".to_string(),
            ],
            description: String::new(),
            experiment_names: None,
            file_format: FileFormat::default(),
            general_sections: default_general_sections(),
            custom_sections: None,
            special_sections: None,
            use_thumbnails: false,
            subgroups: Vec::new(),
            section_order: None,
            configdir: PathBuf::new(),
        };
        config.to_json().unwrap_or_default()
    }
}

/// Read a JSON file that may contain `//` line comments.
pub fn parse_json_with_comments(path: &Path) -> SummaryResult<Value> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&strip_comments(&content)).map_err(|source| {
        SummaryError::MalformedJson {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Remove `//` comments that appear outside of string literals.
pub fn strip_comments(content: &str) -> String {
    let mut output = String::with_capacity(content.len());

    for line in content.lines() {
        let mut in_string = false;
        let mut escaped = false;
        let mut cut = line.len();
        let bytes = line.as_bytes();

        for (i, &b) in bytes.iter().enumerate() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
            } else if b == b'"' {
                in_string = true;
            } else if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
                cut = i;
                break;
            }
        }

        output.push_str(&line[..cut]);
        output.push('\n');
    }

    output
}

/// Normalise list and boolean fields and drop explicit nulls.
fn process_fields(mut map: Map<String, Value>) -> SummaryResult<Map<String, Value>> {
    map.retain(|_, value| !value.is_null());

    for field in LIST_FIELDS {
        if let Some(Value::String(s)) = map.get(*field) {
            let items: Vec<Value> = s
                .split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect();
            map.insert(field.to_string(), Value::Array(items));
        }
    }

    for field in BOOLEAN_FIELDS {
        let Some(value) = map.get(*field) else {
            continue;
        };
        if value.is_boolean() {
            continue;
        }

        let given = match value {
            Value::String(s) => s.trim().to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        let parsed = match given.as_str() {
            "true" => true,
            "false" => false,
            _ => {
                return Err(SummaryError::InvalidField(format!(
                    "Field {} can only be set to True or False.",
                    field
                )))
            }
        };
        map.insert(field.to_string(), Value::Bool(parsed));
    }

    if let Some(Value::String(s)) = map.get("file_format") {
        let lowered = s.trim().to_lowercase();
        map.insert("file_format".to_string(), Value::String(lowered));
    }

    Ok(map)
}

/// Reject missing required fields and unrecognized ones.
fn check_field_names(map: &Map<String, Value>) -> SummaryResult<()> {
    for field in REQUIRED_FIELDS {
        if !map.contains_key(*field) {
            return Err(SummaryError::MissingField(field.to_string()));
        }
    }

    for field in map.keys() {
        let known = REQUIRED_FIELDS.contains(&field.as_str())
            || OPTIONAL_FIELDS.contains(&field.as_str());
        if !known {
            return Err(SummaryError::UnknownField(field.clone()));
        }
    }

    Ok(())
}
