//! Report section selection and ordering.

use crate::config::SummaryConfig;
use crate::error::{SummaryError, SummaryResult};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Built-in report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneralSection {
    ExperimentInfo,
    Evaluation,
    Model,
    SubgroupEvaluation,
    IntermediateFilePaths,
    Sysinfo,
}

impl GeneralSection {
    /// Every general section, in default report order.
    pub const ALL: [GeneralSection; 6] = [
        GeneralSection::ExperimentInfo,
        GeneralSection::Evaluation,
        GeneralSection::Model,
        GeneralSection::SubgroupEvaluation,
        GeneralSection::IntermediateFilePaths,
        GeneralSection::Sysinfo,
    ];

    /// Name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            GeneralSection::ExperimentInfo => "experiment_info",
            GeneralSection::Evaluation => "evaluation",
            GeneralSection::Model => "model",
            GeneralSection::SubgroupEvaluation => "subgroup_evaluation",
            GeneralSection::IntermediateFilePaths => "intermediate_file_paths",
            GeneralSection::Sysinfo => "sysinfo",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GeneralSection::ExperimentInfo => "Experiments",
            GeneralSection::Evaluation => "Evaluation Results",
            GeneralSection::Model => "Model Comparison",
            GeneralSection::SubgroupEvaluation => "Subgroup Evaluation",
            GeneralSection::IntermediateFilePaths => "Intermediate Files",
            GeneralSection::Sysinfo => "System Information",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for GeneralSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A section of the rendered report.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    General(GeneralSection),
    /// A user-supplied HTML fragment.
    Custom { name: String, content: String },
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Section::General(section) => section.name(),
            Section::Custom { name, .. } => name,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Section::General(section) => section.title().to_string(),
            Section::Custom { name, .. } => name.replace('_', " "),
        }
    }

    /// HTML anchor for the table of contents.
    pub fn anchor(&self) -> String {
        self.name().replace(['_', ' ', '.'], "-").to_lowercase()
    }
}

/// Work out the ordered list of sections for a configuration.
///
/// Custom section files are read here so a missing file is reported
/// before any experiment is touched.
pub fn resolve_sections(config: &SummaryConfig) -> SummaryResult<Vec<Section>> {
    let mut sections = Vec::new();

    for general in general_sections(config)? {
        sections.push(Section::General(general));
    }

    if let Some(ref special) = config.special_sections {
        if let Some(name) = special.iter().find(|s| !s.is_empty()) {
            return Err(SummaryError::InvalidSection(format!(
                "special section '{}' is not available",
                name
            )));
        }
    }

    for path in config.custom_sections.iter().flatten() {
        let section = load_custom_section(&config.resolve_path(path))?;
        if sections.iter().any(|s| s.name() == section.name()) {
            return Err(SummaryError::InvalidSection(format!(
                "custom section '{}' has the same name as another section",
                section.name()
            )));
        }
        sections.push(section);
    }

    if let Some(ref order) = config.section_order {
        sections = apply_order(sections, order)?;
    }

    debug!(
        "Report sections: {}",
        sections
            .iter()
            .map(Section::name)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(sections)
}

fn general_sections(config: &SummaryConfig) -> SummaryResult<Vec<GeneralSection>> {
    let names = &config.general_sections;
    let mut chosen: Vec<GeneralSection> = if names.iter().any(|n| n == "all") {
        GeneralSection::ALL.to_vec()
    } else {
        let mut chosen = Vec::new();
        for name in names {
            let section = GeneralSection::from_name(name).ok_or_else(|| {
                SummaryError::InvalidSection(format!(
                    "'{}' is not a valid general section; choose from: {}",
                    name,
                    GeneralSection::ALL
                        .iter()
                        .map(GeneralSection::name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
            if !chosen.contains(&section) {
                chosen.push(section);
            }
        }
        chosen
    };

    if config.subgroups.is_empty() && chosen.contains(&GeneralSection::SubgroupEvaluation) {
        warn!("No subgroups specified; dropping the subgroup_evaluation section");
        chosen.retain(|s| *s != GeneralSection::SubgroupEvaluation);
    }

    Ok(chosen)
}

fn load_custom_section(path: &Path) -> SummaryResult<Section> {
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"));
    if !is_html {
        return Err(SummaryError::InvalidSection(format!(
            "custom section {} must be an .html file",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(SummaryError::InvalidSection(format!(
            "custom section file {} was not found",
            path.display()
        )));
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let content = std::fs::read_to_string(path)?;

    Ok(Section::Custom { name, content })
}

/// Reorder sections; `order` must name every chosen section exactly once.
fn apply_order(sections: Vec<Section>, order: &[String]) -> SummaryResult<Vec<Section>> {
    let missing: Vec<&str> = sections
        .iter()
        .map(Section::name)
        .filter(|name| !order.iter().any(|o| o == name))
        .collect();
    if !missing.is_empty() {
        return Err(SummaryError::InvalidSection(format!(
            "section_order is missing: {}",
            missing.join(", ")
        )));
    }

    let mut remaining = sections;
    let mut ordered = Vec::with_capacity(remaining.len());
    for name in order {
        match remaining.iter().position(|s| s.name() == name) {
            Some(index) => ordered.push(remaining.remove(index)),
            None => {
                return Err(SummaryError::InvalidSection(format!(
                    "section_order lists '{}', which is not a chosen section or is repeated",
                    name
                )))
            }
        }
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(value: Value, dir: PathBuf) -> SummaryConfig {
        match value {
            Value::Object(map) => SummaryConfig::from_map(map, dir).unwrap(),
            _ => unreachable!(),
        }
    }

    fn names(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(Section::name).collect()
    }

    #[test]
    fn test_all_without_subgroups() {
        let config = config(
            json!({"summary_id": "s", "experiment_dirs": ["a"]}),
            PathBuf::new(),
        );
        let sections = resolve_sections(&config).unwrap();
        assert_eq!(
            names(&sections),
            vec![
                "experiment_info",
                "evaluation",
                "model",
                "intermediate_file_paths",
                "sysinfo"
            ]
        );
    }

    #[test]
    fn test_all_with_subgroups() {
        let config = config(
            json!({"summary_id": "s", "experiment_dirs": ["a"], "subgroups": ["L1"]}),
            PathBuf::new(),
        );
        let sections = resolve_sections(&config).unwrap();
        assert!(names(&sections).contains(&"subgroup_evaluation"));
    }

    #[test]
    fn test_unknown_general_section() {
        let config = config(
            json!({"summary_id": "s", "experiment_dirs": ["a"], "general_sections": ["evaluation", "bogus"]}),
            PathBuf::new(),
        );
        let err = resolve_sections(&config).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_special_sections_unavailable() {
        let config = config(
            json!({"summary_id": "s", "experiment_dirs": ["a"], "special_sections": ["extra"]}),
            PathBuf::new(),
        );
        assert!(resolve_sections(&config).is_err());
    }

    #[test]
    fn test_custom_section_and_order() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.html"), "<p>Notes</p>").unwrap();

        let config = config(
            json!({
                "summary_id": "s",
                "experiment_dirs": ["a"],
                "general_sections": ["evaluation", "model"],
                "custom_sections": ["notes.html"],
                "section_order": ["notes", "model", "evaluation"]
            }),
            temp_dir.path().to_path_buf(),
        );

        let sections = resolve_sections(&config).unwrap();
        assert_eq!(names(&sections), vec!["notes", "model", "evaluation"]);
        assert_eq!(
            sections[0],
            Section::Custom {
                name: "notes".to_string(),
                content: "<p>Notes</p>".to_string()
            }
        );
    }

    #[test]
    fn test_custom_section_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(
            json!({"summary_id": "s", "experiment_dirs": ["a"], "custom_sections": ["missing.html"]}),
            temp_dir.path().to_path_buf(),
        );
        assert!(resolve_sections(&config).is_err());
    }

    #[test]
    fn test_incomplete_section_order() {
        let config = config(
            json!({
                "summary_id": "s",
                "experiment_dirs": ["a"],
                "general_sections": ["evaluation", "model"],
                "section_order": ["model"]
            }),
            PathBuf::new(),
        );
        let err = resolve_sections(&config).unwrap_err();
        assert!(err.to_string().contains("missing: evaluation"));
    }

    #[test]
    fn test_section_order_with_extra_name() {
        let config = config(
            json!({
                "summary_id": "s",
                "experiment_dirs": ["a"],
                "general_sections": ["evaluation"],
                "section_order": ["evaluation", "sysinfo"]
            }),
            PathBuf::new(),
        );
        assert!(resolve_sections(&config).is_err());
    }

    #[test]
    fn test_anchor() {
        assert_eq!(
            Section::General(GeneralSection::IntermediateFilePaths).anchor(),
            "intermediate-file-paths"
        );
    }
}
