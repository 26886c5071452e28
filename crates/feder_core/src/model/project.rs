//! Project sidecar record (`project_metadata.json`).

use crate::model::persona::Persona;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File name of the project sidecar in the project root.
pub const PROJECT_METADATA_FILE: &str = "project_metadata.json";
/// Folder used for figures when the project does not name one.
pub const DEFAULT_FIGURES_FOLDER: &str = "figures";

/// Horizontal alignment of figure captions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionAlignment {
    #[default]
    Center,
    Justify,
}

/// Persistent per-project settings.
///
/// `mode` selects templates and metadata schema for new documents only;
/// changing it never rewrites existing documents. Keys this version does not
/// know about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    #[serde(default = "untitled_project_name")]
    pub name: String,
    #[serde(default)]
    pub mode: Persona,
    #[serde(default)]
    pub live_preview: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_alignment: Option<CaptionAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figures_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bib_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_order: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn untitled_project_name() -> String {
    "Untitled Project".to_string()
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self::new(untitled_project_name(), Persona::default())
    }
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>, mode: Persona) -> Self {
        Self {
            name: name.into(),
            mode,
            live_preview: false,
            caption_alignment: None,
            figures_folder: None,
            bib_file: None,
            explorer_state: None,
            explorer_order: None,
            ai_config: None,
            extra: Map::new(),
        }
    }

    /// Bibliography path relative to the project root.
    pub fn bib_file_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.bib_file
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(fallback)
    }

    pub fn figures_folder(&self) -> &str {
        self.figures_folder
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_FIGURES_FOLDER)
    }

    /// Pretty JSON for the sidecar file.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptionAlignment, ProjectMetadata};
    use crate::model::persona::Persona;

    #[test]
    fn minimal_sidecar_fills_defaults() {
        let meta: ProjectMetadata =
            serde_json::from_str(r#"{"name":"Thesis","mode":"scholar"}"#).unwrap();
        assert_eq!(meta.name, "Thesis");
        assert_eq!(meta.mode, Persona::Scholar);
        assert!(!meta.live_preview);
        assert_eq!(meta.bib_file_or("references.bib"), "references.bib");
        assert_eq!(meta.figures_folder(), "figures");
    }

    #[test]
    fn sidecar_round_trip_keeps_unknown_keys_and_camel_case() {
        let source = r#"{"name":"P","mode":"engineer","livePreview":true,"captionAlignment":"justify","bibFile":"lib.bib","theme":"dark"}"#;
        let meta: ProjectMetadata = serde_json::from_str(source).unwrap();
        assert_eq!(meta.caption_alignment, Some(CaptionAlignment::Justify));
        assert_eq!(meta.extra["theme"], "dark");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["livePreview"], true);
        assert_eq!(json["bibFile"], "lib.bib");
        assert_eq!(json["theme"], "dark");
        assert!(json.get("aiConfig").is_none());
    }
}
