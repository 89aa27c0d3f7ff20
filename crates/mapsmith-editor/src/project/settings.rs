use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProjectError, ProjectResult};

/// Settings file name, at the project root.
pub const SETTINGS_FILE_NAME: &str = "map-editor-settings.json";

/// Per-project editor settings. Directory names are relative to `Assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub sprite_dir: String,
    pub prefab_dir: String,
    pub export_dir: String,
    /// File or directory names skipped by the asset scan.
    pub ignore_asset_dirs: Vec<String>,
    /// Screen pixels per world unit at zoom 1.
    pub pixel_ratio: f32,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            sprite_dir: "Sprites".into(),
            prefab_dir: "Prefabs".into(),
            export_dir: "MapExports".into(),
            ignore_asset_dirs: vec!["TextMesh Pro".into()],
            pixel_ratio: 4.0,
        }
    }
}

/// `ProjectSettings` bound to their JSON file.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    settings: ProjectSettings,
}

impl SettingsFile {
    /// Loads the settings of the project at `root`.
    ///
    /// A missing file is created with defaults. Keys missing from an
    /// existing file are filled from the defaults and the file is rewritten.
    pub fn load(root: &Path) -> ProjectResult<Self> {
        let path = root.join(SETTINGS_FILE_NAME);

        if !path.exists() {
            let file = Self {
                path,
                settings: ProjectSettings::default(),
            };
            file.save()?;
            log::info!("created {}", file.path.display());
            return Ok(file);
        }

        let text = fs::read_to_string(&path).map_err(|e| ProjectError::io(&path, e))?;
        let mut value: Value = serde_json::from_str(&text).map_err(|e| ProjectError::json(&path, e))?;

        let merged = merge_defaults(&mut value).map_err(|e| ProjectError::json(&path, e))?;
        let settings = serde_json::from_value(value).map_err(|e| ProjectError::json(&path, e))?;

        let file = Self { path, settings };
        if merged {
            log::info!("added missing default settings to {}", file.path.display());
            file.save()?;
        }
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Applies `edit` and saves if anything changed. Returns whether it did.
    pub fn update(&mut self, edit: impl FnOnce(&mut ProjectSettings)) -> ProjectResult<bool> {
        let mut next = self.settings.clone();
        edit(&mut next);
        if next == self.settings {
            return Ok(false);
        }
        self.settings = next;
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> ProjectResult<()> {
        let text = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| ProjectError::json(&self.path, e))?;
        fs::write(&self.path, text).map_err(|e| ProjectError::io(&self.path, e))
    }
}

/// Inserts default values for absent keys. Returns whether any were added.
fn merge_defaults(value: &mut Value) -> Result<bool, serde_json::Error> {
    let Value::Object(defaults) = serde_json::to_value(ProjectSettings::default())? else {
        return Ok(false);
    };
    let Value::Object(current) = value else {
        // Not an object: let deserialization report the shape error.
        return Ok(false);
    };

    let mut merged = false;
    for (key, default) in defaults {
        if !current.contains_key(&key) {
            current.insert(key, default);
            merged = true;
        }
    }
    Ok(merged)
}
