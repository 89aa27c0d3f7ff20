//! A Unity project opened for map editing.
//!
//! Layout on disk:
//! - `<root>/map-editor-settings.json`: `ProjectSettings`
//! - `<root>/Assets/**.png`: texture palette (with optional `.meta` sidecars)
//! - `<root>/Assets/<exportDir>/<map>.json`: one `MapDocument` per map

mod assets;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mapsmith_engine::coords::Vector2;

use crate::error::{ProjectError, ProjectResult};
use crate::map::{Map, MapDocument, MapId};
use crate::texture::{self, Texture, TextureCache};

pub use assets::scan_png_assets;
pub use settings::{ProjectSettings, SettingsFile, SETTINGS_FILE_NAME};

/// Asset subdirectories named by the settings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AssetDir {
    Sprites,
    Prefabs,
    MapExports,
}

#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    name: String,
    settings: SettingsFile,
    maps: Vec<Map>,
    next_map: u64,
    cache: TextureCache,
    /// Palette, in scan order.
    textures: Vec<Rc<Texture>>,
    textures_loaded: bool,
}

impl Project {
    /// Opens the project at `root`: loads settings and every map document
    /// in the export directory (created if missing). Textures are scanned
    /// later, by `load_textures`.
    pub fn open(root: impl Into<PathBuf>) -> ProjectResult<Self> {
        let root = root.into();
        let settings = SettingsFile::load(&root)?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let mut project = Self {
            root,
            name,
            settings,
            maps: Vec::new(),
            next_map: 0,
            cache: TextureCache::new(),
            textures: Vec::new(),
            textures_loaded: false,
        };

        let exports = project.asset_path(AssetDir::MapExports);
        if exports.is_dir() {
            let mut documents = Vec::new();
            for entry in fs::read_dir(&exports).map_err(|e| ProjectError::io(&exports, e))? {
                let path = entry.map_err(|e| ProjectError::io(&exports, e))?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    documents.push(path);
                }
            }
            documents.sort();

            for path in documents {
                let doc = MapDocument::read(&path)?;
                let name = file_stem(&path);
                let id = project.allocate_map_id();
                project.maps.push(Map::new(id, name, path, doc.size));
            }
        } else {
            fs::create_dir_all(&exports).map_err(|e| ProjectError::io(&exports, e))?;
        }

        log::info!(
            "opened project {:?} with {} map(s)",
            project.name,
            project.maps.len()
        );
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ProjectSettings {
        self.settings.settings()
    }

    pub fn update_settings(&mut self, edit: impl FnOnce(&mut ProjectSettings)) -> ProjectResult<bool> {
        self.settings.update(edit)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.settings().pixel_ratio
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("Assets")
    }

    pub fn asset_path(&self, dir: AssetDir) -> PathBuf {
        let settings = self.settings();
        let name = match dir {
            AssetDir::Sprites => &settings.sprite_dir,
            AssetDir::Prefabs => &settings.prefab_dir,
            AssetDir::MapExports => &settings.export_dir,
        };
        self.assets_dir().join(name)
    }

    fn map_file(&self, name: &str) -> PathBuf {
        self.asset_path(AssetDir::MapExports).join(format!("{name}.json"))
    }

    fn allocate_map_id(&mut self) -> MapId {
        let id = MapId(self.next_map);
        self.next_map += 1;
        id
    }

    // ── maps ──────────────────────────────────────────────────────────────

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn maps_mut(&mut self) -> &mut [Map] {
        &mut self.maps
    }

    pub fn map(&self, id: MapId) -> Option<&Map> {
        self.maps.iter().find(|m| m.id() == id)
    }

    pub fn map_mut(&mut self, id: MapId) -> Option<&mut Map> {
        self.maps.iter_mut().find(|m| m.id() == id)
    }

    pub fn map_by_name(&self, name: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.name() == name)
    }

    /// Adds a map named `name`.
    ///
    /// A new document is written with `size`; if the file already exists it
    /// is read instead and its size wins.
    pub fn create_map(&mut self, name: &str, size: Vector2) -> ProjectResult<MapId> {
        validate_map_name(name)?;
        if self.map_by_name(name).is_some() {
            return Err(ProjectError::DuplicateMapName(name.to_string()));
        }

        let path = self.map_file(name);
        let size = if path.exists() {
            MapDocument::read(&path)?.size
        } else {
            let doc = MapDocument {
                name: name.to_string(),
                size,
            };
            doc.write(&path)?;
            size
        };

        let id = self.allocate_map_id();
        self.maps.push(Map::new(id, name, path, size));
        log::info!("created map {name:?} ({}x{})", size.x, size.y);
        Ok(id)
    }

    /// Removes a map and deletes its file.
    pub fn remove_map(&mut self, id: MapId) -> ProjectResult<Map> {
        let index = self
            .maps
            .iter()
            .position(|m| m.id() == id)
            .ok_or(ProjectError::UnknownMap(id))?;

        let path = self.maps[index].path().to_path_buf();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| ProjectError::io(&path, e))?;
        }

        let map = self.maps.remove(index);
        log::info!("deleted map {:?}", map.name());
        Ok(map)
    }

    /// Renames and resizes a map, then writes it back.
    ///
    /// An empty `name` keeps the current one. Renaming moves the file; a
    /// file already present under the new name is never replaced. The new
    /// document is written before the map changes, so a failed write leaves
    /// the map as it was.
    pub fn edit_map(&mut self, id: MapId, name: &str, size: Vector2) -> ProjectResult<()> {
        let current = self.map(id).ok_or(ProjectError::UnknownMap(id))?;
        let from = current.path().to_path_buf();

        let rename = (!name.is_empty() && name != current.name()).then(|| name.to_string());
        let target = match &rename {
            Some(name) => {
                validate_map_name(name)?;
                let to = self.map_file(name);
                if self.map_by_name(name).is_some() || to.exists() {
                    return Err(ProjectError::DuplicateMapName(name.clone()));
                }
                to
            }
            None => from.clone(),
        };

        let doc = MapDocument {
            name: rename.clone().unwrap_or_else(|| current.name().to_string()),
            size,
        };
        doc.write(&target)?;

        let map = self.map_mut(id).ok_or(ProjectError::UnknownMap(id))?;
        map.set_size(size);
        if let Some(name) = rename {
            log::info!("renamed map {:?} to {name:?}", map.name());
            map.set_name_and_path(name, target);
            if let Err(e) = fs::remove_file(&from) {
                log::warn!("failed to remove old map file {}: {e}", from.display());
            }
        }
        Ok(())
    }

    /// Copies a map's size into a new map named `<name>-<n>`, `n` being the
    /// first free number from 1.
    pub fn clone_map(&mut self, id: MapId) -> ProjectResult<MapId> {
        let source = self.map(id).ok_or(ProjectError::UnknownMap(id))?;
        let (base, size) = (source.name().to_string(), source.size());

        let name = (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| self.map_by_name(candidate).is_none())
            .ok_or_else(|| ProjectError::InvalidMapName(base.clone()))?;

        self.create_map(&name, size)
    }

    // ── textures ──────────────────────────────────────────────────────────

    pub fn textures(&self) -> &[Rc<Texture>] {
        &self.textures
    }

    pub fn textures_loaded(&self) -> bool {
        self.textures_loaded
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.cache
    }

    /// Scans `Assets` and decodes every texture, once per project.
    ///
    /// On failure the palette stays empty and a later call retries.
    pub fn load_textures(&mut self) -> ProjectResult<()> {
        if self.textures_loaded {
            return Ok(());
        }

        let paths = scan_png_assets(&self.assets_dir(), &self.settings().ignore_asset_dirs)?;
        let textures: Vec<Rc<Texture>> = paths.iter().map(|p| self.cache.get(p)).collect();
        texture::decode_all(&textures)?;

        log::info!("loaded {} texture(s) for {:?}", textures.len(), self.name);
        self.textures.extend(textures);
        self.textures_loaded = true;
        Ok(())
    }

    /// Appends an in-memory texture to the palette.
    pub fn add_texture(&mut self, texture: Texture) -> Rc<Texture> {
        let texture = self.cache.insert(texture);
        self.textures.push(texture.clone());
        texture
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn validate_map_name(name: &str) -> ProjectResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\') || c.is_control());
    if invalid {
        Err(ProjectError::InvalidMapName(name.to_string()))
    } else {
        Ok(())
    }
}
