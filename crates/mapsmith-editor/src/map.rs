use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use mapsmith_engine::coords::Vector2;
use mapsmith_engine::render::RenderCtx;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, ProjectResult};
use crate::layer::Layer;
use crate::map_renderer::{MapRenderer, MapScene};
use crate::object::{GameObject, ObjectId, ObjectKind};
use crate::texture::Texture;

/// Project-unique map handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MapId(pub(crate) u64);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

pub const DEFAULT_MAP_SIZE: Vector2 = Vector2::new(640.0, 480.0);

/// On-disk form of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    pub name: String,
    pub size: Vector2,
}

impl MapDocument {
    pub fn read(path: &Path) -> ProjectResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| ProjectError::json(path, e))
    }

    pub fn write(&self, path: &Path) -> ProjectResult<()> {
        let text = serde_json::to_string(self).map_err(|e| ProjectError::json(path, e))?;
        fs::write(path, text).map_err(|e| ProjectError::io(path, e))
    }
}

/// A level: layers of placed objects plus view state.
///
/// Always holds at least one layer and `active_layer` is always a valid
/// index. The selection refers to an object on any layer; hit-testing only
/// considers the active one.
#[derive(Debug)]
pub struct Map {
    id: MapId,
    name: String,
    path: PathBuf,
    size: Vector2,
    offset: Vector2,
    layers: Vec<Layer>,
    active_layer: usize,
    selected: Option<ObjectId>,
    next_object: u64,
    renderer: MapRenderer,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>, path: impl Into<PathBuf>, size: Vector2) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            size,
            offset: Vector2::zero(),
            layers: vec![Layer::new()],
            active_layer: 0,
            selected: None,
            next_object: 0,
            renderer: MapRenderer::new(),
        }
    }

    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_name_and_path(&mut self, name: String, path: PathBuf) {
        self.name = name;
        self.path = path;
    }

    pub fn document(&self) -> MapDocument {
        MapDocument {
            name: self.name.clone(),
            size: self.size,
        }
    }

    pub fn size(&self) -> Vector2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vector2) {
        self.size = size;
    }

    /// Pan offset in world units.
    pub fn offset(&self) -> Vector2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vector2) {
        self.offset = offset;
    }

    pub fn zoom(&self) -> f32 {
        self.renderer.zoom()
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.renderer.set_zoom(zoom);
    }

    pub fn renderer_mut(&mut self) -> &mut MapRenderer {
        &mut self.renderer
    }

    // ── layers ────────────────────────────────────────────────────────────

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn active_layer_index(&self) -> usize {
        self.active_layer
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active_layer]
    }

    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index < self.layers.len() {
            self.active_layer = index;
            true
        } else {
            false
        }
    }

    /// Appends an empty layer and makes it active.
    pub fn add_layer(&mut self) -> usize {
        self.layers.push(Layer::new());
        self.active_layer = self.layers.len() - 1;
        self.active_layer
    }

    /// Removes layer `index` unless it is the last one left.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if self.layers.len() <= 1 || index >= self.layers.len() {
            return false;
        }

        let removed = self.layers.remove(index);
        if let Some(id) = self.selected
            && removed.object(id).is_some()
        {
            self.selected = None;
        }
        self.active_layer = self.active_layer.min(self.layers.len() - 1);
        true
    }

    /// Sets the background texture of the active layer.
    pub fn set_background(&mut self, texture: Option<Rc<Texture>>) {
        self.layers[self.active_layer].set_background(texture);
    }

    // ── objects ───────────────────────────────────────────────────────────

    /// Places a new object on the active layer.
    pub fn add_object(
        &mut self,
        kind: ObjectKind,
        texture: Option<Rc<Texture>>,
        position: Vector2,
    ) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.layers[self.active_layer].add(id, kind, texture, position);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.layers.iter().find_map(|l| l.object(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.layers.iter_mut().find_map(|l| l.object_mut(id))
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let removed = self.layers.iter_mut().find_map(|l| l.remove(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(removed)
    }

    /// Moves an object to another free order slot of its layer.
    pub fn set_object_layer_index(&mut self, id: ObjectId, index: u32) -> bool {
        self.layers
            .iter_mut()
            .find(|l| l.object(id).is_some())
            .is_some_and(|l| l.set_object_layer_index(id, index))
    }

    // ── selection ─────────────────────────────────────────────────────────

    pub fn selected_id(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&GameObject> {
        self.selected.and_then(|id| self.object(id))
    }

    pub fn selected_object_mut(&mut self) -> Option<&mut GameObject> {
        let id = self.selected?;
        self.object_mut(id)
    }

    pub fn set_selected(&mut self, id: Option<ObjectId>) {
        self.selected = id.filter(|id| self.object(*id).is_some());
    }

    /// Selects the first object of the active layer containing `point`
    /// (in map space), or clears the selection when none does.
    pub fn select_object(&mut self, point: Vector2) -> Option<ObjectId> {
        self.selected = self.active_layer().first_at(point).map(GameObject::id);
        self.selected
    }

    /// Records one frame of this map.
    pub fn render(&mut self, ctx: &mut RenderCtx<'_>) -> Result<()> {
        let selected = self
            .selected
            .and_then(|id| self.layers.iter().find_map(|l| l.object(id)));
        let scene = MapScene {
            size: self.size,
            offset: self.offset,
            layers: &self.layers,
            selected,
        };
        self.renderer.render(ctx, &scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn map() -> Map {
        Map::new(MapId(0), "level", "level.json", DEFAULT_MAP_SIZE)
    }

    fn sprite(size: u32) -> Option<Rc<Texture>> {
        Some(Rc::new(Texture::from_image("s", RgbaImage::new(size, size))))
    }

    // ── hit-testing ───────────────────────────────────────────────────────

    #[test]
    fn select_inside_and_outside_extent() {
        let mut map = map();
        let id = map.add_object(ObjectKind::Sprite, sprite(16), Vector2::new(100.0, 100.0));

        assert_eq!(map.select_object(Vector2::new(105.0, 103.0)), Some(id));
        assert_eq!(map.select_object(Vector2::new(110.0, 100.0)), None);
        assert_eq!(map.selected_id(), None);
    }

    #[test]
    fn first_inserted_wins_over_later_overlap() {
        let mut map = map();
        let first = map.add_object(ObjectKind::Sprite, sprite(16), Vector2::zero());
        map.add_object(ObjectKind::Platform, sprite(16), Vector2::new(4.0, 0.0));

        assert_eq!(map.select_object(Vector2::new(3.0, 0.0)), Some(first));
    }

    #[test]
    fn only_the_active_layer_is_hit() {
        let mut map = map();
        map.add_object(ObjectKind::Sprite, sprite(16), Vector2::zero());
        map.add_layer();

        assert_eq!(map.select_object(Vector2::zero()), None);
        map.set_active_layer(0);
        assert!(map.select_object(Vector2::zero()).is_some());
    }

    // ── layers ────────────────────────────────────────────────────────────

    #[test]
    fn last_layer_cannot_be_removed() {
        let mut map = map();
        assert!(!map.remove_layer(0));
        assert_eq!(map.layers().len(), 1);
    }

    #[test]
    fn removing_clamps_the_active_layer() {
        let mut map = map();
        map.add_layer();
        map.add_layer();
        assert_eq!(map.active_layer_index(), 2);

        assert!(map.remove_layer(2));
        assert_eq!(map.active_layer_index(), 1);
        assert!(!map.remove_layer(5));
        assert!(!map.set_active_layer(2));
    }

    #[test]
    fn removing_a_layer_drops_its_selection() {
        let mut map = map();
        map.add_layer();
        let id = map.add_object(ObjectKind::Sprite, None, Vector2::zero());
        map.set_selected(Some(id));

        map.remove_layer(1);
        assert_eq!(map.selected_id(), None);
    }

    // ── objects ───────────────────────────────────────────────────────────

    #[test]
    fn removing_the_selection_clears_it() {
        let mut map = map();
        let id = map.add_object(ObjectKind::Sprite, None, Vector2::zero());
        map.set_selected(Some(id));

        assert!(map.remove_object(id).is_some());
        assert!(map.selected_object().is_none());
        assert!(map.object(id).is_none());
    }

    #[test]
    fn unknown_ids_are_not_selected() {
        let mut map = map();
        map.set_selected(Some(ObjectId(42)));
        assert_eq!(map.selected_id(), None);
    }

    #[test]
    fn layer_index_moves_within_owning_layer() {
        let mut map = map();
        let a = map.add_object(ObjectKind::Sprite, None, Vector2::zero());
        let b = map.add_object(ObjectKind::Sprite, None, Vector2::zero());

        assert!(!map.set_object_layer_index(a, 1));
        assert!(map.set_object_layer_index(a, 3));
        assert_eq!(map.object(a).map(GameObject::layer_index), Some(3));
        assert_eq!(map.object(b).map(GameObject::layer_index), Some(1));
    }

    // ── persistence ───────────────────────────────────────────────────────

    #[test]
    fn document_json_shape() {
        let doc = map().document();
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "level", "size": { "x": 640.0, "y": 480.0 } })
        );
    }

    #[test]
    fn document_reads_integer_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cave.json");
        fs::write(&path, r#"{"name":"cave","size":{"x":320,"y":200}}"#).unwrap();

        let doc = MapDocument::read(&path).unwrap();
        assert_eq!(doc.size, Vector2::new(320.0, 200.0));
    }

    #[test]
    fn malformed_document_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();

        match MapDocument::read(&path) {
            Err(ProjectError::Json { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected a JSON error, got {other:?}"),
        }
    }
}
