use std::fmt;
use std::rc::Rc;

use mapsmith_engine::coords::{Rect, Vector2};

use crate::texture::Texture;

/// Map-unique object handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(pub(crate) u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a placed object stands for in the game.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    /// Decoration drawn from a texture.
    #[default]
    Sprite,
    /// Solid ground the player can stand on.
    Platform,
}

/// Size of an object that has no texture.
pub const DEFAULT_OBJECT_SIZE: Vector2 = Vector2::new(8.0, 8.0);

/// An object placed on a layer.
///
/// `position` is the object's center in world units. `layer_index` is its
/// slot in the owning layer's order table.
#[derive(Debug, Clone)]
pub struct GameObject {
    id: ObjectId,
    name: String,
    kind: ObjectKind,
    position: Vector2,
    layer_index: u32,
    texture: Option<Rc<Texture>>,
}

impl GameObject {
    pub(crate) fn new(
        id: ObjectId,
        kind: ObjectKind,
        texture: Option<Rc<Texture>>,
        position: Vector2,
        layer_index: u32,
    ) -> Self {
        let name = texture
            .as_deref()
            .map_or_else(|| "Game Object".to_string(), |t| t.name().to_string());
        Self {
            id,
            name,
            kind,
            position,
            layer_index,
            texture,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
    }

    pub fn layer_index(&self) -> u32 {
        self.layer_index
    }

    pub(crate) fn set_layer_index(&mut self, index: u32) {
        self.layer_index = index;
    }

    pub fn texture(&self) -> Option<&Rc<Texture>> {
        self.texture.as_ref()
    }

    /// Texture size, or `DEFAULT_OBJECT_SIZE` without one.
    pub fn size(&self) -> Vector2 {
        self.texture
            .as_deref()
            .and_then(Texture::size)
            .unwrap_or(DEFAULT_OBJECT_SIZE)
    }

    pub fn extent(&self) -> Vector2 {
        self.size() / 2.0
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center_extent(self.position, self.extent())
    }

    /// Closed hit test against `bounds`.
    pub fn contains(&self, point: Vector2) -> bool {
        self.bounds().contains(point)
    }
}
