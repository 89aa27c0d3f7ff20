use std::rc::Rc;

use mapsmith_engine::coords::Vector2;

use crate::object::{GameObject, ObjectId, ObjectKind};
use crate::texture::Texture;

/// Ordered objects plus an optional background texture.
///
/// Objects draw in insertion order. Independently of that, every object
/// owns one slot of an order table (`layer_index`); new objects take the
/// slot after the highest occupied one.
#[derive(Debug, Default)]
pub struct Layer {
    objects: Vec<GameObject>,
    slots: Vec<Option<ObjectId>>,
    background: Option<Rc<Texture>>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    /// First object, in insertion order, whose bounds contain `point`.
    pub fn first_at(&self, point: Vector2) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.contains(point))
    }

    /// Occupant of order slot `index`.
    pub fn slot(&self, index: u32) -> Option<ObjectId> {
        self.slots.get(index as usize).copied().flatten()
    }

    fn next_slot(&self) -> u32 {
        self.slots
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |last| last as u32 + 1)
    }

    pub(crate) fn add(
        &mut self,
        id: ObjectId,
        kind: ObjectKind,
        texture: Option<Rc<Texture>>,
        position: Vector2,
    ) -> &mut GameObject {
        let index = self.next_slot();
        self.occupy(index, id);
        self.objects
            .push(GameObject::new(id, kind, texture, position, index));
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<GameObject> {
        let at = self.objects.iter().position(|o| o.id() == id)?;
        let object = self.objects.remove(at);
        if let Some(slot) = self.slots.get_mut(object.layer_index() as usize) {
            *slot = None;
        }
        Some(object)
    }

    /// Moves `id` to order slot `to` if that slot is free.
    pub(crate) fn set_object_layer_index(&mut self, id: ObjectId, to: u32) -> bool {
        if self.slot(to).is_some() {
            return false;
        }
        let Some(object) = self.objects.iter_mut().find(|o| o.id() == id) else {
            return false;
        };

        let from = object.layer_index();
        object.set_layer_index(to);
        if let Some(slot) = self.slots.get_mut(from as usize) {
            *slot = None;
        }
        self.occupy(to, id);
        true
    }

    fn occupy(&mut self, index: u32, id: ObjectId) {
        let index = index as usize;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(id);
    }

    pub fn background(&self) -> Option<&Rc<Texture>> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, texture: Option<Rc<Texture>>) {
        self.background = texture;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with(n: u64) -> Layer {
        let mut layer = Layer::new();
        for i in 0..n {
            layer.add(ObjectId(i), ObjectKind::Sprite, None, Vector2::new(i as f32 * 100.0, 0.0));
        }
        layer
    }

    #[test]
    fn new_objects_take_consecutive_slots() {
        let layer = layer_with(3);
        let indices: Vec<u32> = layer.objects().iter().map(GameObject::layer_index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(layer.slot(2), Some(ObjectId(2)));
    }

    #[test]
    fn promote_into_free_slot() {
        let mut layer = layer_with(2);

        assert!(layer.set_object_layer_index(ObjectId(0), 5));
        assert_eq!(layer.slot(0), None);
        assert_eq!(layer.slot(5), Some(ObjectId(0)));
        assert_eq!(layer.object(ObjectId(0)).unwrap().layer_index(), 5);

        // Next object lands after the highest occupied slot.
        let o = layer.add(ObjectId(9), ObjectKind::Sprite, None, Vector2::zero());
        assert_eq!(o.layer_index(), 6);
    }

    #[test]
    fn occupied_slot_is_refused() {
        let mut layer = layer_with(2);
        assert!(!layer.set_object_layer_index(ObjectId(0), 1));
        assert!(!layer.set_object_layer_index(ObjectId(0), 0));
        assert_eq!(layer.slot(1), Some(ObjectId(1)));
    }

    #[test]
    fn demoting_the_last_object_frees_the_top() {
        let mut layer = layer_with(3);
        layer.remove(ObjectId(1));
        assert!(layer.set_object_layer_index(ObjectId(2), 1));

        let o = layer.add(ObjectId(7), ObjectKind::Sprite, None, Vector2::zero());
        assert_eq!(o.layer_index(), 2);
    }

    #[test]
    fn first_match_wins() {
        let mut layer = Layer::new();
        layer.add(ObjectId(0), ObjectKind::Sprite, None, Vector2::zero());
        layer.add(ObjectId(1), ObjectKind::Sprite, None, Vector2::new(2.0, 0.0));

        assert_eq!(layer.first_at(Vector2::new(1.0, 0.0)).map(GameObject::id), Some(ObjectId(0)));
        assert_eq!(layer.first_at(Vector2::new(5.0, 0.0)).map(GameObject::id), Some(ObjectId(1)));
        assert!(layer.first_at(Vector2::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut layer = layer_with(2);
        let removed = layer.remove(ObjectId(1)).unwrap();
        assert_eq!(removed.layer_index(), 1);
        assert_eq!(layer.slot(1), None);
        assert_eq!(layer.len(), 1);
        assert!(layer.remove(ObjectId(1)).is_none());
    }
}
