//! Input controller: screen→map conversion, the drag state machine, zoom,
//! and open-map management.
//!
//! Every handler mutates state and then redraws (`render`) itself.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use mapsmith_engine::coords::{Rect, Vector2};
use mapsmith_engine::input::{InputEvent, Key, KeyState, MouseButton, MouseButtonState};
use mapsmith_engine::render::GpuContext;
use mapsmith_engine::time::Timer;

use crate::canvas::CanvasRenderer;
use crate::error::{ProjectError, ProjectResult};
use crate::map::{Map, MapId};
use crate::object::{ObjectId, ObjectKind};
use crate::project::Project;

/// How long after a release the following click still counts as the end of
/// a drag.
pub const CLICK_DEBOUNCE: Duration = Duration::from_millis(120);

/// Half side of the square (world units) the pointer may wander in before a
/// press stops being a click.
pub const DRAG_THRESHOLD: f32 = 2.0;

pub const ZOOM_STEP_PERCENT: f32 = 8.0;
pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 5.0;

/// Next zoom after one wheel notch.
///
/// `delta_y` follows the browser convention: positive scrolls toward the
/// user and zooms out. Only its sign matters.
pub fn zoom_step(zoom: f32, delta_y: f32) -> f32 {
    let sign = if delta_y > 0.0 {
        1.0
    } else if delta_y < 0.0 {
        -1.0
    } else {
        0.0
    };
    let delta = ZOOM_STEP_PERCENT * -zoom * sign / 100.0;
    (zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DragKind {
    MoveObject,
    PanMap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DragPhase {
    Idle,
    /// A button is down but the pointer has not left the threshold square.
    PotentialClick,
    Dragging(DragKind),
}

/// Transient pointer state; reset on every release.
#[derive(Debug, Default)]
struct DragState {
    mouse_down_pos: Option<Vector2>,
    start_pos: Vector2,
    start_offset: Vector2,
    button: Option<MouseButton>,
    /// Set once the pointer leaves the threshold square. Cleared by the
    /// debounce timer or by the click it swallows.
    moved: bool,
}

impl DragState {
    fn release(&mut self) {
        self.mouse_down_pos = None;
        self.button = None;
        self.start_pos = Vector2::zero();
        self.start_offset = Vector2::zero();
    }
}

pub struct Editor<G: GpuContext> {
    project: Option<Project>,
    canvas: CanvasRenderer<G>,
    open_maps: Vec<MapId>,
    active_map: Option<MapId>,
    /// Armed palette texture index.
    palette: Option<usize>,
    drag: DragState,
    click_reset: Timer,
}

impl<G: GpuContext> Default for Editor<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GpuContext> Editor<G> {
    pub fn new() -> Self {
        Self {
            project: None,
            canvas: CanvasRenderer::new(),
            open_maps: Vec::new(),
            active_map: None,
            palette: None,
            drag: DragState::default(),
            click_reset: Timer::new(CLICK_DEBOUNCE),
        }
    }

    // ── canvas lifecycle ──────────────────────────────────────────────────

    pub fn canvas(&self) -> &CanvasRenderer<G> {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasRenderer<G> {
        &mut self.canvas
    }

    pub fn mount(&mut self, gpu: G) {
        self.canvas.mount(gpu);
        self.render();
    }

    /// Unmounts the canvas and forgets every GPU handle made on its context.
    ///
    /// Closed maps keep their renderer, so every map of the project is
    /// invalidated, not only the open ones.
    pub fn unmount(&mut self) -> Option<G> {
        let gpu = self.canvas.unmount();
        if let Some(project) = self.project.as_mut() {
            project.texture_cache().unload_all();
            for map in project.maps_mut() {
                map.renderer_mut().invalidate();
            }
        }
        gpu
    }

    /// Canvas rectangle in logical screen pixels changed.
    pub fn resize(&mut self, bounds: Rect) {
        if bounds != self.canvas.bounds() {
            self.canvas.resize(bounds);
            self.render();
        }
    }

    // ── project & maps ────────────────────────────────────────────────────

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }

    fn project_or_err(&mut self) -> ProjectResult<&mut Project> {
        self.project.as_mut().ok_or(ProjectError::NoProject)
    }

    /// Opens the project at `root`, closing everything of the previous one.
    pub fn open_project(&mut self, root: impl Into<PathBuf>) -> ProjectResult<()> {
        let project = Project::open(root)?;
        self.close_project();
        self.project = Some(project);
        self.render();
        Ok(())
    }

    pub fn close_project(&mut self) {
        if let Some(project) = self.project.take() {
            project.texture_cache().unload_all();
            log::info!("closed project {:?}", project.name());
        }
        self.open_maps.clear();
        self.active_map = None;
        self.palette = None;
        self.drag = DragState::default();
        self.click_reset.cancel();
        self.render();
    }

    pub fn open_maps(&self) -> &[MapId] {
        &self.open_maps
    }

    pub fn active_map_id(&self) -> Option<MapId> {
        self.active_map
    }

    pub fn active_map(&self) -> Option<&Map> {
        self.project.as_ref()?.map(self.active_map?)
    }

    pub fn active_map_mut(&mut self) -> Option<&mut Map> {
        let id = self.active_map?;
        self.project.as_mut()?.map_mut(id)
    }

    /// Runs `edit` on the active map, then redraws.
    pub fn edit_active_map<R>(&mut self, edit: impl FnOnce(&mut Map) -> R) -> Option<R> {
        let result = edit(self.active_map_mut()?);
        self.render();
        Some(result)
    }

    /// Screen pixels per world unit at zoom 1.
    pub fn pixel_ratio(&self) -> f32 {
        self.project.as_ref().map_or(1.0, Project::pixel_ratio)
    }

    /// Adds the map to the open list and activates it. The project's
    /// textures are loaded on the first open.
    pub fn open_map(&mut self, id: MapId) -> ProjectResult<()> {
        let project = self.project_or_err()?;
        if project.map(id).is_none() {
            return Err(ProjectError::UnknownMap(id));
        }
        project.load_textures()?;

        if !self.open_maps.contains(&id) {
            self.open_maps.push(id);
        }
        self.active_map = Some(id);
        self.render();
        Ok(())
    }

    /// Activates an already open map.
    pub fn set_active_map(&mut self, id: MapId) -> bool {
        if !self.open_maps.contains(&id) {
            return false;
        }
        if self.active_map != Some(id) {
            self.active_map = Some(id);
            self.drag = DragState::default();
            self.render();
        }
        true
    }

    /// Removes the map from the open list. Closing the active map activates
    /// the one that took its place, or the new last one.
    pub fn close_map(&mut self, id: MapId) -> bool {
        let Some(index) = self.open_maps.iter().position(|m| *m == id) else {
            return false;
        };
        self.open_maps.remove(index);

        if self.active_map == Some(id) {
            self.active_map = self
                .open_maps
                .get(index)
                .or_else(|| self.open_maps.last())
                .copied();
            self.drag = DragState::default();
        }
        self.palette = None;
        self.render();
        true
    }

    pub fn create_map(&mut self, name: &str, size: Vector2) -> ProjectResult<MapId> {
        self.project_or_err()?.create_map(name, size)
    }

    /// Deletes the map from the project, then closes it if open. A failed
    /// delete leaves it open.
    pub fn delete_map(&mut self, id: MapId) -> ProjectResult<()> {
        self.project_or_err()?.remove_map(id)?;
        self.close_map(id);
        Ok(())
    }

    pub fn clone_map(&mut self, id: MapId) -> ProjectResult<MapId> {
        self.project_or_err()?.clone_map(id)
    }

    pub fn edit_map(&mut self, id: MapId, name: &str, size: Vector2) -> ProjectResult<()> {
        self.project_or_err()?.edit_map(id, name, size)?;
        self.render();
        Ok(())
    }

    // ── palette ───────────────────────────────────────────────────────────

    /// Arms (or with `None` disarms) a palette texture for placement.
    pub fn select_texture(&mut self, index: Option<usize>) {
        self.palette = index;
    }

    pub fn palette_selection(&self) -> Option<usize> {
        self.palette
    }

    // ── pointer input ─────────────────────────────────────────────────────

    /// Converts a screen position (logical pixels) to world units: origin at
    /// the canvas center, Y up, scaled by zoom and pixel ratio of the active
    /// map (1 without one).
    pub fn mouse_to_map(&self, screen: Vector2) -> Vector2 {
        let scale = match self.active_map() {
            Some(map) => map.zoom() * self.pixel_ratio(),
            None => 1.0,
        };
        let bounds = self.canvas.bounds();
        let local = screen - bounds.origin - bounds.size / 2.0;
        Vector2::new(local.x, -local.y) / scale
    }

    pub fn drag_phase(&self) -> DragPhase {
        if self.drag.mouse_down_pos.is_none() {
            return DragPhase::Idle;
        }
        match (self.drag.moved, self.drag.button) {
            (true, Some(MouseButton::Left)) => DragPhase::Dragging(DragKind::MoveObject),
            (true, Some(MouseButton::Middle)) => DragPhase::Dragging(DragKind::PanMap),
            _ => DragPhase::PotentialClick,
        }
    }

    pub fn on_mouse_down(&mut self, screen: Vector2, button: MouseButton, _now: Instant) {
        self.drag.moved = false;
        self.click_reset.cancel();

        let pos = self.mouse_to_map(screen);
        let Some(map) = self.active_map() else {
            return;
        };

        let start_offset = match button {
            MouseButton::Left => map
                .selected_object()
                .map(|o| (o.position() - pos) + map.offset()),
            MouseButton::Middle => Some(map.offset()),
            _ => None,
        };

        self.drag = DragState {
            mouse_down_pos: Some(pos),
            start_pos: pos,
            start_offset: start_offset.unwrap_or_default(),
            button: Some(button),
            moved: false,
        };
    }

    pub fn on_mouse_move(&mut self, screen: Vector2) {
        let pos = self.mouse_to_map(screen);
        let Some(down) = self.drag.mouse_down_pos else {
            return;
        };

        if !self.drag.moved
            && !Rect::from_center_extent(down, Vector2::splat(DRAG_THRESHOLD)).contains(pos)
        {
            self.drag.moved = true;
        }

        let (start_pos, start_offset) = (self.drag.start_pos, self.drag.start_offset);
        let changed = match (self.drag.button, self.active_map_mut()) {
            (Some(MouseButton::Left), Some(map)) => {
                let offset = map.offset();
                match map.selected_object_mut() {
                    Some(object) => match object.texture().and_then(|t| t.extent()) {
                        Some(extent) => {
                            let raw = (start_pos + (pos - down)).round();
                            let mut next = start_offset + (raw - offset);
                            // Odd-sized sprites sit on half units to stay pixel aligned.
                            if extent.x.fract() != 0.0 {
                                next.x += 0.5;
                            }
                            if extent.y.fract() != 0.0 {
                                next.y += 0.5;
                            }
                            object.set_position(next);
                            true
                        }
                        None => false,
                    },
                    None => false,
                }
            }
            (Some(MouseButton::Middle), Some(map)) => {
                map.set_offset(start_offset + (pos - down));
                true
            }
            _ => false,
        };

        if changed {
            self.render();
        }
    }

    pub fn on_mouse_up(&mut self, now: Instant) {
        self.drag.release();
        self.palette = None;
        self.click_reset.arm(now);
    }

    /// Logical click after a release. Swallowed if the press turned into a
    /// drag; otherwise a left click selects under the pointer.
    pub fn on_click(&mut self, screen: Vector2, button: MouseButton) {
        if self.drag.moved {
            self.drag.moved = false;
            return;
        }

        if button == MouseButton::Left {
            let pos = self.mouse_to_map(screen);
            if let Some(map) = self.active_map_mut() {
                // Objects are drawn at `position + offset`; hit-test in map
                // space so a panned map stays clickable where it is drawn.
                let offset = map.offset();
                let hit = map.select_object(pos - offset);
                log::debug!("click at {pos:?} selects {hit:?}");
            }
        }

        self.drag.release();
        self.render();
    }

    /// Pointer entered the canvas. With an armed palette texture, places a
    /// new object under the pointer and picks it up as if pressed.
    pub fn on_mouse_enter(&mut self, screen: Vector2) {
        let Some(index) = self.palette else {
            return;
        };
        let pos = self.mouse_to_map(screen);

        let texture = self
            .project
            .as_ref()
            .and_then(|p| p.textures().get(index))
            .cloned();
        let Some(texture) = texture else {
            log::warn!("palette index {index} has no texture; disarmed");
            self.palette = None;
            return;
        };
        let Some(map) = self.active_map_mut() else {
            return;
        };

        // Map space, like the click hit-test: the drop lands under the
        // pointer on a panned map.
        let offset = map.offset();
        let placed = pos - offset;
        let id = map.add_object(ObjectKind::Sprite, Some(texture), placed);
        map.set_selected(Some(id));

        self.drag = DragState {
            mouse_down_pos: Some(pos),
            start_pos: pos,
            start_offset: (placed - pos) + offset,
            button: Some(MouseButton::Left),
            moved: false,
        };
        self.palette = None;
        self.render();
    }

    /// Wheel notch, browser sign convention. Ignored while a button is held.
    pub fn on_wheel(&mut self, delta_y: f32) {
        if self.drag.mouse_down_pos.is_some() {
            return;
        }
        let Some(map) = self.active_map_mut() else {
            return;
        };

        let zoom = zoom_step(map.zoom(), delta_y);
        map.set_zoom(zoom);
        log::debug!("zoom {zoom:.3}");
        self.render();
    }

    pub fn on_key(&mut self, key: Key) {
        match key {
            Key::Delete | Key::Backspace => {
                let removed = self.active_map_mut().and_then(|map| {
                    let id = map.selected_id()?;
                    map.remove_object(id)
                });
                if let Some(object) = removed {
                    log::debug!("removed object {} ({})", object.id(), object.name());
                    self.render();
                }
            }
            Key::Escape => {
                self.palette = None;
                if let Some(map) = self.active_map_mut() {
                    map.set_selected(None);
                }
                self.render();
            }
            _ => {}
        }
    }

    pub fn selected_object_id(&self) -> Option<ObjectId> {
        self.active_map()?.selected_id()
    }

    /// Advances timers.
    pub fn tick(&mut self, now: Instant) {
        if self.click_reset.poll(now) {
            self.drag.moved = false;
        }
    }

    /// Routes a runtime input event to the handlers above.
    ///
    /// A left release also produces the logical click. Wheel deltas arrive
    /// in winit's convention and are flipped.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) {
        match event {
            InputEvent::PointerMoved(p) => self.on_mouse_move(Vector2::new(p.x, p.y)),
            InputEvent::PointerEntered(p) => self.on_mouse_enter(Vector2::new(p.x, p.y)),
            InputEvent::PointerButton(b) => {
                let pos = Vector2::new(b.x, b.y);
                match b.state {
                    MouseButtonState::Pressed => self.on_mouse_down(pos, b.button, now),
                    MouseButtonState::Released => {
                        self.on_mouse_up(now);
                        if b.button == MouseButton::Left {
                            self.on_click(pos, b.button);
                        }
                    }
                }
            }
            InputEvent::MouseWheel { delta, .. } => self.on_wheel(-delta.y()),
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                ..
            } => self.on_key(*key),
            _ => {}
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Redraws the active map, or clears when there is none. Skipped while
    /// the canvas is unmounted.
    pub fn render(&mut self) {
        if !self.canvas.is_mounted() {
            log::debug!("render skipped: canvas not mounted");
            return;
        }

        let pixel_ratio = self.pixel_ratio();
        let map = match (self.project.as_mut(), self.active_map) {
            (Some(project), Some(id)) => project.map_mut(id),
            _ => None,
        };

        match map {
            Some(map) => {
                if let Err(err) = self.canvas.render(map, pixel_ratio) {
                    log::error!("failed to render map {:?}: {err:#}", map.name());
                }
            }
            None => self.canvas.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;
    use image::RgbaImage;
    use mapsmith_engine::input::{Modifiers, MouseWheelDelta, PointerButtonEvent};
    use mapsmith_engine::render::headless::{GpuCall, HeadlessContext};
    use mapsmith_engine::render::Primitive;

    const CENTER: Vector2 = Vector2::new(320.0, 240.0);

    struct Fixture {
        _dir: tempfile::TempDir,
        editor: Editor<HeadlessContext>,
        map: MapId,
    }

    /// 640×480 canvas, pixel ratio 1, one open 640×480 map.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = Editor::new();
        editor.mount(HeadlessContext::new());
        editor.resize(Rect::new(0.0, 0.0, 640.0, 480.0));
        editor.open_project(dir.path()).unwrap();
        editor
            .project_mut()
            .unwrap()
            .update_settings(|s| s.pixel_ratio = 1.0)
            .unwrap();

        let map = editor.create_map("level", Vector2::new(640.0, 480.0)).unwrap();
        editor.open_map(map).unwrap();
        Fixture {
            _dir: dir,
            editor,
            map,
        }
    }

    fn add_sprite(editor: &mut Editor<HeadlessContext>, width: u32, height: u32, at: Vector2) -> ObjectId {
        let texture = editor
            .project_mut()
            .unwrap()
            .add_texture(Texture::from_image("sprite", RgbaImage::new(width, height)));
        editor
            .edit_active_map(|m| m.add_object(ObjectKind::Sprite, Some(texture), at))
            .unwrap()
    }

    fn world(editor: &Editor<HeadlessContext>, id: ObjectId) -> Vector2 {
        editor.active_map().unwrap().object(id).unwrap().position()
    }

    // ── coordinates ───────────────────────────────────────────────────────

    #[test]
    fn canvas_center_is_world_origin() {
        let f = fixture();
        assert_eq!(f.editor.mouse_to_map(CENTER), Vector2::zero());
        assert_eq!(
            f.editor.mouse_to_map(Vector2::new(330.0, 230.0)),
            Vector2::new(10.0, 10.0)
        );
    }

    #[test]
    fn zoom_and_pixel_ratio_scale_world_units() {
        let mut f = fixture();
        f.editor
            .project_mut()
            .unwrap()
            .update_settings(|s| s.pixel_ratio = 4.0)
            .unwrap();
        f.editor.edit_active_map(|m| m.set_zoom(2.0));

        assert_eq!(
            f.editor.mouse_to_map(Vector2::new(400.0, 160.0)),
            Vector2::new(10.0, 10.0)
        );
    }

    #[test]
    fn canvas_origin_is_subtracted() {
        let mut f = fixture();
        f.editor.resize(Rect::new(100.0, 50.0, 640.0, 480.0));
        assert_eq!(
            f.editor.mouse_to_map(Vector2::new(420.0, 290.0)),
            Vector2::zero()
        );
    }

    #[test]
    fn without_a_map_scale_is_one() {
        let mut editor = Editor::<HeadlessContext>::new();
        editor.resize(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(
            editor.mouse_to_map(Vector2::new(60.0, 40.0)),
            Vector2::new(10.0, 10.0)
        );
    }

    // ── zoom ──────────────────────────────────────────────────────────────

    #[test]
    fn zoom_clamps_at_both_ends() {
        assert_eq!(zoom_step(MAX_ZOOM, -1.0), MAX_ZOOM);
        assert_eq!(zoom_step(MIN_ZOOM, 1.0), MIN_ZOOM);
        assert_eq!(zoom_step(1.0, 0.0), 1.0);
        assert!((zoom_step(1.0, -3.0) - 1.08).abs() < 1e-6);
        assert!((zoom_step(1.0, 120.0) - 0.92).abs() < 1e-6);
    }

    #[test]
    fn wheel_is_ignored_while_pressed() {
        let mut f = fixture();
        let now = Instant::now();

        f.editor.on_mouse_down(CENTER, MouseButton::Left, now);
        f.editor.on_wheel(-1.0);
        assert_eq!(f.editor.active_map().unwrap().zoom(), 1.0);

        f.editor.on_mouse_up(now);
        f.editor.on_wheel(-1.0);
        assert!(f.editor.active_map().unwrap().zoom() > 1.0);
    }

    #[test]
    fn winit_wheel_away_from_user_zooms_in() {
        let mut f = fixture();
        let event = InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 1.0 },
            modifiers: Modifiers::default(),
        };
        f.editor.handle_input(&event, Instant::now());
        assert!(f.editor.active_map().unwrap().zoom() > 1.0);
    }

    // ── drag state machine ────────────────────────────────────────────────

    #[test]
    fn threshold_is_a_closed_two_unit_square() {
        let mut f = fixture();
        let now = Instant::now();

        f.editor.on_mouse_down(CENTER, MouseButton::Left, now);
        assert_eq!(f.editor.drag_phase(), DragPhase::PotentialClick);

        f.editor.on_mouse_move(CENTER + Vector2::new(2.0, -2.0));
        assert_eq!(f.editor.drag_phase(), DragPhase::PotentialClick);

        f.editor.on_mouse_move(CENTER + Vector2::new(3.0, 0.0));
        assert_eq!(f.editor.drag_phase(), DragPhase::Dragging(DragKind::MoveObject));

        f.editor.on_mouse_up(now);
        assert_eq!(f.editor.drag_phase(), DragPhase::Idle);
    }

    #[test]
    fn drag_moves_selection_with_half_unit_correction() {
        let mut f = fixture();
        let now = Instant::now();
        let id = add_sprite(&mut f.editor, 15, 16, Vector2::zero());

        // Select by clicking the origin.
        f.editor.on_mouse_down(CENTER, MouseButton::Left, now);
        f.editor.on_mouse_up(now);
        f.editor.on_click(CENTER, MouseButton::Left);
        assert_eq!(f.editor.selected_object_id(), Some(id));

        // Drag by (50, -20) world units; screen Y points down.
        f.editor.on_mouse_down(CENTER, MouseButton::Left, now);
        f.editor.on_mouse_move(CENTER + Vector2::new(50.0, 20.0));
        assert_eq!(world(&f.editor, id), Vector2::new(50.5, -20.0));

        f.editor.on_mouse_up(now);
        assert_eq!(world(&f.editor, id), Vector2::new(50.5, -20.0));
    }

    #[test]
    fn drag_rounds_to_whole_units() {
        let mut f = fixture();
        let now = Instant::now();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.edit_active_map(|m| m.set_selected(Some(id)));

        f.editor.on_mouse_down(CENTER, MouseButton::Left, now);
        f.editor.on_mouse_move(CENTER + Vector2::new(10.4, -7.6));
        assert_eq!(world(&f.editor, id), Vector2::new(10.0, 8.0));
    }

    #[test]
    fn middle_drag_pans() {
        let mut f = fixture();
        let now = Instant::now();

        f.editor.on_mouse_down(CENTER, MouseButton::Middle, now);
        f.editor.on_mouse_move(CENTER + Vector2::new(30.0, 10.0));
        assert_eq!(f.editor.drag_phase(), DragPhase::Dragging(DragKind::PanMap));
        assert_eq!(f.editor.active_map().unwrap().offset(), Vector2::new(30.0, -10.0));

        // A second pan continues from the current offset.
        f.editor.on_mouse_up(now);
        f.editor.on_mouse_down(CENTER, MouseButton::Middle, now);
        f.editor.on_mouse_move(CENTER + Vector2::new(5.0, 0.0));
        assert_eq!(f.editor.active_map().unwrap().offset(), Vector2::new(35.0, -10.0));
    }

    #[test]
    fn click_after_pan_hits_the_drawn_object() {
        let mut f = fixture();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.edit_active_map(|m| m.set_offset(Vector2::new(100.0, 0.0)));

        f.editor.on_click(CENTER + Vector2::new(100.0, 0.0), MouseButton::Left);
        assert_eq!(f.editor.selected_object_id(), Some(id));

        f.editor.on_click(CENTER, MouseButton::Left);
        assert_eq!(f.editor.selected_object_id(), None);
    }

    #[test]
    fn click_after_drag_is_swallowed() {
        let mut f = fixture();
        let now = Instant::now();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.edit_active_map(|m| m.set_selected(Some(id)));

        f.editor.on_mouse_down(CENTER + Vector2::new(200.0, 0.0), MouseButton::Left, now);
        f.editor.on_mouse_move(CENTER + Vector2::new(250.0, 0.0));
        f.editor.on_mouse_up(now);
        f.editor.on_click(CENTER + Vector2::new(250.0, 0.0), MouseButton::Left);

        // Would have cleared the selection had it been a real click.
        assert_eq!(f.editor.selected_object_id(), Some(id));
    }

    #[test]
    fn debounce_clears_the_moved_flag() {
        let mut f = fixture();
        let t0 = Instant::now();

        f.editor.on_mouse_down(CENTER, MouseButton::Right, t0);
        f.editor.on_mouse_move(CENTER + Vector2::new(40.0, 0.0));
        f.editor.on_mouse_up(t0);

        f.editor.tick(t0 + Duration::from_millis(100));
        assert!(f.editor.drag.moved);

        f.editor.tick(t0 + CLICK_DEBOUNCE);
        assert!(!f.editor.drag.moved);
    }

    #[test]
    fn press_cancels_pending_debounce() {
        let mut f = fixture();
        let t0 = Instant::now();

        f.editor.on_mouse_down(CENTER, MouseButton::Left, t0);
        f.editor.on_mouse_move(CENTER + Vector2::new(40.0, 0.0));
        f.editor.on_mouse_up(t0);
        f.editor.on_mouse_down(CENTER, MouseButton::Left, t0);

        assert!(!f.editor.click_reset.is_armed());
    }

    #[test]
    fn left_release_through_input_selects() {
        let mut f = fixture();
        let now = Instant::now();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());

        let button = |state| {
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state,
                x: CENTER.x,
                y: CENTER.y,
                modifiers: Modifiers::default(),
            })
        };
        f.editor.handle_input(&button(MouseButtonState::Pressed), now);
        f.editor.handle_input(&button(MouseButtonState::Released), now);

        assert_eq!(f.editor.selected_object_id(), Some(id));
    }

    // ── palette ───────────────────────────────────────────────────────────

    #[test]
    fn entering_with_armed_texture_places_and_picks_up() {
        let mut f = fixture();
        let now = Instant::now();
        f.editor
            .project_mut()
            .unwrap()
            .add_texture(Texture::from_image("crate", RgbaImage::new(16, 16)));
        let index = f.editor.project().unwrap().textures().len() - 1;
        f.editor.select_texture(Some(index));

        f.editor.on_mouse_enter(CENTER + Vector2::new(10.0, -10.0));
        assert_eq!(f.editor.palette_selection(), None);

        let id = f.editor.selected_object_id().unwrap();
        assert_eq!(world(&f.editor, id), Vector2::new(10.0, 10.0));
        assert_eq!(f.editor.drag_phase(), DragPhase::PotentialClick);

        f.editor.on_mouse_move(CENTER + Vector2::new(30.0, -10.0));
        assert_eq!(world(&f.editor, id), Vector2::new(30.0, 10.0));

        f.editor.on_mouse_up(now);
        assert_eq!(f.editor.drag_phase(), DragPhase::Idle);
    }

    #[test]
    fn release_disarms_the_palette() {
        let mut f = fixture();
        f.editor.select_texture(Some(0));
        f.editor.on_mouse_up(Instant::now());
        assert_eq!(f.editor.palette_selection(), None);
    }

    #[test]
    fn entering_without_armed_texture_does_nothing() {
        let mut f = fixture();
        f.editor.on_mouse_enter(CENTER);
        assert!(f.editor.active_map().unwrap().active_layer().is_empty());
    }

    #[test]
    fn drop_on_a_panned_map_lands_under_the_pointer() {
        let mut f = fixture();
        f.editor.edit_active_map(|m| m.set_offset(Vector2::new(40.0, 0.0)));
        f.editor
            .project_mut()
            .unwrap()
            .add_texture(Texture::from_image("crate", RgbaImage::new(16, 16)));
        let index = f.editor.project().unwrap().textures().len() - 1;
        f.editor.select_texture(Some(index));

        f.editor.on_mouse_enter(CENTER + Vector2::new(50.0, 0.0));
        let id = f.editor.selected_object_id().unwrap();
        assert_eq!(world(&f.editor, id), Vector2::new(10.0, 0.0));

        // Drawn at position + offset, i.e. where it was dropped.
        f.editor.on_mouse_up(Instant::now());
        f.editor.edit_active_map(|m| m.set_selected(None));
        f.editor.on_click(CENTER + Vector2::new(50.0, 0.0), MouseButton::Left);
        assert_eq!(f.editor.selected_object_id(), Some(id));
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn delete_removes_the_selection() {
        let mut f = fixture();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.edit_active_map(|m| m.set_selected(Some(id)));

        f.editor.on_key(Key::Delete);
        assert!(f.editor.active_map().unwrap().object(id).is_none());
    }

    #[test]
    fn escape_disarms_and_deselects() {
        let mut f = fixture();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.edit_active_map(|m| m.set_selected(Some(id)));
        f.editor.select_texture(Some(0));

        f.editor.on_key(Key::Escape);
        assert_eq!(f.editor.selected_object_id(), None);
        assert_eq!(f.editor.palette_selection(), None);
        assert!(f.editor.active_map().unwrap().object(id).is_some());
    }

    // ── maps ──────────────────────────────────────────────────────────────

    #[test]
    fn closing_the_active_map_activates_its_neighbour() {
        let mut f = fixture();
        let b = f.editor.create_map("b", Vector2::new(1.0, 1.0)).unwrap();
        let c = f.editor.create_map("c", Vector2::new(1.0, 1.0)).unwrap();
        f.editor.open_map(b).unwrap();
        f.editor.open_map(c).unwrap();

        f.editor.set_active_map(b);
        assert!(f.editor.close_map(b));
        assert_eq!(f.editor.active_map_id(), Some(c));

        assert!(f.editor.close_map(c));
        assert_eq!(f.editor.active_map_id(), Some(f.map));

        assert!(f.editor.close_map(f.map));
        assert_eq!(f.editor.active_map_id(), None);
        assert!(!f.editor.close_map(f.map));
    }

    #[test]
    fn delete_closes_and_removes() {
        let mut f = fixture();
        f.editor.delete_map(f.map).unwrap();

        assert!(f.editor.open_maps().is_empty());
        assert!(f.editor.project().unwrap().map(f.map).is_none());
    }

    #[test]
    fn failed_delete_keeps_the_map_open() {
        let mut f = fixture();
        let path = f.editor.active_map().unwrap().path().to_path_buf();
        // A directory in place of the document makes the removal fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(f.editor.delete_map(f.map), Err(ProjectError::Io { .. })));
        assert_eq!(f.editor.open_maps(), [f.map]);
        assert_eq!(f.editor.active_map_id(), Some(f.map));
    }

    #[test]
    fn opening_an_unknown_map_fails() {
        let mut f = fixture();
        let stale = f.map;
        f.editor.delete_map(stale).unwrap();
        assert!(matches!(f.editor.open_map(stale), Err(ProjectError::UnknownMap(_))));
    }

    #[test]
    fn map_operations_need_a_project() {
        let mut editor = Editor::<HeadlessContext>::new();
        assert!(matches!(
            editor.create_map("x", Vector2::new(1.0, 1.0)),
            Err(ProjectError::NoProject)
        ));
    }

    // ── rendering ─────────────────────────────────────────────────────────

    #[test]
    fn unmounted_render_is_skipped() {
        let mut editor = Editor::<HeadlessContext>::new();
        editor.render();
        assert!(!editor.canvas().is_mounted());
    }

    #[test]
    fn every_mutation_redraws() {
        let mut f = fixture();
        add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        f.editor.canvas_mut().ctx().take_calls();

        f.editor.on_wheel(1.0);
        let frame = f.editor.canvas_mut().ctx().take_calls();
        assert!(matches!(frame.first(), Some(GpuCall::Clear(_))));
        assert_eq!(
            frame
                .iter()
                .filter(|c| matches!(c, GpuCall::Draw { primitive: Primitive::TriangleStrip, .. }))
                .count(),
            2
        );
    }

    #[test]
    fn no_active_map_only_clears() {
        let mut f = fixture();
        f.editor.canvas_mut().ctx().take_calls();
        f.editor.close_map(f.map);
        let calls = f.editor.canvas_mut().ctx().take_calls();
        assert!(matches!(calls.last(), Some(GpuCall::Clear(_))));
        assert!(!calls.iter().any(|c| matches!(c, GpuCall::Draw { .. })));
    }

    #[test]
    fn closed_map_gets_a_fresh_background_after_remount() {
        let mut f = fixture();
        let other = f.editor.create_map("other", Vector2::new(100.0, 100.0)).unwrap();
        f.editor.open_map(other).unwrap();
        f.editor.close_map(other);

        f.editor.unmount();
        f.editor.mount(HeadlessContext::new());
        f.editor.open_map(other).unwrap();

        let calls = f.editor.canvas_mut().ctx().take_calls();
        let created: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::CreateBuffer { buffer, .. } => Some(*buffer),
                _ => None,
            })
            .collect();
        assert!(calls.iter().any(|c| matches!(
            c,
            GpuCall::CreateBuffer { points, .. } if points[0] == Vector2::new(50.0, 50.0)
        )));
        for call in &calls {
            if let GpuCall::BindAttribute { buffer, .. } = call {
                assert!(created.contains(buffer), "{buffer:?} bound but never created");
            }
        }
    }

    #[test]
    fn unmount_drops_texture_uploads() {
        let mut f = fixture();
        let id = add_sprite(&mut f.editor, 16, 16, Vector2::zero());
        let texture = f.editor.active_map().unwrap().object(id).unwrap().texture().unwrap().clone();
        assert!(texture.is_loaded());

        f.editor.unmount();
        assert!(!texture.is_loaded());

        f.editor.mount(HeadlessContext::new());
        assert!(texture.is_loaded());
    }
}
