//! Image assets and their GPU-side state.
//!
//! A `Texture` is identified by its source path. Decoding and GPU upload are
//! separate steps: decoding may run on worker threads (`decode_all`), upload
//! happens on the render thread the first time the texture is drawn.

use std::cell::{Cell, OnceCell};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

use image::RgbaImage;
use mapsmith_engine::coords::Vector2;
use mapsmith_engine::render::{DefaultBuffers, GpuContext, RenderBuffer, TextureId};

use crate::error::{ProjectError, ProjectResult};

/// Sub-rectangle of a sprite sheet, in image pixels with a bottom-left
/// origin (as Unity stores it).
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRect {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SpriteRect {
    /// Top edge of the rect in a top-left-origin image of `image_height`.
    pub fn top(&self, image_height: u32) -> Option<u32> {
        image_height.checked_sub(self.y.checked_add(self.height)?)
    }
}

/// Reads the first sprite of a Unity `.meta` file's `sprites:` block.
///
/// Returns `None` when the block is missing, empty (`sprites: []`) or
/// incomplete.
pub fn parse_sprite_meta(meta: &str) -> Option<SpriteRect> {
    let mut lines = meta.split(['\n', '\r']);
    let header = lines.find(|l| l.trim_start().starts_with("sprites"))?;
    if header.contains("[]") {
        return None;
    }

    let mut name = None;
    let (mut x, mut y, mut width, mut height) = (None, None, None, None);

    for line in lines {
        let line = line.trim().trim_start_matches("- ");
        if x.is_none() && let Some(v) = field(line, "x:") {
            x = parse_px(v);
        } else if y.is_none() && let Some(v) = field(line, "y:") {
            y = parse_px(v);
        } else if width.is_none() && let Some(v) = field(line, "width:") {
            width = parse_px(v);
        } else if height.is_none() && let Some(v) = field(line, "height:") {
            height = parse_px(v);
        } else if name.is_none() && let Some(v) = field(line, "name:") {
            name = Some(v.to_string()).filter(|n| !n.is_empty());
        }

        if let (Some(name), Some(x), Some(y), Some(width), Some(height)) =
            (&name, x, y, width, height)
        {
            return Some(SpriteRect {
                name: name.clone(),
                x,
                y,
                width,
                height,
            });
        }
    }
    None
}

fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key).map(str::trim)
}

fn parse_px(value: &str) -> Option<u32> {
    let v: f32 = value.parse().ok()?;
    (v.is_finite() && v >= 0.0).then(|| v.round() as u32)
}

/// Decodes `path` to RGBA8, cropped to `sprite` when given.
pub fn decode_image(path: &Path, sprite: Option<&SpriteRect>) -> ProjectResult<RgbaImage> {
    let image = image::open(path)
        .map_err(|source| ProjectError::TextureLoad {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    let Some(sprite) = sprite else {
        return Ok(image);
    };

    let top = sprite
        .top(image.height())
        .filter(|_| {
            sprite
                .x
                .checked_add(sprite.width)
                .is_some_and(|right| right <= image.width())
        })
        .ok_or_else(|| ProjectError::SpriteOutOfBounds {
            path: path.to_path_buf(),
        })?;

    Ok(image::imageops::crop_imm(&image, sprite.x, top, sprite.width, sprite.height).to_image())
}

/// GPU resources of an uploaded texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureGpu {
    pub texture: TextureId,
    /// Quad spanning the texture's extent.
    pub size_buffer: RenderBuffer,
    /// The same corners in outline order.
    pub selection_buffer: RenderBuffer,
    pub uv_buffer: RenderBuffer,
}

#[derive(Debug)]
pub struct Texture {
    path: PathBuf,
    name: String,
    sprite: Option<SpriteRect>,
    image: OnceCell<RgbaImage>,
    gpu: Cell<Option<TextureGpu>>,
}

impl Texture {
    /// Creates an undecoded texture for `path`, reading the `.meta` sidecar
    /// if there is one.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sprite = read_sidecar(&path).as_deref().and_then(parse_sprite_meta);
        let name = match &sprite {
            Some(sprite) => sprite.name.clone(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Self {
            path,
            name,
            sprite,
            image: OnceCell::new(),
            gpu: Cell::new(None),
        }
    }

    /// An already decoded texture; `name` doubles as its path.
    pub fn from_image(name: &str, image: RgbaImage) -> Self {
        Self {
            path: PathBuf::from(name),
            name: name.to_string(),
            sprite: None,
            image: OnceCell::from(image),
            gpu: Cell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sprite name if the sidecar names one, else the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sprite(&self) -> Option<&SpriteRect> {
        self.sprite.as_ref()
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.get()
    }

    pub fn is_decoded(&self) -> bool {
        self.image.get().is_some()
    }

    /// Pixel size once known: from the decoded image, else from the sprite
    /// rect.
    pub fn size(&self) -> Option<Vector2> {
        match (self.image.get(), &self.sprite) {
            (Some(image), _) => Some(Vector2::new(image.width() as f32, image.height() as f32)),
            (None, Some(sprite)) => Some(Vector2::new(sprite.width as f32, sprite.height as f32)),
            (None, None) => None,
        }
    }

    /// Half the pixel size.
    pub fn extent(&self) -> Option<Vector2> {
        self.size().map(|s| s / 2.0)
    }

    pub fn decode(&self) -> ProjectResult<&RgbaImage> {
        if let Some(image) = self.image.get() {
            return Ok(image);
        }
        let image = decode_image(&self.path, self.sprite.as_ref())?;
        Ok(self.image.get_or_init(|| image))
    }

    pub(crate) fn set_decoded(&self, image: RgbaImage) {
        let _ = self.image.set(image);
    }

    pub fn gpu(&self) -> Option<TextureGpu> {
        self.gpu.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.gpu.get().is_some()
    }

    /// Uploads the texture and builds its buffers.
    ///
    /// Only the first call touches the GPU; later calls return the same
    /// handles.
    pub fn load(
        &self,
        gpu: &mut dyn GpuContext,
        buffers: &mut DefaultBuffers,
    ) -> ProjectResult<TextureGpu> {
        if let Some(loaded) = self.gpu.get() {
            return Ok(loaded);
        }

        let image = self.decode()?;
        let (width, height) = image.dimensions();
        let half = Vector2::new(width as f32, height as f32) / 2.0;

        let loaded = TextureGpu {
            texture: gpu.create_texture(&self.name, width, height, image.as_raw()),
            size_buffer: RenderBuffer::quad(gpu, &self.name, half),
            selection_buffer: RenderBuffer::outline(gpu, &self.name, half),
            uv_buffer: buffers.uv(gpu),
        };
        self.gpu.set(Some(loaded));

        log::debug!("uploaded texture {:?} ({width}x{height})", self.name);
        Ok(loaded)
    }

    /// Forgets GPU handles after their context is gone. The decoded image
    /// is kept, so the next `load` only re-uploads.
    pub fn unload(&self) {
        self.gpu.set(None);
    }
}

fn read_sidecar(path: &Path) -> Option<String> {
    let mut meta = path.as_os_str().to_owned();
    meta.push(".meta");
    let meta = PathBuf::from(meta);

    match fs::read_to_string(&meta) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("could not read {}: {e}", meta.display());
            None
        }
    }
}

/// Path-keyed texture instances: one `Rc<Texture>` per path.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<PathBuf, Rc<Texture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &Path) -> Rc<Texture> {
        self.textures
            .entry(path.to_path_buf())
            .or_insert_with(|| Rc::new(Texture::open(path)))
            .clone()
    }

    /// Registers `texture` under its path unless that path is taken.
    pub fn insert(&mut self, texture: Texture) -> Rc<Texture> {
        self.textures
            .entry(texture.path().to_path_buf())
            .or_insert_with(|| Rc::new(texture))
            .clone()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.textures.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn unload_all(&self) {
        self.textures.values().for_each(|t| t.unload());
    }
}

/// Decodes every undecoded texture, spread over the available cores.
///
/// All-or-nothing: on the first failure no texture of the batch is marked
/// decoded and the error names the offending file.
pub fn decode_all(textures: &[Rc<Texture>]) -> ProjectResult<()> {
    let jobs: Vec<(usize, &Path, Option<&SpriteRect>)> = textures
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_decoded())
        .map(|(i, t)| (i, t.path(), t.sprite()))
        .collect();
    if jobs.is_empty() {
        return Ok(());
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(jobs.len());
    let chunk = jobs.len().div_ceil(workers);

    let results: Vec<ProjectResult<Vec<(usize, RgbaImage)>>> = thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .chunks(chunk)
            .map(|part| {
                scope.spawn(move || {
                    part.iter()
                        .map(|&(i, path, sprite)| decode_image(path, sprite).map(|img| (i, img)))
                        .collect()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    let mut decoded = Vec::with_capacity(jobs.len());
    for part in results {
        decoded.extend(part?);
    }

    log::debug!("decoded {} texture(s) on {workers} worker(s)", decoded.len());
    for (i, image) in decoded {
        textures[i].set_decoded(image);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use mapsmith_engine::render::headless::{GpuCall, HeadlessContext};

    const META: &str = "fileFormatVersion: 2\n\
        TextureImporter:\n  \
          spriteMode: 2\n  \
          spriteSheet:\n    \
            serializedVersion: 2\n    \
            sprites:\n    \
            - serializedVersion: 2\n      \
              name: hero_idle_0\n      \
              rect:\n        \
                serializedVersion: 2\n        \
                x: 16\n        \
                y: 0\n        \
                width: 16\n        \
                height: 24\n      \
              alignment: 0\n      \
              pivot: {x: 0.5, y: 0.5}\n";

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    // ── sprite metadata ───────────────────────────────────────────────────

    #[test]
    fn reads_first_sprite_rect() {
        let rect = parse_sprite_meta(META).unwrap();
        assert_eq!(
            rect,
            SpriteRect {
                name: "hero_idle_0".into(),
                x: 16,
                y: 0,
                width: 16,
                height: 24,
            }
        );
    }

    #[test]
    fn empty_sprite_list_has_no_rect() {
        assert_eq!(parse_sprite_meta("  sprites: []\n  x: 1\n"), None);
    }

    #[test]
    fn incomplete_block_has_no_rect() {
        assert_eq!(parse_sprite_meta("sprites:\n- name: a\n  x: 0\n  y: 0\n"), None);
        assert_eq!(parse_sprite_meta("TextureImporter:\n  x: 0\n"), None);
    }

    #[test]
    fn crlf_meta_parses() {
        let crlf = META.replace('\n', "\r\n");
        assert_eq!(parse_sprite_meta(&crlf).map(|r| r.height), Some(24));
    }

    // ── decoding ──────────────────────────────────────────────────────────

    #[test]
    fn crop_flips_to_top_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        checker(32, 32).save(&path).unwrap();

        let sprite = SpriteRect {
            name: "s".into(),
            x: 16,
            y: 0,
            width: 16,
            height: 24,
        };
        let image = decode_image(&path, Some(&sprite)).unwrap();

        assert_eq!(image.dimensions(), (16, 24));
        // Bottom-left y=0 with height 24 starts 8 rows down from the top.
        assert_eq!(image.get_pixel(0, 0), &Rgba([16, 8, 0, 255]));
    }

    #[test]
    fn sprite_outside_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        checker(8, 8).save(&path).unwrap();

        let sprite = SpriteRect {
            name: "s".into(),
            x: 0,
            y: 4,
            width: 8,
            height: 8,
        };
        assert!(matches!(
            decode_image(&path, Some(&sprite)),
            Err(ProjectError::SpriteOutOfBounds { .. })
        ));
    }

    #[test]
    fn sidecar_names_and_sizes_the_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hero.png");
        checker(32, 32).save(&path).unwrap();
        fs::write(dir.path().join("hero.png.meta"), META).unwrap();

        let texture = Texture::open(&path);
        assert_eq!(texture.name(), "hero_idle_0");
        assert_eq!(texture.size(), Some(Vector2::new(16.0, 24.0)));

        texture.decode().unwrap();
        assert_eq!(texture.extent(), Some(Vector2::new(8.0, 12.0)));
    }

    #[test]
    fn batch_fails_as_a_whole() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        checker(4, 4).save(&good).unwrap();
        fs::write(&bad, b"not a png").unwrap();

        let mut cache = TextureCache::new();
        let textures = vec![cache.get(&good), cache.get(&bad)];

        match decode_all(&textures) {
            Err(ProjectError::TextureLoad { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected a texture load error, got {other:?}"),
        }
        assert!(textures.iter().all(|t| !t.is_decoded()));
    }

    #[test]
    fn batch_decodes_every_texture() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TextureCache::new();
        let textures: Vec<_> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("t{i}.png"));
                checker(2 + i, 3).save(&path).unwrap();
                cache.get(&path)
            })
            .collect();

        decode_all(&textures).unwrap();
        assert_eq!(textures[4].size(), Some(Vector2::new(6.0, 3.0)));
    }

    // ── cache & GPU ───────────────────────────────────────────────────────

    #[test]
    fn cache_returns_one_instance_per_path() {
        let mut cache = TextureCache::new();
        let a = cache.get(Path::new("Assets/a.png"));
        let b = cache.get(Path::new("Assets/a.png"));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn load_is_idempotent() {
        let mut gpu = HeadlessContext::new();
        let mut buffers = DefaultBuffers::new();
        let texture = Texture::from_image("tile", checker(15, 16));

        let first = texture.load(&mut gpu, &mut buffers).unwrap();
        let calls = gpu.calls().len();
        let second = texture.load(&mut gpu, &mut buffers).unwrap();

        assert_eq!(first, second);
        assert_eq!(gpu.calls().len(), calls);
        assert_eq!(gpu.count(|c| matches!(c, GpuCall::CreateTexture { .. })), 1);
        assert_eq!(first.size_buffer.points()[0], Vector2::new(7.5, 8.0));
    }

    #[test]
    fn unload_forces_a_fresh_upload() {
        let mut gpu = HeadlessContext::new();
        let mut buffers = DefaultBuffers::new();
        let texture = Texture::from_image("tile", checker(2, 2));

        texture.load(&mut gpu, &mut buffers).unwrap();
        texture.unload();
        assert!(!texture.is_loaded());
        texture.load(&mut gpu, &mut buffers).unwrap();

        assert_eq!(gpu.count(|c| matches!(c, GpuCall::CreateTexture { .. })), 2);
    }
}
