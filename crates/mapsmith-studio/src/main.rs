use std::path::PathBuf;
use std::time::Instant;

use winit::dpi::LogicalSize;

use mapsmith_editor::Editor;
use mapsmith_engine::coords::{Rect, Vector2};
use mapsmith_engine::core::{App, AppControl, FrameCtx};
use mapsmith_engine::device::GpuInit;
use mapsmith_engine::input::InputEvent;
use mapsmith_engine::logging::{init_logging, LoggingConfig};
use mapsmith_engine::render::WgpuContext;
use mapsmith_engine::window::{Runtime, RuntimeConfig};

/// Usage: `mapsmith-studio [PROJECT_DIR]`
///
/// Opens the Unity project at `PROJECT_DIR` (default: the current
/// directory) and shows its first map.
fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let root = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut editor = Editor::new();
    let mut title = "mapsmith".to_string();

    match editor.open_project(&root) {
        Ok(()) => {
            let first = editor
                .project()
                .and_then(|p| p.maps().first())
                .map(|m| (m.id(), m.name().to_string()));
            match first {
                Some((id, name)) => {
                    if let Err(err) = editor.open_map(id) {
                        log::error!("failed to open map {name:?}: {err}");
                    }
                    title = format!("mapsmith - {name}");
                }
                None => log::info!("project has no maps yet"),
            }
        }
        Err(err) => log::error!("failed to open project {}: {err}", root.display()),
    }

    let config = RuntimeConfig {
        title,
        initial_size: LogicalSize::new(1280.0, 800.0),
    };

    Runtime::run(config, GpuInit::default(), Studio { editor })
}

struct Studio {
    editor: Editor<WgpuContext>,
}

impl App for Studio {
    fn on_input(&mut self, event: &InputEvent, now: Instant) -> AppControl {
        self.editor.tick(now);
        self.editor.handle_input(event, now);
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.editor.canvas().is_mounted() {
            let gpu = &*ctx.gpu;
            let context = WgpuContext::new(
                gpu.device().clone(),
                gpu.queue().clone(),
                gpu.surface_format(),
            );
            self.editor.mount(context);
        }

        // The canvas fills the window.
        let viewport = ctx.window.viewport();
        self.editor
            .resize(Rect::from_origin_size(Vector2::zero(), viewport.size()));
        self.editor.tick(ctx.now);

        let canvas = self.editor.canvas_mut();
        ctx.present(|encoder, view| {
            if let Some(context) = canvas.context_mut() {
                context.flush(encoder, view);
            }
        })
    }
}
