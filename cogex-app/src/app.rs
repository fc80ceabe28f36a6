use crate::session::Session;
use ab_glyph::FontVec;
use anyhow::Result;
use cogex_core::KeyId;
use cogex_render::{layout, Layout, SkiaRenderer};
use cogex_survey::WidgetEvent;
use cogex_timing::HighPrecisionTimer;
use pixels::{Pixels, SurfaceTexture};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    font: Option<FontVec>,
    session: Session<HighPrecisionTimer>,
    layout: Layout,
    cursor: Option<PhysicalPosition<f64>>,
    scale_factor: f64,
    windowed: bool,
    results_path: PathBuf,
    failure: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(
        session: Session<HighPrecisionTimer>,
        font: FontVec,
        results_path: PathBuf,
        windowed: bool,
    ) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            font: Some(font),
            session,
            layout: Layout::default(),
            cursor: None,
            scale_factor: 1.0,
            windowed,
            results_path,
            failure: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "=== COGEX SURVEY ==="
        );

        event_loop.run_app(&mut self)?;

        self.session.abort();
        self.session.write_results(&self.results_path)?;
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut window_attributes = Window::default_attributes()
            .with_title("Cogex")
            .with_resizable(self.windowed);
        if !self.windowed {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        } else {
            window_attributes = window_attributes.with_inner_size(PhysicalSize::new(1280, 800));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.scale_factor = window.scale_factor();
        info!(
            width = physical_size.width,
            height = physical_size.height,
            scale_factor = self.scale_factor,
            "display configured"
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        let font = self
            .font
            .take()
            .ok_or_else(|| anyhow::anyhow!("renderer already created"))?;
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            font,
        )?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pix), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        let (width, height) = renderer.size();
        self.layout = match self.session.container().view() {
            Some(view) => layout(view, width, height, &*renderer),
            None => Layout::default(),
        };
        let stats = renderer.render_frame(&self.layout, pix.frame_mut())?;
        pix.render()?;
        debug!(
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            items = stats.items,
            "frame rendered"
        );
        Ok(())
    }

    fn dispatch(&mut self, event: WidgetEvent, event_loop: &ActiveEventLoop) -> bool {
        match self.session.dispatch(event) {
            Ok(outcome) => {
                debug!(?outcome, state = ?self.session.state(), "event dispatched");
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                outcome.is_consumed()
            }
            Err(e) => {
                self.fail(e, event_loop);
                true
            }
        }
    }

    fn handle_click(&mut self, event_loop: &ActiveEventLoop) {
        let Some(pos) = self.cursor else {
            return;
        };
        if let Some(target) = self.layout.hit_test(pos.x as f32, pos.y as f32) {
            self.dispatch(WidgetEvent::Click(target), event_loop);
        }
    }

    fn handle_key_up(&mut self, key: &Key, event_loop: &ActiveEventLoop) {
        let Some(id) = key_id(key) else {
            return;
        };
        let consumed = self.dispatch(WidgetEvent::KeyUp(id), event_loop);
        if !consumed && matches!(key, Key::Named(NamedKey::Escape)) {
            self.cleanup_and_exit(event_loop);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                warn!("Failed to resize surface: {}", e);
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                warn!("Failed to resize buffer: {}", e);
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                warn!("Failed to resize renderer: {:#}", e);
            }
        }
        info!(width = new_size.width, height = new_size.height, "display resized");
    }

    fn fail(&mut self, e: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!("{:#}", e);
        self.failure = Some(e);
        self.cleanup_and_exit(event_loop);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        info!(completed = self.session.records().len(), "session closing");
        self.should_exit = true;
        event_loop.exit();
    }
}

/// Maps a winit key to the identifier trial configs use.
pub fn key_id(key: &Key) -> Option<KeyId> {
    match key {
        Key::Character(s) => Some(KeyId::parse(s.as_str())),
        Key::Named(NamedKey::Space) => Some(KeyId::parse(" ")),
        Key::Named(named) => Some(KeyId::parse(&format!("{named:?}"))),
        _ => None,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(e.context("creating window and surface"), event_loop);
                return;
            }
            match self.session.advance() {
                Ok(true) => {}
                Ok(false) => {
                    info!("timeline is empty");
                    self.cleanup_and_exit(event_loop);
                }
                Err(e) => self.fail(e, event_loop),
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(e.context("rendering frame"), event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor = Some(position),
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.handle_click(event_loop),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Released => {
                self.handle_key_up(&event.logical_key, event_loop);
            }
            WindowEvent::Resized(sz) => {
                self.handle_resize(sz);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        match self.session.poll(Instant::now()) {
            Ok(true) => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Ok(false) => {}
            Err(e) => self.fail(e, event_loop),
        }
        if self.session.is_finished() {
            info!("timeline complete");
            self.cleanup_and_exit(event_loop);
        }
        if self.should_exit {
            event_loop.exit();
            return;
        }
        match self.session.next_wakeup() {
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(at)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
