// Window module - Native windows for console devices
//
// Each device gets its own window, rendered through the pixels crate.
// Windows can only be created once the winit event loop runs, so surfaces
// are handed out unattached and bound to the loop on the next event.

use super::presenter::{OutputSurface, SurfaceBackend};
use crate::console::VideoConfig;
use crate::device::DeviceConfig;
use crate::error::ConsoleError;
use crate::script::{report_script_error, ScriptHost};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Window-backed output surface of one device
pub struct WindowSurface {
    title: String,
    width: usize,
    height: usize,
    scale: u32,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
}

impl WindowSurface {
    /// Create an unattached surface (the window appears on `attach`)
    pub fn new(title: String, width: usize, height: usize, scale: u32) -> Self {
        Self {
            title,
            width,
            height,
            scale: scale.clamp(1, 8),
            window: None,
            pixels: None,
        }
    }

    /// Get the window width in pixels
    pub fn window_width(&self) -> u32 {
        self.width as u32 * self.scale
    }

    /// Get the window height in pixels
    pub fn window_height(&self) -> u32 {
        self.height as u32 * self.scale
    }

    pub fn is_attached(&self) -> bool {
        self.window.is_some()
    }
}

impl OutputSurface for WindowSurface {
    fn frame_mut(&mut self) -> Option<&mut [u8]> {
        self.pixels.as_mut().map(|p| p.frame_mut())
    }

    fn frame(&self) -> Option<&[u8]> {
        self.pixels.as_ref().map(|p| p.frame())
    }

    fn display(&mut self) -> Result<(), ConsoleError> {
        if let Some(pixels) = &self.pixels {
            pixels
                .render()
                .map_err(|e| ConsoleError::Present(e.to_string()))?;
        }
        Ok(())
    }

    fn attach(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ConsoleError> {
        if self.window.is_some() {
            return Ok(());
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.window_width(), self.window_height()))
            .with_resizable(false);

        let window = event_loop
            .create_window(window_attributes)
            .map_err(|e| ConsoleError::SubsystemInitFailure(format!("create window: {}", e)))?;

        // Wrap window in Arc for shared ownership
        let window = Arc::new(window);
        let window_size = window.inner_size();

        // Create surface texture using Arc<Window> for safe 'static lifetime
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        let pixels = Pixels::new(self.width as u32, self.height as u32, surface_texture)
            .map_err(|e| ConsoleError::SubsystemInitFailure(format!("create pixels: {}", e)))?;

        debug!(title = %self.title, "window attached");
        self.window = Some(window);
        self.pixels = Some(pixels);
        Ok(())
    }

    fn window_id(&self) -> Option<WindowId> {
        self.window.as_ref().map(|w| w.id())
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Surface backend creating one window per device
#[derive(Debug, Clone, Copy)]
pub struct WindowBackend {
    scale: u32,
}

impl WindowBackend {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.clamp(1, 8),
        }
    }
}

impl SurfaceBackend for WindowBackend {
    fn acquire(
        &mut self,
        config: &DeviceConfig,
        slot: usize,
    ) -> Result<Box<dyn OutputSurface>, ConsoleError> {
        let title = format!("{} #{}", config.title, slot);
        Ok(Box::new(WindowSurface::new(
            title,
            config.width,
            config.height,
            self.scale,
        )))
    }
}

/// Event loop handler driving the script and presenting every device
pub struct ConsoleWindow {
    host: ScriptHost,
    frame_duration: Duration,
    last_frame_time: Instant,
    frames: u64,
    fatal: Option<ConsoleError>,
}

impl ConsoleWindow {
    pub fn new(host: ScriptHost, video: &VideoConfig) -> Self {
        Self {
            host,
            frame_duration: video.frame_duration(),
            last_frame_time: Instant::now(),
            frames: 0,
            fatal: None,
        }
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Check if enough time has passed for the next frame
    fn should_render_frame(&mut self) -> bool {
        let elapsed = self.last_frame_time.elapsed();

        if elapsed >= self.frame_duration {
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ConsoleError) {
        self.fatal = Some(err);
        event_loop.exit();
    }

    /// Run the draw hook, bind new windows and present
    fn render(&mut self, event_loop: &ActiveEventLoop) {
        // A failing hook ends the session but is not a process failure
        if let Err(err) = self.host.update() {
            report_script_error(&err);
            event_loop.exit();
            return;
        }

        let result = {
            let mut console = self.host.console().borrow_mut();
            console
                .attach_surfaces(event_loop)
                .and_then(|_| console.present_all())
        };
        match result {
            Ok(()) => self.frames += 1,
            Err(err) => self.fail(event_loop, err),
        }
    }
}

impl ApplicationHandler for ConsoleWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let result = self.host.console().borrow_mut().attach_surfaces(event_loop);
        if let Err(err) = result {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if !self.host.console().borrow().owns_window(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                info!("escape pressed, exiting");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if self.should_render_frame() {
                    self.render(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let console = self.host.console().borrow();
        if console.registry().is_empty() {
            info!("no devices left, exiting");
            event_loop.exit();
            return;
        }
        console.request_redraw();
    }
}

/// Run the windowed frame loop until a window closes or the script fails
///
/// # Errors
/// `SubsystemInitFailure` if a window cannot be created or presented.
/// Script errors are reported and end the loop without an error.
pub fn run_windowed(
    event_loop: EventLoop<()>,
    host: ScriptHost,
    video: &VideoConfig,
) -> Result<u64, ConsoleError> {
    // Set control flow based on VSync setting
    if video.vsync {
        event_loop.set_control_flow(ControlFlow::Wait);
    } else {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    info!(
        scale = video.scale,
        fps = video.fps,
        vsync = video.vsync,
        "starting windowed loop"
    );

    let mut app = ConsoleWindow::new(host, video);
    event_loop
        .run_app(&mut app)
        .map_err(|e| ConsoleError::SubsystemInitFailure(e.to_string()))?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(app.frames()),
    }
}
