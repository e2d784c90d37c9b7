// Presenter - Converts indexed pixels to RGBA and hands them to a surface
//
// A device owns one output surface. The presenter rewrites the full surface
// every call; there is no dirty-region tracking.

use super::palette::Palette;
use super::pixel_buffer::PixelBuffer;
use crate::device::DeviceConfig;
use crate::error::ConsoleError;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

/// A native (or in-memory) RGBA destination owned by one device
///
/// Dropping the surface releases the native resource.
pub trait OutputSurface {
    /// RGBA8 frame, `None` while no native surface is attached yet
    fn frame_mut(&mut self) -> Option<&mut [u8]>;

    /// Read-only view of the last written frame
    fn frame(&self) -> Option<&[u8]>;

    /// Display the current frame contents
    fn display(&mut self) -> Result<(), ConsoleError>;

    /// Bind the surface to the running event loop
    ///
    /// Native windows can only be created once the event loop is active;
    /// surfaces that need no window return immediately.
    fn attach(&mut self, _event_loop: &ActiveEventLoop) -> Result<(), ConsoleError> {
        Ok(())
    }

    fn window_id(&self) -> Option<WindowId> {
        None
    }

    fn request_redraw(&self) {}
}

/// Factory for the surfaces of newly created devices
pub trait SurfaceBackend {
    /// Acquire a surface sized for `config`
    ///
    /// `slot` identifies the registry slot, used for window titles.
    fn acquire(
        &mut self,
        config: &DeviceConfig,
        slot: usize,
    ) -> Result<Box<dyn OutputSurface>, ConsoleError>;
}

/// Write `buffer` through `palette` into an RGBA8 frame
///
/// # Panics
/// Panics if `frame` holds fewer than `buffer.len() * 4` bytes
pub fn present_into(buffer: &PixelBuffer, palette: &Palette, frame: &mut [u8]) {
    assert!(
        frame.len() >= buffer.len() * 4,
        "Output frame too small for RGBA conversion"
    );

    for (out, index) in frame.chunks_exact_mut(4).zip(buffer.indices()) {
        out.copy_from_slice(&palette.lookup(index).to_rgba());
    }
}

/// Present a buffer to a surface: convert, then display
pub fn present(
    buffer: &PixelBuffer,
    palette: &Palette,
    surface: &mut dyn OutputSurface,
) -> Result<(), ConsoleError> {
    match surface.frame_mut() {
        Some(frame) => present_into(buffer, palette, frame),
        None => return Ok(()),
    }
    surface.display()
}

/// Surface backed by a plain RGBA vector
///
/// Used for headless sessions and tests.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: usize,
    height: usize,
    frame: Vec<u8>,
    presented: u64,
}

impl MemorySurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frame: vec![0; width * height * 4],
            presented: 0,
        }
    }

    /// Number of frames displayed so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// RGBA of the pixel at (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * 4;
        [
            self.frame[offset],
            self.frame[offset + 1],
            self.frame[offset + 2],
            self.frame[offset + 3],
        ]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

impl OutputSurface for MemorySurface {
    fn frame_mut(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.frame)
    }

    fn frame(&self) -> Option<&[u8]> {
        Some(&self.frame)
    }

    fn display(&mut self) -> Result<(), ConsoleError> {
        self.presented += 1;
        Ok(())
    }
}

/// Backend handing out [`MemorySurface`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBackend;

impl SurfaceBackend for HeadlessBackend {
    fn acquire(
        &mut self,
        config: &DeviceConfig,
        _slot: usize,
    ) -> Result<Box<dyn OutputSurface>, ConsoleError> {
        Ok(Box::new(MemorySurface::new(config.width, config.height)))
    }
}
