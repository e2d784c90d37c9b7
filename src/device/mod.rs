// Device module - One addressable display: palette + pixel buffer + surface
//
// Devices are only reachable from scripts through opaque handles issued by
// the registry.

pub mod registry;

pub use registry::{DeviceHandle, DeviceRegistry};

use crate::display::palette::Palette;
use crate::display::pixel_buffer::{self, PixelBuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::display::presenter::{self, OutputSurface};
use crate::error::ConsoleError;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Kind of device a script can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// 16-color packed framebuffer screen
    Screen,
}

impl DeviceKind {
    /// Parse the tag scripts pass to `Screen.new`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "screen" => Some(DeviceKind::Screen),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            DeviceKind::Screen => "screen",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parameters for creating a device
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    pub width: usize,
    pub height: usize,
    /// Palette to install; `None` installs the default palette
    pub palette: Option<Palette>,
    pub title: String,
}

impl DeviceConfig {
    /// Default-sized screen
    pub fn new() -> Self {
        Self {
            kind: DeviceKind::Screen,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            palette: None,
            title: "ThunderVM".to_string(),
        }
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Check the dimensions without allocating anything
    pub fn validate(&self) -> Result<(), ConsoleError> {
        pixel_buffer::check_dimension("width", self.width)?;
        pixel_buffer::check_dimension("height", self.height)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A display device
pub struct Device {
    kind: DeviceKind,
    palette: Palette,
    buffer: PixelBuffer,
    surface: Box<dyn OutputSurface>,
    last_present: Instant,
}

impl Device {
    /// Create a device around an already acquired surface
    ///
    /// The buffer starts zeroed (every pixel is palette index 0).
    pub fn new(
        config: &DeviceConfig,
        surface: Box<dyn OutputSurface>,
    ) -> Result<Self, ConsoleError> {
        Ok(Self {
            kind: config.kind,
            palette: config.palette.clone().unwrap_or_default(),
            buffer: PixelBuffer::new(config.width, config.height)?,
            surface,
            last_present: Instant::now(),
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub fn surface(&self) -> &dyn OutputSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn OutputSurface {
        self.surface.as_mut()
    }

    /// Time since the last present (or since creation)
    pub fn since_last_present(&self) -> Duration {
        self.last_present.elapsed()
    }

    /// Convert the whole buffer to the surface and display it
    pub fn present(&mut self) -> Result<(), ConsoleError> {
        presenter::present(&self.buffer, &self.palette, self.surface.as_mut())?;
        self.last_present = Instant::now();
        Ok(())
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("kind", &self.kind)
            .field("width", &self.buffer.width())
            .field("height", &self.buffer.height())
            .finish_non_exhaustive()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        debug!(
            kind = %self.kind,
            width = self.buffer.width(),
            height = self.buffer.height(),
            "releasing device surface"
        );
    }
}
