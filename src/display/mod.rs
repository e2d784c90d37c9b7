// Display module - Pixel storage and presentation
//
// This module provides:
// - Packed 4bpp pixel buffer with run, rectangle and line rasterization
// - 16-entry RGB palette
// - Presenter converting indexed pixels to RGBA surfaces
// - Window backend (winit + pixels) and a headless frame loop

pub mod headless;
pub mod palette;
pub mod pixel_buffer;
pub mod presenter;
pub mod window;

pub use headless::run_headless;
pub use palette::{Palette, Rgb, DEFAULT_PALETTE, PALETTE_SIZE};
pub use pixel_buffer::{PixelBuffer, COLOR_COUNT, MAX_DIMENSION, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use presenter::{
    present, present_into, HeadlessBackend, MemorySurface, OutputSurface, SurfaceBackend,
};
pub use window::{run_windowed, ConsoleWindow, WindowBackend, WindowSurface};
