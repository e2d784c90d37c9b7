// ThunderVM Library
// Core library for the ThunderVM fantasy console

// Public modules
pub mod console;
pub mod device;
pub mod display;
pub mod error;
pub mod script;

// Re-export main types for convenience
pub use console::{Console, ConsoleConfig, SharedConsole};
pub use device::{Device, DeviceConfig, DeviceHandle, DeviceKind, DeviceRegistry};
pub use display::{HeadlessBackend, Palette, PixelBuffer, Rgb, WindowBackend};
pub use error::{ConsoleError, ErrorKind};
pub use script::{ScriptHost, DRAW_HOOK};
