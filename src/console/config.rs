// Configuration management
//
// Handles console configuration: window scaling, frame pacing, device
// limits and the palette installed on new devices.

use crate::device::DeviceConfig;
use crate::display::palette::Palette;
use crate::display::pixel_buffer::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Default configuration file path
pub const CONFIG_FILE: &str = "console_config.toml";

/// Console configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Video settings
    pub video: VideoConfig,

    /// Device settings
    pub devices: DevicesConfig,

    /// Palette override for new devices
    pub palette: PaletteConfig,
}

/// Video configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Window scale (1-8)
    pub scale: u32,

    /// Target frames per second
    pub fps: u32,

    /// Enable VSync
    pub vsync: bool,
}

/// Device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Maximum number of live devices
    pub max_devices: usize,

    /// Width of the startup device
    pub width: usize,

    /// Height of the startup device
    pub height: usize,

    /// Window title prefix
    pub title: String,
}

/// Palette configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Exactly 16 `[r, g, b]` entries; anything else falls back to the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<[u8; 3]>>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            scale: 3,
            fps: 60,
            vsync: true,
        }
    }
}

impl VideoConfig {
    /// Frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.fps.max(1) as u64)
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        DevicesConfig {
            max_devices: 2,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            title: "ThunderVM".to_string(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            video: VideoConfig::default(),
            devices: DevicesConfig::default(),
            palette: PaletteConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window scale factor (clamped to 1-8)
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.video.scale = scale.clamp(1, 8);
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.video.fps = fps.max(1);
        self
    }

    /// Set VSync enabled or disabled
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.video.vsync = vsync;
        self
    }

    /// Set the maximum number of live devices
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.devices.max_devices = max_devices.max(1);
        self
    }

    /// Frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        self.video.frame_duration()
    }

    /// Palette for newly created devices
    pub fn palette(&self) -> Palette {
        match &self.palette.colors {
            Some(colors) => Palette::from_triples(colors).unwrap_or_else(|| {
                warn!(
                    entries = colors.len(),
                    "palette override needs 16 entries, using default palette"
                );
                Palette::default()
            }),
            None => Palette::default(),
        }
    }

    /// Configuration of the device created at startup
    pub fn startup_device(&self) -> DeviceConfig {
        DeviceConfig::new()
            .with_size(self.devices.width, self.devices.height)
            .with_palette(self.palette())
            .with_title(self.devices.title.clone())
    }

    /// Load configuration from `path`, falling back to defaults
    ///
    /// If the file doesn't exist or can't be parsed, the default
    /// configuration is used and written back when possible.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            if path.exists() {
                warn!(path = %path.display(), error = %e, "ignoring unreadable configuration");
                return Self::default();
            }
            let config = Self::default();
            // Try to save the default config, but don't fail if we can't
            let _ = config.save(path);
            config
        })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConsoleError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConsoleError::Config(e.to_string()))?;
        config.normalize();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConsoleError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConsoleError::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn normalize(&mut self) {
        self.video.scale = self.video.scale.clamp(1, 8);
        self.video.fps = self.video.fps.max(1);
        self.devices.max_devices = self.devices.max_devices.max(1);
    }
}
