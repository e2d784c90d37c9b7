// Console module - Main coordinator
//
// Owns the device registry, the surface backend used to create new devices
// and the startup ("default") device that the flat script API draws on.

mod config;

pub use config::{ConsoleConfig, DevicesConfig, PaletteConfig, VideoConfig, CONFIG_FILE};

use crate::device::{Device, DeviceConfig, DeviceHandle, DeviceKind, DeviceRegistry};
use crate::display::presenter::SurfaceBackend;
use crate::error::ConsoleError;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

/// Console shared between the script bindings and the frame loop
///
/// Execution is single-threaded: bindings borrow it for the duration of
/// one call, the frame loop only between script calls.
pub type SharedConsole = Rc<RefCell<Console>>;

/// Main console structure
pub struct Console {
    config: ConsoleConfig,
    registry: DeviceRegistry,
    backend: Box<dyn SurfaceBackend>,
    default_device: DeviceHandle,
}

impl Console {
    /// Create a console and its startup device
    ///
    /// # Errors
    /// `SubsystemInitFailure` if the backend cannot provide a surface for
    /// the startup device.
    pub fn new(
        config: ConsoleConfig,
        mut backend: Box<dyn SurfaceBackend>,
    ) -> Result<Self, ConsoleError> {
        let mut registry = DeviceRegistry::new(config.devices.max_devices);
        let default_device = registry.create_device(&config.startup_device(), backend.as_mut())?;

        Ok(Console {
            config,
            registry,
            backend,
            default_device,
        })
    }

    /// Wrap the console for sharing with the script bindings
    pub fn into_shared(self) -> SharedConsole {
        Rc::new(RefCell::new(self))
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Handle of the device created at startup
    pub fn default_device(&self) -> DeviceHandle {
        self.default_device
    }

    /// Create a new device with its own palette, buffer and surface
    pub fn create_device(&mut self, config: &DeviceConfig) -> Result<DeviceHandle, ConsoleError> {
        self.registry.create_device(config, self.backend.as_mut())
    }

    /// Release a device and its surface
    pub fn destroy_device(&mut self, handle: DeviceHandle) -> Result<(), ConsoleError> {
        self.registry.destroy_device(handle)
    }

    pub fn device(&self, handle: DeviceHandle) -> Result<&Device, ConsoleError> {
        self.registry.resolve(handle)
    }

    pub fn device_mut(&mut self, handle: DeviceHandle) -> Result<&mut Device, ConsoleError> {
        self.registry.resolve_mut(handle)
    }

    /// Configuration for a device requested by a script
    pub fn script_device(&self, kind: DeviceKind, width: usize, height: usize) -> DeviceConfig {
        DeviceConfig {
            kind,
            width,
            height,
            palette: Some(self.config.palette()),
            title: self.config.devices.title.clone(),
        }
    }

    /// Time elapsed since the default device was last presented
    ///
    /// Zero once the default device has been released.
    pub fn frame_delta(&self) -> Duration {
        self.registry
            .resolve(self.default_device)
            .map(Device::since_last_present)
            .unwrap_or_default()
    }

    /// Present every live device
    pub fn present_all(&mut self) -> Result<(), ConsoleError> {
        for device in self.registry.iter_mut() {
            device.present()?;
        }
        Ok(())
    }

    /// Bind any surface created since the last call to the event loop
    pub fn attach_surfaces(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ConsoleError> {
        for device in self.registry.iter_mut() {
            device.surface_mut().attach(event_loop)?;
        }
        Ok(())
    }

    /// Whether `window_id` belongs to one of the live devices
    pub fn owns_window(&self, window_id: WindowId) -> bool {
        self.registry
            .iter()
            .any(|d| d.surface().window_id() == Some(window_id))
    }

    pub fn request_redraw(&self) {
        for device in self.registry.iter() {
            device.surface().request_redraw();
        }
    }
}
