// Device Registry - Arena of devices addressed by generational handles
//
// A handle pairs a slot index with the slot's generation at issue time.
// Releasing a device bumps the generation, so stale handles never resolve
// again even after the slot is reused.

use super::{Device, DeviceConfig};
use crate::display::presenter::SurfaceBackend;
use crate::error::ConsoleError;
use mlua::{AnyUserData, MetaMethod};
use std::fmt;
use tracing::{debug, info};

/// Opaque, stable identifier of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    index: u32,
    generation: u32,
}

impl DeviceHandle {
    /// Registry slot this handle points at
    pub fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

impl mlua::UserData for DeviceHandle {
    fn add_methods<M: mlua::UserDataMethods<Self>>(methods: &mut M) {
        // Each `Screen.new`/`Screen.default` call yields a fresh userdata
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<DeviceHandle>()
                .map(|other| *other == *this)
                .unwrap_or(false))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("device {}", this))
        });
    }
}

struct Slot {
    generation: u32,
    device: Option<Device>,
}

/// Owner of every live device
pub struct DeviceRegistry {
    slots: Vec<Slot>,
    max_devices: usize,
}

impl DeviceRegistry {
    /// Create an empty registry holding at most `max_devices` live devices
    pub fn new(max_devices: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_devices: max_devices.max(1),
        }
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// Number of live devices
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.device.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a device, acquire its surface and register it
    ///
    /// Capacity and configuration are checked before the backend is asked
    /// for a surface.
    pub fn create_device(
        &mut self,
        config: &DeviceConfig,
        backend: &mut dyn SurfaceBackend,
    ) -> Result<DeviceHandle, ConsoleError> {
        if self.len() >= self.max_devices {
            return Err(ConsoleError::CapacityExceeded {
                max: self.max_devices,
            });
        }
        // a bad size must never cost a native window
        config.validate()?;

        let index = match self.slots.iter().position(|s| s.device.is_none()) {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    device: None,
                });
                self.slots.len() - 1
            }
        };

        let surface = backend.acquire(config, index)?;
        let device = Device::new(config, surface)?;

        let slot = &mut self.slots[index];
        slot.device = Some(device);
        let handle = DeviceHandle {
            index: index as u32,
            generation: slot.generation,
        };

        info!(
            handle = %handle,
            kind = %config.kind,
            width = config.width,
            height = config.height,
            "device created"
        );
        Ok(handle)
    }

    /// Look up a live device
    pub fn resolve(&self, handle: DeviceHandle) -> Result<&Device, ConsoleError> {
        self.slots
            .get(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.device.as_ref())
            .ok_or(ConsoleError::InvalidHandle(handle))
    }

    /// Look up a live device for mutation
    pub fn resolve_mut(&mut self, handle: DeviceHandle) -> Result<&mut Device, ConsoleError> {
        self.slots
            .get_mut(handle.slot())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.device.as_mut())
            .ok_or(ConsoleError::InvalidHandle(handle))
    }

    /// Release a device and its surface
    ///
    /// The handle is invalid afterwards; releasing it again fails.
    pub fn destroy_device(&mut self, handle: DeviceHandle) -> Result<(), ConsoleError> {
        let slot = self
            .slots
            .get_mut(handle.slot())
            .filter(|s| s.generation == handle.generation && s.device.is_some())
            .ok_or(ConsoleError::InvalidHandle(handle))?;

        let device = slot.device.take();
        slot.generation = slot.generation.wrapping_add(1);
        drop(device);

        debug!(handle = %handle, "device destroyed");
        Ok(())
    }

    /// Handles of all live devices, in slot order
    pub fn handles(&self) -> Vec<DeviceHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.device.is_some())
            .map(|(index, s)| DeviceHandle {
                index: index as u32,
                generation: s.generation,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.slots.iter().filter_map(|s| s.device.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.slots.iter_mut().filter_map(|s| s.device.as_mut())
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("live", &self.len())
            .field("max_devices", &self.max_devices)
            .finish()
    }
}
